// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Mirror / custom-archive writer
//!
//! Composes a `dists/{suite}/...` tree from a set of packages: writes
//! `Packages`/`Sources` (plain, gzip, xz), computes the `Release` manifest
//! over the freshly written files, and optionally signs it.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use sequoia_openpgp::Cert;

use crate::archive::{Component, Suite};
use crate::architectures::Architecture;
use crate::compress::Compression;
use crate::digest::digest_hex;
use crate::error::{ArchiveError, DigestKind, Result};
use crate::openpgp;
use crate::package::{Package, SourcePackage};

/// Fields describing the `Release` manifest to compose. Every field not
/// computed from the written indices (origin, label, description, ...) is
/// supplied by the caller.
#[derive(Debug, Clone)]
pub struct ReleaseMetadata {
    /// `Origin:` value
    pub origin: String,
    /// `Label:` value
    pub label: String,
    /// `Description:` value
    pub description: String,
    /// How long the manifest stays valid for, used to compute `Valid-Until`
    pub validity: Duration,
}

/// Optional signing material for the composed `Release`.
pub struct Signing<'a> {
    /// Signing certificate
    pub cert: &'a Cert,
    /// Passphrase protecting the certificate's secret key, if any
    pub passphrase: Option<&'a str>,
}

/// Writes a `dists/{suite}/...` tree to `root`.
pub struct MirrorWriter {
    root: PathBuf,
    suite: Suite,
}

impl MirrorWriter {
    /// A writer rooted at `root`, composing the named suite.
    pub fn new(root: impl Into<PathBuf>, suite: Suite) -> Self {
        Self { root: root.into(), suite }
    }

    fn suite_dir(&self) -> PathBuf {
        self.root.join("dists").join(self.suite.as_ref())
    }

    fn write_with_variants(&self, relative: &Path, data: &[u8]) -> Result<Vec<(String, u64, [u8; 32], [u8; 16])>> {
        let dir = self.suite_dir();
        let mut entries = Vec::new();

        for compression in [Compression::Identity, Compression::Gzip, Compression::Xz] {
            let filename = format!("{}{}", relative.display(), compression.suffix());
            let dest = dir.join(&filename);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(ArchiveError::Io)?;
            }

            let bytes = match compression {
                Compression::Identity => data.to_vec(),
                Compression::Gzip => {
                    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                    encoder.write_all(data).map_err(ArchiveError::Io)?;
                    encoder.finish().map_err(ArchiveError::Io)?
                }
                Compression::Xz => {
                    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
                    encoder.write_all(data).map_err(ArchiveError::Io)?;
                    encoder.finish().map_err(ArchiveError::Io)?
                }
            };

            std::fs::write(&dest, &bytes).map_err(|e| ArchiveError::PoolWriteFailure {
                path: dest.clone(),
                source: e,
            })?;

            let sha256_hex = digest_hex(DigestKind::Sha256, &bytes);
            let md5_hex = digest_hex(DigestKind::Md5, &bytes);
            let mut sha256 = [0u8; 32];
            let mut md5 = [0u8; 16];
            hex::decode_to_slice(&sha256_hex, &mut sha256).map_err(|e| ArchiveError::ParseError {
                context: "digest".into(),
                message: e.to_string(),
            })?;
            hex::decode_to_slice(&md5_hex, &mut md5).map_err(|e| ArchiveError::ParseError {
                context: "digest".into(),
                message: e.to_string(),
            })?;
            entries.push((filename, bytes.len() as u64, sha256, md5));
        }

        Ok(entries)
    }

    /// Emit `Packages` (and `.gz`/`.xz`) for one component/architecture.
    pub fn write_packages(
        &self,
        component: &Component,
        architecture: &Architecture,
        packages: &[Package],
    ) -> Result<Vec<(String, u64, [u8; 32], [u8; 16])>> {
        let mut buf = String::new();
        for package in packages {
            emit_package(&mut buf, package);
        }
        let relative = PathBuf::from(component.as_ref())
            .join(format!("binary-{architecture}"))
            .join("Packages");
        self.write_with_variants(&relative, buf.as_bytes())
    }

    /// Emit `Sources` (and `.gz`/`.xz`) for one component.
    pub fn write_sources(&self, component: &Component, sources: &[SourcePackage]) -> Result<Vec<(String, u64, [u8; 32], [u8; 16])>> {
        let mut buf = String::new();
        for source in sources {
            emit_source(&mut buf, source);
        }
        let relative = PathBuf::from(component.as_ref()).join("source").join("Sources");
        self.write_with_variants(&relative, buf.as_bytes())
    }

    /// Compose and write `Release`, plus `InRelease`/`Release.gpg` when
    /// `signing` is given; otherwise `InRelease` is written as an exact,
    /// unsigned copy and no `Release.gpg` is emitted.
    pub fn write_release(
        &self,
        metadata: &ReleaseMetadata,
        codename: &str,
        architectures: &[Architecture],
        components: &[Component],
        entries: &BTreeMap<String, (u64, [u8; 32], [u8; 16])>,
        signing: Option<Signing<'_>>,
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let valid_until = now + metadata.validity;

        let mut buf = String::new();
        buf.push_str(&format!("Origin: {}\n", metadata.origin));
        buf.push_str(&format!("Label: {}\n", metadata.label));
        buf.push_str(&format!("Suite: {}\n", self.suite));
        buf.push_str(&format!("Codename: {codename}\n"));
        buf.push_str("Version: 1.0\n");
        buf.push_str(&format!("Date: {}\n", now.format("%a, %d %b %Y %H:%M:%S UTC")));
        buf.push_str(&format!("Valid-Until: {}\n", valid_until.format("%a, %d %b %Y %H:%M:%S UTC")));
        buf.push_str("Acquire-By-Hash: no\n");
        buf.push_str(&format!(
            "Architectures: {}\n",
            architectures.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ")
        ));
        buf.push_str(&format!(
            "Components: {}\n",
            components.iter().map(|c| c.as_ref()).collect::<Vec<_>>().join(" ")
        ));
        buf.push_str(&format!("Description: {}\n", metadata.description));

        buf.push_str("MD5Sum:\n");
        for (path, (size, _sha256, md5)) in entries {
            buf.push_str(&format!(" {} {size} {path}\n", hex::encode(md5)));
        }
        buf.push_str("SHA256:\n");
        for (path, (size, sha256, _md5)) in entries {
            buf.push_str(&format!(" {} {size} {path}\n", hex::encode(sha256)));
        }

        let dir = self.suite_dir();
        std::fs::create_dir_all(&dir).map_err(ArchiveError::Io)?;
        let release_path = dir.join("Release");
        std::fs::write(&release_path, &buf).map_err(|e| ArchiveError::PoolWriteFailure {
            path: release_path.clone(),
            source: e,
        })?;

        match signing {
            Some(signing) => {
                let detached = openpgp::sign_detached(signing.cert, signing.passphrase, buf.as_bytes())?;
                let gpg_path = dir.join("Release.gpg");
                std::fs::write(&gpg_path, &detached).map_err(|e| ArchiveError::PoolWriteFailure {
                    path: gpg_path,
                    source: e,
                })?;

                let clearsigned = openpgp::sign_clearsigned(signing.cert, signing.passphrase, buf.as_bytes())?;
                let inrelease_path = dir.join("InRelease");
                std::fs::write(&inrelease_path, &clearsigned).map_err(|e| ArchiveError::PoolWriteFailure {
                    path: inrelease_path,
                    source: e,
                })?;
            }
            None => {
                let inrelease_path = dir.join("InRelease");
                std::fs::write(&inrelease_path, &buf).map_err(|e| ArchiveError::PoolWriteFailure {
                    path: inrelease_path,
                    source: e,
                })?;
            }
        }

        Ok(())
    }
}

fn emit_package(buf: &mut String, package: &Package) {
    buf.push_str(&format!("Package: {}\n", package.name));
    buf.push_str(&format!("Version: {}\n", package.version));
    buf.push_str(&format!("Architecture: {}\n", package.architecture));
    if let Some(source) = &package.source {
        if source != package.name.as_ref() {
            buf.push_str(&format!("Source: {source}\n"));
        }
    }
    if !package.maintainer.is_empty() {
        buf.push_str(&format!("Maintainer: {}\n", package.maintainer));
    }
    for kind in crate::package::RelationKind::CLOSURE_KINDS {
        if let Some(values) = package.relations.get(&kind) {
            if !values.is_empty() {
                buf.push_str(&format!("{}: {}\n", kind.field_name(), values.join(", ")));
            }
        }
    }
    if !package.section.is_empty() {
        buf.push_str(&format!("Section: {}\n", package.section));
    }
    if !package.priority.is_empty() {
        buf.push_str(&format!("Priority: {}\n", package.priority));
    }
    buf.push_str(&format!("Filename: {}\n", package.effective_filename()));
    buf.push_str(&format!("Size: {}\n", package.size));
    if let Some(md5) = &package.md5sum {
        buf.push_str(&format!("MD5sum: {md5}\n"));
    }
    if let Some(sha256) = &package.sha256 {
        buf.push_str(&format!("SHA256: {sha256}\n"));
    }
    if !package.description.is_empty() {
        buf.push_str(&format!("Description: {}\n", package.description));
    }
    for (name, value) in &package.extra_fields {
        buf.push_str(&format!("{name}: {value}\n"));
    }
    buf.push('\n');
}

fn emit_source(buf: &mut String, source: &SourcePackage) {
    buf.push_str(&format!("Package: {}\n", source.name));
    buf.push_str(&format!("Version: {}\n", source.version));
    if !source.maintainer.is_empty() {
        buf.push_str(&format!("Maintainer: {}\n", source.maintainer));
    }
    buf.push_str(&format!("Directory: {}\n", source.directory));
    if !source.files.is_empty() {
        buf.push_str("Files:\n");
        for file in &source.files {
            if let Some(md5) = &file.md5sum {
                buf.push_str(&format!(" {md5} {} {}\n", file.size, file.name));
            }
        }
        buf.push_str("Checksums-Sha256:\n");
        for file in &source.files {
            if let Some(sha256) = &file.sha256 {
                buf.push_str(&format!(" {sha256} {} {}\n", file.size, file.name));
            }
        }
    }
    buf.push('\n');
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageName;
    use crate::version::PackageVersion;

    fn package() -> Package {
        Package {
            name: PackageName::try_from("hello").unwrap(),
            version: PackageVersion::try_from("2.10-2").unwrap(),
            architecture: "amd64".to_owned(),
            maintainer: "Santa Claus <santa@example.org>".to_owned(),
            description: "friendly greeting program".to_owned(),
            section: "misc".to_owned(),
            priority: "optional".to_owned(),
            essential: false,
            source: None,
            filename: "pool/main/h/hello/hello_2.10-2_amd64.deb".to_owned(),
            size: 1024,
            md5sum: Some("d41d8cd98f00b204e9800998ecf8427e".to_owned()),
            sha256: Some("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_owned()),
            relations: Default::default(),
            extra_fields: Vec::new(),
        }
    }

    #[test]
    fn emits_required_fields_in_order() {
        let mut buf = String::new();
        emit_package(&mut buf, &package());
        let package_idx = buf.find("Package:").unwrap();
        let version_idx = buf.find("Version:").unwrap();
        let filename_idx = buf.find("Filename:").unwrap();
        assert!(package_idx < version_idx);
        assert!(version_idx < filename_idx);
        assert!(buf.ends_with("\n\n"));
    }

    #[test]
    fn write_packages_produces_three_variants() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MirrorWriter::new(dir.path(), Suite::try_from("sid").unwrap());
        let component = Component::try_from("main").unwrap();
        let arch = Architecture::try_from("amd64").unwrap();
        let entries = writer.write_packages(&component, &arch, std::slice::from_ref(&package())).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(dir.path().join("dists/sid/main/binary-amd64/Packages").exists());
        assert!(dir.path().join("dists/sid/main/binary-amd64/Packages.gz").exists());
        assert!(dir.path().join("dists/sid/main/binary-amd64/Packages.xz").exists());
    }

    #[test]
    fn write_release_without_signing_copies_to_inrelease() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MirrorWriter::new(dir.path(), Suite::try_from("sid").unwrap());
        let metadata = ReleaseMetadata {
            origin: "Example".to_owned(),
            label: "Example".to_owned(),
            description: "Example archive".to_owned(),
            validity: Duration::days(7),
        };
        writer
            .write_release(&metadata, "sid", &[], &[], &BTreeMap::new(), None)
            .unwrap();
        let release = std::fs::read(dir.path().join("dists/sid/Release")).unwrap();
        let inrelease = std::fs::read(dir.path().join("dists/sid/InRelease")).unwrap();
        assert_eq!(release, inrelease);
        assert!(!dir.path().join("dists/sid/Release.gpg").exists());
    }

    #[test]
    fn parse_of_emit_round_trips_a_package() {
        use std::io::Cursor;

        use crate::control::{parse_package, ParagraphReader};

        let mut original = package();
        original
            .relations
            .insert(crate::package::RelationKind::Depends, vec!["libc6 (>= 2.34)".to_owned(), "libgcc-s1".to_owned()]);

        let mut buf = String::new();
        emit_package(&mut buf, &original);

        let mut reader = ParagraphReader::new(Cursor::new(buf));
        let paragraph = reader.next_paragraph().unwrap().unwrap();
        let parsed = parse_package(&paragraph).unwrap();

        assert_eq!(parsed.name, original.name);
        assert_eq!(parsed.version, original.version);
        assert_eq!(parsed.architecture, original.architecture);
        assert_eq!(parsed.effective_filename(), original.effective_filename());
        assert_eq!(parsed.md5sum, original.md5sum);
        assert_eq!(parsed.sha256, original.sha256);
        assert_eq!(
            parsed.relation(crate::package::RelationKind::Depends),
            original.relation(crate::package::RelationKind::Depends)
        );
    }
}

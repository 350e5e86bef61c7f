// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Package and source package records
//!
//! These are the typed records the control parser ([`crate::control`])
//! produces and the mirror writer re-serializes.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Deserialize;
use thiserror::Error;

use crate::archive::pool_prefix;
use crate::utils::TryFromStrVisitor;
use crate::version::PackageVersion;

fn check_package_name(package: &str) -> Result<(), PackageError> {
    // package names must be at least 2 characters long
    if package.len() < 2 {
        return Err(PackageError::InvalidNameLength);
    }

    if !package.chars().enumerate().all(|(i, c)| {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            return true;
        }
        i > 0 && ".+-".contains(c)
    }) {
        return Err(PackageError::InvalidName);
    }

    Ok(())
}

/// Package errors
#[derive(Clone, Copy, Debug, Error)]
pub enum PackageError {
    #[error("package name too short")]
    /// Package name is too short
    InvalidNameLength,
    #[error("package name contains invalid character")]
    /// Package name is invalid
    InvalidName,
}

/// Package name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl TryFrom<&str> for PackageName {
    type Error = PackageError;

    fn try_from(package: &str) -> Result<Self, Self::Error> {
        check_package_name(package).map(|_| Self(package.to_owned()))
    }
}

impl TryFrom<String> for PackageName {
    type Error = PackageError;

    fn try_from(package: String) -> Result<Self, Self::Error> {
        check_package_name(&package).map(|_| Self(package))
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq(other)
    }
}

impl PartialEq<String> for PackageName {
    fn eq(&self, other: &String) -> bool {
        self.0.eq(other)
    }
}

impl Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(TryFromStrVisitor::new("a package name"))
    }
}

/// A package together with its version, used to pin a resolver root.
///
/// Unlike the teacher's britney-era equivalent this does not derive
/// `PartialOrd`/`Ord`: [`PackageVersion`] only supports literal equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedPackage {
    /// The package name
    pub package: PackageName,
    /// The package version
    pub version: PackageVersion,
}

impl AsRef<PackageName> for VersionedPackage {
    fn as_ref(&self) -> &PackageName {
        &self.package
    }
}

impl AsRef<PackageVersion> for VersionedPackage {
    fn as_ref(&self) -> &PackageVersion {
        &self.version
    }
}

/// The relation kinds a [`Package`] may carry. Ordering follows the
/// discriminant, so a `BTreeMap<RelationKind, _>` iterates `Depends`,
/// `Pre-Depends`, ..., `Replaces` in the order a control paragraph emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    /// `Depends:`
    Depends,
    /// `Pre-Depends:`
    PreDepends,
    /// `Recommends:`
    Recommends,
    /// `Suggests:`
    Suggests,
    /// `Enhances:`
    Enhances,
    /// `Breaks:`
    Breaks,
    /// `Conflicts:`
    Conflicts,
    /// `Provides:`
    Provides,
    /// `Replaces:`
    Replaces,
}

impl RelationKind {
    /// The canonical control-file field name for this relation.
    pub fn field_name(self) -> &'static str {
        match self {
            RelationKind::Depends => "Depends",
            RelationKind::PreDepends => "Pre-Depends",
            RelationKind::Recommends => "Recommends",
            RelationKind::Suggests => "Suggests",
            RelationKind::Enhances => "Enhances",
            RelationKind::Breaks => "Breaks",
            RelationKind::Conflicts => "Conflicts",
            RelationKind::Provides => "Provides",
            RelationKind::Replaces => "Replaces",
        }
    }

    /// Match a control-file field name (case-insensitive) to a relation kind.
    pub fn from_field_name(name: &str) -> Option<Self> {
        [
            RelationKind::Depends,
            RelationKind::PreDepends,
            RelationKind::Recommends,
            RelationKind::Suggests,
            RelationKind::Enhances,
            RelationKind::Breaks,
            RelationKind::Conflicts,
            RelationKind::Provides,
            RelationKind::Replaces,
        ]
        .into_iter()
        .find(|kind| kind.field_name().eq_ignore_ascii_case(name))
    }

    /// The relation kinds a resolver closure follows: those that name a
    /// package this archive must also carry for the depending package to be
    /// usable. `Breaks`/`Conflicts`/`Provides`/`Replaces` are not followed —
    /// they describe negative or aliasing relations, not prerequisites.
    pub const CLOSURE_KINDS: [RelationKind; 5] = [
        RelationKind::Depends,
        RelationKind::PreDepends,
        RelationKind::Recommends,
        RelationKind::Suggests,
        RelationKind::Enhances,
    ];

    /// Parse a CLI-facing exclusion token (`depends`, `pre-depends`, ...).
    /// Only closure-eligible kinds are accepted.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "depends" => Some(RelationKind::Depends),
            "pre-depends" => Some(RelationKind::PreDepends),
            "recommends" => Some(RelationKind::Recommends),
            "suggests" => Some(RelationKind::Suggests),
            "enhances" => Some(RelationKind::Enhances),
            _ => None,
        }
    }
}

/// A binary package record, as found in a `Packages` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package name
    pub name: PackageName,
    /// Package version
    pub version: PackageVersion,
    /// Architecture this build targets
    pub architecture: String,
    /// Maintainer field, verbatim
    pub maintainer: String,
    /// Short (single-line) description
    pub description: String,
    /// Section, e.g. `utils`
    pub section: String,
    /// Priority, e.g. `optional`
    pub priority: String,
    /// Whether this package is marked `Essential: yes`
    pub essential: bool,
    /// Name of the source package this binary was built from; `None` means
    /// the control paragraph carried no `Source:` field, in which case
    /// [`Package::source_name`] falls back to `name`.
    pub source: Option<String>,
    /// Path of the `.deb` relative to the archive root, as given by
    /// `Filename:`; empty when absent, in which case
    /// [`Package::effective_filename`] synthesizes the conventional name.
    pub filename: String,
    /// Size in bytes of the `.deb`
    pub size: u64,
    /// MD5 digest of the `.deb`, hex-encoded
    pub md5sum: Option<String>,
    /// SHA256 digest of the `.deb`, hex-encoded
    pub sha256: Option<String>,
    /// Dependency relations, keyed by kind; each value is a list of raw,
    /// comma-split dependency expressions (verbatim, including version
    /// constraints and `|` alternatives).
    pub relations: BTreeMap<RelationKind, Vec<String>>,
    /// Fields the parser did not recognize, keyed by their original
    /// (canonical) spelling, preserved for round-trip fidelity.
    pub extra_fields: Vec<(String, String)>,
}

impl Package {
    /// The effective source package name (falls back to `name` when
    /// `Source:` was absent).
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(self.name.as_ref())
    }

    /// The pool directory prefix for this package's source name.
    pub fn pool_prefix(&self) -> &str {
        pool_prefix(self.source_name())
    }

    /// The filename this package should be stored under, synthesizing the
    /// conventional `{name}_{version}_{architecture}.deb` when the control
    /// paragraph did not carry a `Filename:` field.
    pub fn effective_filename(&self) -> String {
        if !self.filename.is_empty() {
            return self.filename.clone();
        }
        synthesize_filename(self.name.as_ref(), &self.version.to_string(), &self.architecture)
    }

    /// Dependency expressions for a given relation kind, empty if absent.
    pub fn relation(&self, kind: RelationKind) -> &[String] {
        self.relations.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Synthesize the conventional pool filename for a binary package:
/// `{name}_{version}_{architecture}.deb`.
pub fn synthesize_filename(name: &str, version: &str, architecture: &str) -> String {
    format!("{name}_{version}_{architecture}.deb")
}

/// The kind of file referenced by a source package's `Files:`/
/// `Checksums-Sha256:` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFileKind {
    /// The `.dsc` control file itself
    Dsc,
    /// An upstream `.orig.tar.*`
    Orig,
    /// A `.debian.tar.*` delta
    Debian,
    /// Anything else (additional orig tarballs, legacy `.diff.gz`, ...)
    File,
}

impl SourceFileKind {
    /// Infer the kind from a pool-relative filename.
    pub fn infer(filename: &str) -> Self {
        if filename.ends_with(".dsc") {
            SourceFileKind::Dsc
        } else if filename.contains(".orig.tar") {
            SourceFileKind::Orig
        } else if filename.contains(".debian.tar") {
            SourceFileKind::Debian
        } else {
            SourceFileKind::File
        }
    }
}

/// A single file referenced by a [`SourcePackage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File kind, inferred from the name
    pub kind: SourceFileKind,
    /// Filename, relative to the source package's pool directory
    pub name: String,
    /// Absolute URL to fetch this file from
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// MD5 digest, hex-encoded, if known
    pub md5sum: Option<String>,
    /// SHA256 digest, hex-encoded, if known
    pub sha256: Option<String>,
}

/// A source package record, as found in a `Sources` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePackage {
    /// Source package name
    pub name: PackageName,
    /// Source package version
    pub version: PackageVersion,
    /// Maintainer field, verbatim
    pub maintainer: String,
    /// Pool directory this package's files live under, relative to the
    /// archive root (the `Directory:` field)
    pub directory: String,
    /// The files making up this source package
    pub files: Vec<SourceFile>,
}

impl SourcePackage {
    /// Look up one of this source package's files by name.
    pub fn file(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valid_package_names() {
        assert!(PackageName::try_from("zathura").is_ok());
        assert!(PackageName::try_from("0ad").is_ok());
        assert!(PackageName::try_from("zathura-pdf").is_ok());
    }

    #[test]
    fn invalid_package_names() {
        assert!(PackageName::try_from("z").is_err());
        assert!(PackageName::try_from("-ad").is_err());
    }

    #[test]
    fn filename_synthesis() {
        assert_eq!(synthesize_filename("hello", "2.10-2", "amd64"), "hello_2.10-2_amd64.deb");
    }

    #[test]
    fn source_file_kind_inference() {
        assert_eq!(SourceFileKind::infer("hello_2.10.dsc"), SourceFileKind::Dsc);
        assert_eq!(SourceFileKind::infer("hello_2.10.orig.tar.gz"), SourceFileKind::Orig);
        assert_eq!(
            SourceFileKind::infer("hello_2.10-2.debian.tar.xz"),
            SourceFileKind::Debian
        );
        assert_eq!(SourceFileKind::infer("hello_2.10-2.diff.gz"), SourceFileKind::File);
    }

    #[test]
    fn relation_kind_round_trip() {
        for kind in [
            RelationKind::Depends,
            RelationKind::PreDepends,
            RelationKind::Recommends,
            RelationKind::Suggests,
            RelationKind::Enhances,
            RelationKind::Breaks,
            RelationKind::Conflicts,
            RelationKind::Provides,
            RelationKind::Replaces,
        ] {
            assert_eq!(RelationKind::from_field_name(kind.field_name()), Some(kind));
        }
        assert_eq!(RelationKind::from_field_name("depends"), Some(RelationKind::Depends));
        assert_eq!(RelationKind::from_field_name("bogus"), None);
    }

    #[test]
    fn relation_token_excludes_non_closure_kinds() {
        assert_eq!(RelationKind::from_token("suggests"), Some(RelationKind::Suggests));
        assert_eq!(RelationKind::from_token("conflicts"), None);
    }
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Archive client
//!
//! Orchestrates the Release → Packages/Sources fetch-verify-parse pipeline
//! and owns the resulting [`Catalogue`]. Concurrent use of a single client
//! is not supported; callers that need parallelism construct one client per
//! worker (§5).

use std::io::Read;
use std::path::Path;

use crate::archive::{Component, Suite};
use crate::architectures::Architecture;
use crate::catalogue::Catalogue;
use crate::compress::Compression;
use crate::control::{parse_package, parse_source_package, ParagraphReader};
use crate::digest::{verify, TeeReader};
use crate::error::{ArchiveError, DigestKind, Result};
use crate::openpgp::KeyRing;
use crate::release::{self, ReleaseFile};
use crate::transport::Transport;

/// Archive client configuration: one suite, many components/architectures.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Archive base URL, e.g. `https://deb.debian.org/debian`
    pub base_url: String,
    /// Suite to fetch, e.g. `bookworm`
    pub suite: Suite,
    /// Components to index, e.g. `[main]`
    pub components: Vec<Component>,
    /// Architectures to index, e.g. `[amd64]`
    pub architectures: Vec<Architecture>,
    /// Verify the fetched `ReleaseFile` against per-file checksums
    pub verify_release: bool,
    /// Verify the `Release`/`InRelease` OpenPGP signature
    pub verify_signature: bool,
}

/// Orchestrates fetch, verify and parse; exposes the resulting [`Catalogue`].
#[derive(Debug)]
pub struct ArchiveClient {
    config: ClientConfig,
    transport: Transport,
    keyring: KeyRing,
    catalogue: Catalogue,
}

impl ArchiveClient {
    /// Construct a client. `keyring` is ignored entirely when
    /// `verify_signature` is false.
    pub fn new(config: ClientConfig, transport: Transport, keyring: KeyRing) -> Self {
        Self {
            config,
            transport,
            keyring,
            catalogue: Catalogue::new(),
        }
    }

    /// Drop all catalogue state, as if freshly constructed. Used when the
    /// caller reconfigures suite/component/architecture.
    pub fn reset(&mut self) {
        self.catalogue = Catalogue::new();
    }

    /// The catalogue accumulated so far.
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    fn suite_url(&self, path: &str) -> String {
        format!(
            "{}/dists/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.suite,
            path
        )
    }

    /// Fetch and verify the suite's `Release` manifest, populating the
    /// catalogue's `ReleaseFile`.
    pub async fn fetch_release(&mut self) -> Result<()> {
        let content = if self.config.verify_signature {
            match self.fetch_inrelease().await {
                Ok(content) => content,
                Err(_) => self.fetch_release_and_detached().await?,
            }
        } else {
            self.transport.get_bytes(&self.suite_url("Release")).await?
        };

        let release: ReleaseFile = release::from_str(
            std::str::from_utf8(&content).map_err(|e| ArchiveError::ParseError {
                context: "Release".into(),
                message: e.to_string(),
            })?,
        )
        .map_err(|e| ArchiveError::ParseError {
            context: "Release".into(),
            message: e.to_string(),
        })?;

        if release.suite != *self.config.suite.as_ref() && (self.config.verify_release || self.config.verify_signature) {
            return Err(ArchiveError::ConfigInvalid(format!(
                "fetched Release suite {:?} does not match configured suite {:?}",
                release.suite.as_ref(),
                self.config.suite.as_ref()
            )));
        }

        self.catalogue.set_release(release);
        Ok(())
    }

    async fn fetch_inrelease(&self) -> Result<Vec<u8>> {
        let body = self.transport.get_bytes(&self.suite_url("InRelease")).await?;
        let (_signatures, content) = self.keyring.verify_clearsigned(&body)?;
        Ok(content)
    }

    async fn fetch_release_and_detached(&self) -> Result<Vec<u8>> {
        let release = self.transport.get_bytes(&self.suite_url("Release")).await?;
        if self.config.verify_signature {
            let signature = self.transport.get_bytes(&self.suite_url("Release.gpg")).await?;
            self.keyring.verify_detached(&signature, &release)?;
        }
        Ok(release)
    }

    fn release(&self) -> Result<&ReleaseFile> {
        self.catalogue
            .release()
            .ok_or_else(|| ArchiveError::ConfigInvalid("Release must be fetched before Packages/Sources".into()))
    }

    async fn fetch_index(&self, relative: &str) -> Result<Vec<u8>> {
        let release = self.release()?;

        let mut last_error = None;
        for compression in Compression::PROBE_ORDER {
            let candidate = format!("{relative}{}", compression.suffix());
            let url = self.suite_url(&candidate);
            let body = match self.transport.get_bytes(&url).await {
                Ok(body) => body,
                Err(e @ ArchiveError::HttpNotFound(_)) => {
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.config.verify_release {
                if compression == Compression::Identity {
                    if let Some((kind, expected, _size)) = release.best_digest(&candidate) {
                        verify(kind, &body, &expected, &candidate)?;
                    } else if release.has_entry(&candidate) {
                        // entry existed but digest lookup failed unexpectedly
                        return Err(ArchiveError::NoTrustedDigest(candidate));
                    }
                    return Ok(body);
                }

                let Some((DigestKind::Sha256, expected, _size)) = release.best_digest(&candidate) else {
                    return Err(ArchiveError::NoTrustedDigest(candidate));
                };
                let mut tee = TeeReader::new(body.as_slice(), DigestKind::Sha256);
                let mut decompressed = Vec::new();
                compression
                    .decoder(&mut tee)
                    .read_to_end(&mut decompressed)
                    .map_err(ArchiveError::Io)?;
                let actual = tee.finalize_hex();
                if !actual.eq_ignore_ascii_case(&expected) {
                    return Err(ArchiveError::ChecksumMismatch {
                        filename: candidate,
                        expected,
                        actual,
                        kind: DigestKind::Sha256,
                    });
                }
                return Ok(decompressed);
            }

            let mut decompressed = Vec::new();
            compression
                .decoder(body.as_slice())
                .read_to_end(&mut decompressed)
                .map_err(ArchiveError::Io)?;
            return Ok(decompressed);
        }

        Err(last_error.unwrap_or_else(|| ArchiveError::HttpNotFound(relative.to_owned())))
    }

    /// Fetch `Packages` for every configured (component, architecture) pair.
    /// Per-pair failures are logged and skipped; the call fails only if
    /// every pair failed.
    pub async fn fetch_packages(&mut self) -> Result<()> {
        let components = self.config.components.clone();
        let architectures = self.config.architectures.clone();
        let mut any_succeeded = false;
        let mut last_error = None;

        for component in &components {
            for arch in &architectures {
                let relative = format!("{component}/binary-{arch}/Packages");
                match self.fetch_index(&relative).await {
                    Ok(body) => {
                        let mut reader = ParagraphReader::new(body.as_slice());
                        let packages = std::iter::from_fn(|| reader.next_paragraph().ok().flatten())
                            .filter_map(|p| parse_package(&p))
                            .collect::<Vec<_>>();
                        self.catalogue.extend_packages(packages);
                        any_succeeded = true;
                    }
                    Err(e) => {
                        tracing::warn!("failed to fetch {component}/binary-{arch}: {e}");
                        last_error = Some(e);
                    }
                }
            }
        }

        if any_succeeded {
            Ok(())
        } else {
            Err(last_error.unwrap_or_else(|| ArchiveError::ConfigInvalid("no (component, architecture) pair yielded data".into())))
        }
    }

    /// Fetch `Sources` for every configured component.
    pub async fn fetch_sources(&mut self) -> Result<()> {
        let components = self.config.components.clone();
        let mut any_succeeded = false;
        let mut last_error = None;

        for component in &components {
            let relative = format!("{component}/source/Sources");
            match self.fetch_index(&relative).await {
                Ok(body) => {
                    let mut reader = ParagraphReader::new(body.as_slice());
                    let sources = std::iter::from_fn(|| reader.next_paragraph().ok().flatten())
                        .filter_map(|p| parse_source_package(&p, &self.config.base_url))
                        .collect::<Vec<_>>();
                    self.catalogue.extend_sources(sources);
                    any_succeeded = true;
                }
                Err(e) => {
                    tracing::warn!("failed to fetch {component}/source: {e}");
                    last_error = Some(e);
                }
            }
        }

        if any_succeeded {
            Ok(())
        } else {
            Err(last_error.unwrap_or_else(|| ArchiveError::ConfigInvalid("no component yielded source data".into())))
        }
    }

    /// Write every decompressed index currently in the catalogue's source
    /// `ReleaseFile` to a cache directory tree, for later reload without
    /// network access.
    pub async fn write_cache(&self, root: &Path) -> Result<()> {
        for component in &self.config.components {
            for arch in &self.config.architectures {
                let relative = format!("{component}/binary-{arch}/Packages");
                let body = self.fetch_index(&relative).await?;
                let dest = root
                    .join(self.config.suite.as_ref())
                    .join(component.as_ref())
                    .join(format!("binary-{arch}"))
                    .join("Packages");
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent).map_err(ArchiveError::Io)?;
                }
                std::fs::write(&dest, &body).map_err(|e| ArchiveError::PoolWriteFailure { path: dest, source: e })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "https://example.org/debian".to_owned(),
            suite: Suite::try_from("bookworm").unwrap(),
            components: vec![Component::try_from("main").unwrap()],
            architectures: vec![Architecture::try_from("amd64").unwrap()],
            verify_release: true,
            verify_signature: true,
        }
    }

    #[test]
    fn suite_url_joins_cleanly_regardless_of_trailing_slash() {
        let mut with_slash = config();
        with_slash.base_url.push('/');
        let transport = Transport::new(Default::default()).unwrap();
        let client = ArchiveClient::new(with_slash, transport, KeyRing::empty());
        assert_eq!(client.suite_url("Release"), "https://example.org/debian/dists/bookworm/Release");
    }

    #[test]
    fn release_must_be_fetched_before_indices() {
        let transport = Transport::new(Default::default()).unwrap();
        let client = ArchiveClient::new(config(), transport, KeyRing::empty());
        assert!(client.release().is_err());
    }
}

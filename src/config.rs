// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

//! # Layered configuration
//!
//! CLI flags win over environment variables, which win over built-in
//! defaults. Collecting this into one record (rather than threading raw
//! `clap` options through every orchestrator) is what lets `client.rs`,
//! `downloader.rs` and `mirror.rs` stay decoupled from `clap` entirely.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use archive_core::archive::{Component, Suite};
use archive_core::architectures::Architecture;
use archive_core::openpgp::KeyRing;
use indicatif::ProgressStyle;

use crate::cli::BaseOptions;

const PROGRESS_CHARS: &str = "█  ";

/// The progress-bar style every subcommand renders under, unless `--silent`.
pub(crate) fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS)
}

/// Resolved, layered configuration shared by every orchestrator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Archive base URL
    pub base_url: String,
    /// Keyring paths, in the order they were supplied (or platform defaults)
    pub keyring_paths: Vec<PathBuf>,
    /// Whether to verify the `Release`/`InRelease` OpenPGP signature
    pub verify_signature: bool,
    /// Minimum spacing between HTTP requests, if any
    pub rate_limit: Option<Duration>,
    /// Suppress progress rendering entirely
    pub silent: bool,
}

impl Config {
    /// Build the layered config from parsed CLI options, falling back to
    /// `DEB_ARCHIVE_BASE_URL` when `--base-url` was left at its default and
    /// the environment variable is set.
    pub fn from_base_options(base: &BaseOptions) -> Self {
        let base_url = std::env::var("DEB_ARCHIVE_BASE_URL").unwrap_or_else(|_| base.base_url.clone());

        Self {
            base_url,
            keyring_paths: base.keyring.clone(),
            verify_signature: !base.no_gpg_verify,
            rate_limit: base.rate_limit.map(Duration::from_secs_f64),
            silent: base.silent,
        }
    }

    /// Effective downloader worker count: always `1` when rate-limited
    /// (§9 decision: pacing stays coupled to concurrency).
    pub fn parallelism(&self) -> usize {
        if self.rate_limit.is_some() {
            1
        } else {
            5
        }
    }

    /// Load the configured keyring, falling back to the platform default
    /// list (`/usr/share/keyrings/debian-archive-keyring.gpg` and friends)
    /// when no `--keyring` flags were given.
    pub fn load_keyring(&self) -> Result<KeyRing> {
        if self.keyring_paths.is_empty() {
            let defaults = default_keyring_paths();
            return KeyRing::load(&defaults).context("failed to load default keyring");
        }
        KeyRing::load(&self.keyring_paths).context("failed to load configured keyring")
    }

    /// Build a [`archive_core::transport::TransportConfig`] from this config.
    pub fn transport_config(&self) -> archive_core::transport::TransportConfig {
        archive_core::transport::TransportConfig {
            rate_limit: self.rate_limit,
            ..Default::default()
        }
    }
}

/// Platform-specific default keyring search path, expanded at runtime so a
/// caller never needs to special-case "no `--keyring` given" at the call
/// site (§9: keyring discovery).
fn default_keyring_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("/usr/share/keyrings/debian-archive-keyring.gpg"),
            PathBuf::from("/etc/apt/trusted.gpg.d"),
        ]
    }
    #[cfg(not(target_os = "linux"))]
    {
        Vec::new()
    }
}

/// Parse a `--suite`/`--component`/`--architecture` flag, mapping the
/// underlying validation error to an `anyhow` context.
pub fn parse_suite(value: &str) -> Result<Suite> {
    Suite::try_from(value).map_err(|_| anyhow::anyhow!("invalid suite: {value}"))
}

/// See [`parse_suite`].
pub fn parse_component(value: &str) -> Result<Component> {
    Component::try_from(value).map_err(|_| anyhow::anyhow!("invalid component: {value}"))
}

/// See [`parse_suite`].
pub fn parse_architecture(value: &str) -> Result<Architecture> {
    Architecture::try_from(value).map_err(|_| anyhow::anyhow!("invalid architecture: {value}"))
}

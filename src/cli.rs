// Copyright 2021-2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Flags shared by every subcommand.
#[derive(Debug, Parser)]
pub struct BaseOptions {
    /// Archive base URL
    ///
    /// Information on suites, components, packages and releases is
    /// downloaded from this base. Falls back to `DEB_ARCHIVE_BASE_URL` when
    /// left at its default.
    #[clap(long, default_value = "https://deb.debian.org/debian")]
    pub base_url: String,
    /// OpenPGP keyring path (file or directory of `*.gpg`); repeatable
    ///
    /// When omitted, a short platform-specific default list is used.
    #[clap(long)]
    pub keyring: Vec<PathBuf>,
    /// Disable `Release`/`InRelease` signature verification
    ///
    /// Per-file checksum verification against the fetched `ReleaseFile` is
    /// unaffected by this flag.
    #[clap(long)]
    pub no_gpg_verify: bool,
    /// Minimum spacing between HTTP requests, in seconds
    #[clap(long)]
    pub rate_limit: Option<f64>,
    /// Suppress progress rendering entirely
    #[clap(long)]
    pub silent: bool,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Parser)]
pub struct DownloadOptions {
    /// Package name
    pub name: String,
    /// Exact version to fetch; latest catalogue entry if omitted
    #[clap(long)]
    pub version: Option<String>,
    /// Architecture to fetch
    #[clap(long, default_value = "amd64")]
    pub architecture: String,
    /// Suite to fetch from
    #[clap(long, default_value = "sid")]
    pub suite: String,
    /// Component to fetch from
    #[clap(long, default_value = "main")]
    pub component: String,
    /// Destination directory
    #[clap(long, default_value = ".")]
    pub destination: PathBuf,
}

#[derive(Debug, Parser)]
pub struct DownloadSourceOptions {
    /// Source package name
    pub name: String,
    /// Exact version to fetch; latest catalogue entry if omitted
    #[clap(long)]
    pub version: Option<String>,
    /// Suite to fetch from
    #[clap(long, default_value = "sid")]
    pub suite: String,
    /// Component to fetch from
    #[clap(long, default_value = "main")]
    pub component: String,
    /// Destination directory
    #[clap(long, default_value = ".")]
    pub destination: PathBuf,
    /// Fetch only the upstream `.orig.tar.*`, skipping `.dsc`/`.debian.tar.*`
    #[clap(long)]
    pub orig_only: bool,
}

#[derive(Debug, Parser)]
pub struct UpdateCacheOptions {
    /// Suite to cache
    #[clap(long, default_value = "sid")]
    pub suite: String,
    /// Components to cache; repeatable
    #[clap(long = "component", required = true)]
    pub components: Vec<String>,
    /// Architectures to cache; repeatable
    #[clap(long = "architecture", required = true)]
    pub architectures: Vec<String>,
    /// Cache directory
    #[clap(long)]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct MirrorOptions {
    /// Suite to mirror
    #[clap(long, default_value = "sid")]
    pub suite: String,
    /// Components to mirror; repeatable
    #[clap(long = "component", required = true)]
    pub components: Vec<String>,
    /// Architectures to mirror; repeatable
    #[clap(long = "architecture", required = true)]
    pub architectures: Vec<String>,
    /// Destination directory
    #[clap(long)]
    pub destination: PathBuf,
    /// Also mirror each component's `Sources` index and source files
    #[clap(long)]
    pub with_sources: bool,
}

#[derive(Debug, Parser)]
pub struct CustomRepoOptions {
    /// Path to the root-package XML document
    #[clap(long)]
    pub packages_xml: PathBuf,
    /// Suite to resolve and mirror against
    #[clap(long, default_value = "sid")]
    pub suite: String,
    /// Components to resolve and mirror against; repeatable
    #[clap(long = "component", required = true)]
    pub components: Vec<String>,
    /// Architectures to resolve and mirror against; repeatable
    #[clap(long = "architecture", required = true)]
    pub architectures: Vec<String>,
    /// Destination directory for the produced archive
    #[clap(long)]
    pub destination: PathBuf,
    /// Comma-separated relation kinds to exclude from the dependency
    /// closure (`depends, pre-depends, recommends, suggests, enhances`)
    #[clap(long, value_delimiter = ',')]
    pub exclude_deps: Vec<String>,
    /// Also include each root's source package in the produced archive
    #[clap(long)]
    pub include_sources: bool,
    /// Path to the OpenPGP certificate used to sign the produced `Release`
    #[clap(long)]
    pub gpg_key_path: Option<PathBuf>,
    /// Name of the environment variable holding the signing key's
    /// passphrase, if it has one
    ///
    /// Never accepts the passphrase itself as a CLI flag: that would leak
    /// it via `ps`.
    #[clap(long)]
    pub gpg_passphrase_env: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a single binary package
    Download(DownloadOptions),
    /// Download a single source package
    #[clap(name = "download-source")]
    DownloadSource(DownloadSourceOptions),
    /// Fetch and cache Release/Packages/Sources for offline use
    #[clap(name = "update-cache")]
    UpdateCache(UpdateCacheOptions),
    /// Mirror a suite's components and architectures
    Mirror(MirrorOptions),
    /// Build a custom archive from a root-package set and its dependency closure
    #[clap(name = "custom-repo")]
    CustomRepo(CustomRepoOptions),
}

#[derive(Debug, Parser)]
#[command(name = "deb-archive", version, about)]
pub struct DebArchiveOptions {
    #[clap(flatten)]
    pub base_options: BaseOptions,
    #[clap(subcommand)]
    pub command: Command,
}

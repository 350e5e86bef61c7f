// Copyright 2021-2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod xml;

use cli::{Command, DebArchiveOptions};
use commands::{CustomRepo, Download, DownloadSource, Mirror, UpdateCache};
use config::Config;

/// `RUST_LOG` (standard `EnvFilter` syntax) overrides the level derived
/// from `--verbose`/`-v` stacking, matching the teacher's
/// `stderrlog`/`clap-verbosity-flag` combination generalized to `tracing`.
fn init_tracing(base: &cli::BaseOptions) {
    let fallback = base.verbose.tracing_level_filter();
    let filter = EnvFilter::builder().with_default_directive(fallback.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let opts = DebArchiveOptions::parse();
    init_tracing(&opts.base_options);

    let config = Config::from_base_options(&opts.base_options);

    match opts.command {
        Command::Download(download_opts) => Download::new(config, download_opts)?.run(),
        Command::DownloadSource(download_source_opts) => DownloadSource::new(config, download_source_opts)?.run(),
        Command::UpdateCache(update_cache_opts) => UpdateCache::new(config, update_cache_opts)?.run(),
        Command::Mirror(mirror_opts) => Mirror::new(config, mirror_opts)?.run(),
        Command::CustomRepo(custom_repo_opts) => CustomRepo::new(config, custom_repo_opts)?.run(),
    }
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use archive_core::client::ArchiveClient;

use crate::cli::UpdateCacheOptions;
use crate::config::Config;

/// `update-cache`: fetch Release/Packages for a suite and write a
/// decompressed cache tree, for reuse without further network access.
pub struct UpdateCache {
    options: UpdateCacheOptions,
    client: ArchiveClient,
}

impl UpdateCache {
    pub fn new(config: Config, options: UpdateCacheOptions) -> Result<Self> {
        let client = super::build_client(&config, &options.suite, &options.components, &options.architectures)?;
        Ok(Self { options, client })
    }

    #[tokio::main]
    pub async fn run(mut self) -> Result<()> {
        self.client.fetch_release().await.context("failed to fetch Release")?;
        self.client.fetch_packages().await.context("failed to fetch Packages")?;
        self.client
            .write_cache(&self.options.cache_dir)
            .await
            .context("failed to write cache")?;
        Ok(())
    }
}

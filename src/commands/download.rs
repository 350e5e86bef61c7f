// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use archive_core::client::ArchiveClient;
use archive_core::downloader::{self, DownloadItem, DownloaderConfig, ProgressMode};
use archive_core::package::PackageName;
use archive_core::transport::Transport;

use crate::cli::DownloadOptions;
use crate::config::Config;

/// `download {name}`: fetch a single binary package by name (and optional
/// version) into a destination directory.
pub struct Download {
    config: Config,
    options: DownloadOptions,
    client: ArchiveClient,
}

impl Download {
    pub fn new(config: Config, options: DownloadOptions) -> Result<Self> {
        let client = super::build_client(
            &config,
            &options.suite,
            std::slice::from_ref(&options.component),
            std::slice::from_ref(&options.architecture),
        )?;
        Ok(Self { config, options, client })
    }

    #[tokio::main]
    pub async fn run(mut self) -> Result<()> {
        self.client.fetch_release().await.context("failed to fetch Release")?;
        self.client.fetch_packages().await.context("failed to fetch Packages")?;

        let name = PackageName::try_from(self.options.name.as_str()).map_err(|_| anyhow::anyhow!("invalid package name: {}", self.options.name))?;
        let package = self
            .client
            .catalogue()
            .find_package(&name, self.options.version.as_deref(), &[])
            .ok_or_else(|| anyhow::anyhow!("package {} not found in catalogue", self.options.name))?
            .clone();

        std::fs::create_dir_all(&self.options.destination).context("failed to create destination directory")?;
        let destination = self.options.destination.join(package.effective_filename());
        let url = format!(
            "{}/pool/{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.options.component,
            package.pool_prefix(),
            package.source_name(),
            package.effective_filename()
        );

        let item = DownloadItem {
            url,
            destination,
            size: Some(package.size),
            sha256: package.sha256.clone(),
            md5: package.md5sum.clone(),
        };

        let transport = Transport::new(self.config.transport_config())?;
        let downloader_config = DownloaderConfig {
            parallelism: self.config.parallelism(),
            progress: if self.config.silent { ProgressMode::Silent } else { ProgressMode::Visible },
        };
        let results = downloader::fetch_all(&transport, vec![item], &downloader_config).await;
        for (item, outcome) in results {
            if let downloader::DownloadOutcome::Failed(e) = outcome {
                anyhow::bail!("failed to download {}: {e}", item.url);
            }
        }

        Ok(())
    }
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use archive_core::client::ArchiveClient;
use archive_core::downloader::{self, DownloadItem, DownloaderConfig, ProgressMode};
use archive_core::package::{PackageName, SourceFileKind};
use archive_core::transport::Transport;

use crate::cli::DownloadSourceOptions;
use crate::config::Config;

/// `download-source {name}`: fetch a source package's files (`.dsc`,
/// `.orig.tar.*`, `.debian.tar.*`) into a destination directory.
pub struct DownloadSource {
    config: Config,
    options: DownloadSourceOptions,
    client: ArchiveClient,
}

impl DownloadSource {
    pub fn new(config: Config, options: DownloadSourceOptions) -> Result<Self> {
        let client = super::build_client(&config, &options.suite, std::slice::from_ref(&options.component), &[])?;
        Ok(Self { config, options, client })
    }

    #[tokio::main]
    pub async fn run(mut self) -> Result<()> {
        self.client.fetch_release().await.context("failed to fetch Release")?;
        self.client.fetch_sources().await.context("failed to fetch Sources")?;

        let name = PackageName::try_from(self.options.name.as_str())
            .map_err(|_| anyhow::anyhow!("invalid package name: {}", self.options.name))?;
        let source = self
            .client
            .catalogue()
            .find_source(&name, self.options.version.as_deref())
            .ok_or_else(|| anyhow::anyhow!("source package {} not found in catalogue", self.options.name))?
            .clone();

        std::fs::create_dir_all(&self.options.destination).context("failed to create destination directory")?;

        let items: Vec<DownloadItem> = source
            .files
            .iter()
            .filter(|f| !self.options.orig_only || f.kind == SourceFileKind::Orig)
            .map(|f| DownloadItem {
                url: f.url.clone(),
                destination: self.options.destination.join(&f.name),
                size: Some(f.size),
                sha256: f.sha256.clone(),
                md5: f.md5sum.clone(),
            })
            .collect();

        if items.is_empty() {
            anyhow::bail!("no files matched for source package {}", self.options.name);
        }

        let transport = Transport::new(self.config.transport_config())?;
        let downloader_config = DownloaderConfig {
            parallelism: self.config.parallelism(),
            progress: if self.config.silent { ProgressMode::Silent } else { ProgressMode::Visible },
        };
        let results = downloader::fetch_all(&transport, items, &downloader_config).await;
        for (item, outcome) in results {
            if let downloader::DownloadOutcome::Failed(e) = outcome {
                anyhow::bail!("failed to download {}: {e}", item.url);
            }
        }

        Ok(())
    }
}

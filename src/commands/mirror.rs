// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use archive_core::client::ArchiveClient;
use archive_core::downloader::{self, DownloadItem, DownloaderConfig, ProgressMode};
use archive_core::mirror::{MirrorWriter, ReleaseMetadata};
use archive_core::transport::Transport;
use chrono::Duration;

use crate::cli::MirrorOptions;
use crate::config::{parse_architecture, parse_component, Config};

/// `mirror`: fetch a suite's indices, download every referenced file, and
/// re-emit a well-formed unsigned `dists/` tree at the destination.
pub struct Mirror {
    config: Config,
    options: MirrorOptions,
    client: ArchiveClient,
}

impl Mirror {
    pub fn new(config: Config, options: MirrorOptions) -> Result<Self> {
        let client = super::build_client(&config, &options.suite, &options.components, &options.architectures)?;
        Ok(Self { config, options, client })
    }

    #[tokio::main]
    pub async fn run(mut self) -> Result<()> {
        self.client.fetch_release().await.context("failed to fetch Release")?;
        self.client.fetch_packages().await.context("failed to fetch Packages")?;
        if self.options.with_sources {
            self.client.fetch_sources().await.context("failed to fetch Sources")?;
        }

        let transport = Transport::new(self.config.transport_config())?;
        let downloader_config = DownloaderConfig {
            parallelism: self.config.parallelism(),
            progress: if self.config.silent { ProgressMode::Silent } else { ProgressMode::Visible },
        };

        let pool_root = self.options.destination.clone();
        let items: Vec<DownloadItem> = self
            .client
            .catalogue()
            .packages()
            .iter()
            .map(|package| DownloadItem {
                url: format!(
                    "{}/pool/{}/{}/{}",
                    self.config.base_url.trim_end_matches('/'),
                    package.pool_prefix(),
                    package.source_name(),
                    package.effective_filename()
                ),
                destination: pool_root
                    .join("pool")
                    .join(package.pool_prefix())
                    .join(package.source_name())
                    .join(package.effective_filename()),
                size: Some(package.size),
                sha256: package.sha256.clone(),
                md5: package.md5sum.clone(),
            })
            .collect();

        let results = downloader::fetch_all(&transport, items, &downloader_config).await;
        let failures: Vec<_> = results
            .into_iter()
            .filter_map(|(item, outcome)| match outcome {
                downloader::DownloadOutcome::Failed(e) => Some(format!("{}: {e}", item.url)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            anyhow::bail!("{} file(s) failed to download:\n{}", failures.len(), failures.join("\n"));
        }

        let writer = MirrorWriter::new(&self.options.destination, self.client.catalogue().release().unwrap().suite.clone());
        let mut entries = std::collections::BTreeMap::new();
        for component_name in &self.options.components {
            let component = parse_component(component_name)?;
            for arch_name in &self.options.architectures {
                let arch = parse_architecture(arch_name)?;
                let packages: Vec<_> = self
                    .client
                    .catalogue()
                    .packages()
                    .iter()
                    .filter(|p| p.architecture == arch.as_ref())
                    .cloned()
                    .collect();
                for (path, size, sha256, md5) in writer.write_packages(&component, &arch, &packages)? {
                    entries.insert(path, (size, sha256, md5));
                }
            }
        }

        let release = self.client.catalogue().release().unwrap();
        let metadata = ReleaseMetadata {
            origin: release.origin.clone(),
            label: release.label.clone(),
            description: release.description.clone(),
            validity: Duration::days(7),
        };
        let components = self
            .options
            .components
            .iter()
            .map(|c| parse_component(c))
            .collect::<Result<Vec<_>>>()?;
        let architectures = self
            .options
            .architectures
            .iter()
            .map(|a| parse_architecture(a))
            .collect::<Result<Vec<_>>>()?;

        writer.write_release(&metadata, &release.codename, &architectures, &components, &entries, None)?;

        Ok(())
    }
}

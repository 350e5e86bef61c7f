// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use archive_core::client::ArchiveClient;
use archive_core::downloader::{self, DownloadItem, DownloaderConfig, ProgressMode};
use archive_core::mirror::{MirrorWriter, ReleaseMetadata, Signing};
use archive_core::openpgp;
use archive_core::package::RelationKind;
use archive_core::resolver;
use archive_core::transport::Transport;
use chrono::Duration;

use crate::cli::CustomRepoOptions;
use crate::config::{parse_architecture, parse_component, Config};
use crate::xml;

/// `custom-repo`: resolve a declared root-package set's dependency closure
/// and re-publish it as a standalone, optionally signed archive.
pub struct CustomRepo {
    config: Config,
    options: CustomRepoOptions,
    client: ArchiveClient,
}

impl CustomRepo {
    pub fn new(config: Config, options: CustomRepoOptions) -> Result<Self> {
        let client = super::build_client(&config, &options.suite, &options.components, &options.architectures)?;
        Ok(Self { config, options, client })
    }

    fn excluded_kinds(&self) -> Result<Vec<RelationKind>> {
        self.options
            .exclude_deps
            .iter()
            .map(|token| {
                RelationKind::from_token(token.trim()).ok_or_else(|| anyhow::anyhow!("unknown dependency kind: {token}"))
            })
            .collect()
    }

    #[tokio::main]
    pub async fn run(mut self) -> Result<()> {
        self.client.fetch_release().await.context("failed to fetch Release")?;
        self.client.fetch_packages().await.context("failed to fetch Packages")?;
        if self.options.include_sources {
            self.client.fetch_sources().await.context("failed to fetch Sources")?;
        }

        let roots = xml::parse_root_packages(&self.options.packages_xml)?;
        let excluded = self.excluded_kinds()?;
        let resolved = resolver::resolve(self.client.catalogue(), roots.clone(), &excluded).context("dependency resolution failed")?;

        std::fs::create_dir_all(&self.options.destination).context("failed to create destination directory")?;

        let transport = Transport::new(self.config.transport_config())?;
        let downloader_config = DownloaderConfig {
            parallelism: self.config.parallelism(),
            progress: if self.config.silent { ProgressMode::Silent } else { ProgressMode::Visible },
        };

        let items: Vec<DownloadItem> = resolved
            .values()
            .map(|package| DownloadItem {
                url: format!(
                    "{}/pool/{}/{}/{}",
                    self.config.base_url.trim_end_matches('/'),
                    package.pool_prefix(),
                    package.source_name(),
                    package.effective_filename()
                ),
                destination: self
                    .options
                    .destination
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

        if self.options.include_sources {
            let source_items: Vec<DownloadItem> = roots
                .iter()
                .filter_map(|spec| self.client.catalogue().find_source(&spec.name, spec.version.as_deref()))
                .flat_map(|source| {
                    source.files.iter().map(move |f| DownloadItem {
                        url: f.url.clone(),
                        destination: std::path::PathBuf::from(&f.name),
                        size: Some(f.size),
                        sha256: f.sha256.clone(),
                        md5: f.md5sum.clone(),
                    })
                })
                .collect();
            downloader::fetch_all(&transport, source_items, &downloader_config).await;
        }

        let release = self.client.catalogue().release().unwrap();
        let writer = MirrorWriter::new(&self.options.destination, release.suite.clone());
        let mut entries = BTreeMap::new();

        for component_name in &self.options.components {
            let component = parse_component(component_name)?;
            for arch_name in &self.options.architectures {
                let arch = parse_architecture(arch_name)?;
                let packages: Vec<_> = resolved.values().filter(|p| p.architecture == arch.as_ref()).cloned().collect();
                for (path, size, sha256, md5) in writer.write_packages(&component, &arch, &packages)? {
                    entries.insert(path, (size, sha256, md5));
                }
            }
        }

        let metadata = ReleaseMetadata {
            origin: release.origin.clone(),
            label: release.label.clone(),
            description: format!("{} (custom subset)", release.description),
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
        let codename = release.codename.clone();

        let signing_material = match (&self.options.gpg_key_path, &self.options.gpg_passphrase_env) {
            (Some(path), passphrase_env) => {
                let cert = openpgp::load_cert(path)?;
                let passphrase = passphrase_env
                    .as_ref()
                    .map(|var| std::env::var(var).with_context(|| format!("environment variable {var} is not set")))
                    .transpose()?;
                Some((cert, passphrase))
            }
            (None, _) => None,
        };

        writer.write_release(
            &metadata,
            &codename,
            &architectures,
            &components,
            &entries,
            signing_material.as_ref().map(|(cert, passphrase)| Signing {
                cert,
                passphrase: passphrase.as_deref(),
            }),
        )?;

        Ok(())
    }
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

//! # Orchestrators (C11)
//!
//! One module per subcommand, each composing the `archive-core` client,
//! downloader and mirror writer the way `process_excuses.rs`/`nmu_list.rs`
//! composed `config::Cache` in the teacher repo: an `Options` struct holding
//! parsed CLI flags, a `new()` that builds whatever `archive-core` state is
//! needed up front, and a `run()` that drives the actual work.

mod custom_repo;
mod download;
mod download_source;
mod mirror;
mod update_cache;

pub use custom_repo::CustomRepo;
pub use download::Download;
pub use download_source::DownloadSource;
pub use mirror::Mirror;
pub use update_cache::UpdateCache;

use anyhow::{Context, Result};
use archive_core::client::{ArchiveClient, ClientConfig};
use archive_core::openpgp::KeyRing;
use archive_core::transport::Transport;

use crate::config::{parse_architecture, parse_component, parse_suite, Config};

/// Build an [`ArchiveClient`] from parsed CLI strings, shared by every
/// orchestrator that needs one.
pub(crate) fn build_client(
    config: &Config,
    suite: &str,
    components: &[String],
    architectures: &[String],
) -> Result<ArchiveClient> {
    let suite = parse_suite(suite)?;
    let components = components.iter().map(|c| parse_component(c)).collect::<Result<Vec<_>>>()?;
    let architectures = architectures
        .iter()
        .map(|a| parse_architecture(a))
        .collect::<Result<Vec<_>>>()?;

    let transport = Transport::new(config.transport_config()).context("failed to build transport")?;
    let keyring = if config.verify_signature {
        config.load_keyring()?
    } else {
        KeyRing::empty()
    };

    let client_config = ClientConfig {
        base_url: config.base_url.clone(),
        suite,
        components,
        architectures,
        verify_release: true,
        verify_signature: config.verify_signature,
    };

    Ok(ArchiveClient::new(client_config, transport, keyring))
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Content-addressed downloader
//!
//! Downloads pool files (`.deb`, `.dsc`, source tarballs, ...) to a
//! destination directory, skipping files whose content already matches the
//! expected checksum and streaming the rest in bounded chunks so neither the
//! hash nor the write buffers the whole file in memory.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use crate::digest::digest_hex;
use crate::error::{ArchiveError, DigestKind, Result};
use crate::transport::Transport;

const CHUNK_DISPLAY_SIZE: u64 = 32 * 1024;

/// One file to fetch: its source URL, destination path, and the checksum(s)
/// that authorize it.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    /// Source URL
    pub url: String,
    /// Destination path on disk
    pub destination: PathBuf,
    /// Expected size in bytes, if known (used only for progress display)
    pub size: Option<u64>,
    /// Expected SHA256, preferred over MD5 when both are present
    pub sha256: Option<String>,
    /// Expected MD5, used when no SHA256 is available
    pub md5: Option<String>,
}

impl DownloadItem {
    fn expected_digest(&self) -> Option<(DigestKind, &str)> {
        self.sha256
            .as_deref()
            .map(|h| (DigestKind::Sha256, h))
            .or_else(|| self.md5.as_deref().map(|h| (DigestKind::Md5, h)))
    }
}

/// Whether progress should be reported while downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Render a per-file progress bar
    Visible,
    /// No progress output
    Silent,
}

/// Downloader configuration.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Number of files downloaded concurrently
    pub parallelism: usize,
    /// Whether to report progress
    pub progress: ProgressMode,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            parallelism: 5,
            progress: ProgressMode::Silent,
        }
    }
}

/// The outcome of one item's download attempt.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Already present on disk with a matching checksum; nothing fetched
    Skipped,
    /// Fetched and written
    Fetched,
    /// Fetch or verification failed
    Failed(ArchiveError),
}

/// Compare an existing file's checksum against what `item` expects.
/// Returns `false` (not skippable) if the file is missing, unreadable, or
/// `item` carries no checksum to compare against.
pub fn should_skip(item: &DownloadItem) -> bool {
    let Some((kind, expected)) = item.expected_digest() else {
        return false;
    };
    let Ok(data) = std::fs::read(&item.destination) else {
        return false;
    };
    digest_hex(kind, &data).eq_ignore_ascii_case(expected)
}

/// Fetch one item, skipping it if the destination already matches its
/// checksum. Streams the body in `CHUNK_DISPLAY_SIZE`-ish chunks supplied
/// by the underlying HTTP stream, verifying the checksum after the last
/// byte is written.
pub async fn fetch_one(transport: &Transport, item: &DownloadItem, progress: Option<&ProgressBar>) -> DownloadOutcome {
    if should_skip(item) {
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
        return DownloadOutcome::Skipped;
    }

    if let Err(e) = fetch_one_inner(transport, item, progress).await {
        return DownloadOutcome::Failed(e);
    }
    DownloadOutcome::Fetched
}

async fn fetch_one_inner(transport: &Transport, item: &DownloadItem, progress: Option<&ProgressBar>) -> Result<()> {
    if let Some(parent) = item.destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ArchiveError::Io)?;
    }

    let mut stream = transport.get_stream(&item.url).await?;
    let mut file = tokio::fs::File::create(&item.destination)
        .await
        .map_err(ArchiveError::Io)?;
    let mut hasher_kind = item.expected_digest().map(|(kind, _)| kind);
    let mut buffer = Vec::new();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ArchiveError::NetworkFailure {
            url: item.url.clone(),
            source: e,
        })?;
        file.write_all(&chunk).await.map_err(ArchiveError::Io)?;
        if hasher_kind.is_some() {
            buffer.extend_from_slice(&chunk);
        }
        written += chunk.len() as u64;
        if let Some(bar) = progress {
            bar.set_position(written);
        }
    }
    file.flush().await.map_err(ArchiveError::Io)?;

    if let (Some(kind), Some((_, expected))) = (hasher_kind.take(), item.expected_digest()) {
        crate::digest::verify(kind, &buffer, expected, &item.destination.to_string_lossy())?;
    }

    if let Some(bar) = progress {
        bar.finish_with_message("done");
    }
    Ok(())
}

fn make_progress_bar(item: &DownloadItem, mode: ProgressMode) -> Option<ProgressBar> {
    if mode != ProgressMode::Visible {
        return None;
    }
    let bar = match item.size {
        Some(size) => ProgressBar::new(size),
        None => ProgressBar::new(CHUNK_DISPLAY_SIZE),
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {bytes}/{total_bytes}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let name = Path::new(&item.destination)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    bar.set_message(name);
    Some(bar)
}

/// Fetch every item, respecting `config.parallelism` (forced to 1 by
/// `transport`'s rate limiter, see [`Transport::effective_parallelism`]).
/// Per-item failures are collected rather than aborting the whole batch.
pub async fn fetch_all(transport: &Transport, items: Vec<DownloadItem>, config: &DownloaderConfig) -> Vec<(DownloadItem, DownloadOutcome)> {
    let parallelism = transport.effective_parallelism(config.parallelism);
    let progress = config.progress;

    let results = futures_util::stream::iter(items.into_iter().map(|item| {
        let transport = transport;
        async move {
            let bar = make_progress_bar(&item, progress);
            let outcome = fetch_one(transport, &item, bar.as_ref()).await;
            (item, outcome)
        }
    }))
    .buffer_unordered(parallelism)
    .collect::<Vec<_>>()
    .await;

    results
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn skip_when_checksum_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"hello").unwrap();
        let item = DownloadItem {
            url: "http://example.org/file.txt".to_owned(),
            destination: path,
            size: None,
            sha256: Some(digest_hex(DigestKind::Sha256, b"hello")),
            md5: None,
        };
        assert!(should_skip(&item));
    }

    #[test]
    fn do_not_skip_when_checksum_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"hello").unwrap();
        let item = DownloadItem {
            url: "http://example.org/file.txt".to_owned(),
            destination: path,
            size: None,
            sha256: Some("0000".to_owned()),
            md5: None,
        };
        assert!(!should_skip(&item));
    }

    #[test]
    fn do_not_skip_when_file_missing() {
        let item = DownloadItem {
            url: "http://example.org/file.txt".to_owned(),
            destination: PathBuf::from("/nonexistent/file.txt"),
            size: None,
            sha256: Some("0000".to_owned()),
            md5: None,
        };
        assert!(!should_skip(&item));
    }

    #[test]
    fn without_checksum_never_skips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, b"hello").unwrap();
        let item = DownloadItem {
            url: "http://example.org/file.txt".to_owned(),
            destination: path,
            size: None,
            sha256: None,
            md5: None,
        };
        assert!(!should_skip(&item));
    }
}

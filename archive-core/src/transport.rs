// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # HTTP transport
//!
//! A thin wrapper around [`reqwest`] that adds retry-with-backoff, a
//! request timeout, a fixed user agent, and an optional rate limiter that
//! paces requests instead of bursting them (see [`crate::downloader`] for
//! why that collapses worker-pool concurrency to one).

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{ArchiveError, Result};

const USER_AGENT: &str = concat!("deb-archive/", env!("CARGO_PKG_VERSION"));

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Number of attempts before giving up (first try plus retries)
    pub retries: u32,
    /// Backoff between retries
    pub retry_backoff: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Minimum spacing between requests, if rate-limited
    pub rate_limit: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
            rate_limit: None,
        }
    }
}

/// An HTTP client with retry, timeout and pacing built in.
pub struct Transport {
    client: reqwest::Client,
    config: TransportConfig,
    pace: Option<Mutex<()>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("config", &self.config).finish()
    }
}

impl Transport {
    /// Build a transport from the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ArchiveError::ConfigInvalid(format!("failed to build HTTP client: {e}")))?;
        let pace = config.rate_limit.map(|_| Mutex::new(()));
        Ok(Self { client, config, pace })
    }

    /// The effective download concurrency this transport allows: forced to
    /// one whenever a rate limit is configured, since pacing and bounded
    /// concurrency otherwise fight each other.
    pub fn effective_parallelism(&self, requested: usize) -> usize {
        if self.config.rate_limit.is_some() {
            1
        } else {
            requested.max(1)
        }
    }

    async fn pace(&self) {
        if let (Some(pace), Some(interval)) = (&self.pace, self.config.rate_limit) {
            let _guard = pace.lock().await;
            sleep(interval).await;
        }
    }

    /// HEAD a URL, returning whether the server reports it as existing.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        for attempt in 0..self.config.retries {
            self.pace().await;
            match self.client.head(url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => return Ok(false),
                Ok(response) if response.status().is_success() => return Ok(true),
                Ok(response) => {
                    tracing::debug!("HEAD {url} returned {}", response.status());
                    return Ok(false);
                }
                Err(e) if attempt + 1 == self.config.retries => {
                    return Err(ArchiveError::NetworkFailure { url: url.to_owned(), source: e })
                }
                Err(e) => {
                    tracing::warn!("HEAD {url} failed (attempt {}/{}): {e}", attempt + 1, self.config.retries);
                    sleep(self.config.retry_backoff).await;
                }
            }
        }
        Ok(false)
    }

    /// GET a URL's full body, retrying on transport failure and treating a
    /// 404 as [`ArchiveError::HttpNotFound`] (not worth retrying).
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        for attempt in 0..self.config.retries {
            self.pace().await;
            match self.client.get(url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Err(ArchiveError::HttpNotFound(url.to_owned()))
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => {
                        return response
                            .bytes()
                            .await
                            .map(|b| b.to_vec())
                            .map_err(|e| ArchiveError::NetworkFailure { url: url.to_owned(), source: e })
                    }
                    Err(e) if attempt + 1 == self.config.retries => {
                        return Err(ArchiveError::NetworkFailure { url: url.to_owned(), source: e })
                    }
                    Err(e) => {
                        tracing::warn!("GET {url} failed (attempt {}/{}): {e}", attempt + 1, self.config.retries);
                        sleep(self.config.retry_backoff).await;
                    }
                },
                Err(e) if attempt + 1 == self.config.retries => {
                    return Err(ArchiveError::NetworkFailure { url: url.to_owned(), source: e })
                }
                Err(e) => {
                    tracing::warn!("GET {url} failed (attempt {}/{}): {e}", attempt + 1, self.config.retries);
                    sleep(self.config.retry_backoff).await;
                }
            }
        }
        unreachable!("loop always returns within `retries` attempts")
    }

    /// GET a URL as a stream, for callers that want to tee-hash or write to
    /// disk incrementally rather than buffering the whole body.
    pub async fn get_stream(
        &self,
        url: &str,
    ) -> Result<impl futures_util::Stream<Item = reqwest::Result<bytes::Bytes>>> {
        self.pace().await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArchiveError::NetworkFailure { url: url.to_owned(), source: e })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ArchiveError::HttpNotFound(url.to_owned()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ArchiveError::NetworkFailure { url: url.to_owned(), source: e })?;
        Ok(response.bytes_stream())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_parallelism_ignores_rate_limit_when_unset() {
        let transport = Transport::new(TransportConfig::default()).unwrap();
        assert_eq!(transport.effective_parallelism(5), 5);
    }

    #[test]
    fn rate_limit_collapses_parallelism_to_one() {
        let config = TransportConfig {
            rate_limit: Some(Duration::from_millis(100)),
            ..TransportConfig::default()
        };
        let transport = Transport::new(config).unwrap();
        assert_eq!(transport.effective_parallelism(5), 1);
    }
}

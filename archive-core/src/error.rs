// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Error kinds for the archive engine
//!
//! Every fallible operation in this crate returns [`ArchiveError`]. The binary
//! crate wraps these in `anyhow::Result` with additional context at the
//! orchestrator boundary; within the engine itself errors stay typed so
//! callers can match on the kind (e.g. to decide whether a per-(component,
//! architecture) fetch failure is fatal).

use std::path::PathBuf;

use thiserror::Error;

/// Hash kind used throughout checksum verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    /// MD5, kept for archives or fields that only advertise it
    Md5,
    /// SHA256, the preferred digest everywhere it is available
    Sha256,
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestKind::Md5 => write!(f, "MD5"),
            DigestKind::Sha256 => write!(f, "SHA256"),
        }
    }
}

/// The error kinds produced by the archive engine.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Transport exhausted its retries against a URL.
    #[error("network request to {url} failed after retries: {source}")]
    NetworkFailure {
        /// url that failed
        url: String,
        /// underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The resource does not exist (HTTP 404 or equivalent).
    #[error("resource not found: {0}")]
    HttpNotFound(String),

    /// A file suffix could not be mapped to a known compression scheme.
    #[error("unsupported compression suffix: {0}")]
    UnsupportedCompression(String),

    /// A clearsigned or detached signature did not validate against any
    /// configured keyring.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Verification was required but no keyring was configured.
    #[error("no trust root available for signature verification")]
    NoTrustRoot,

    /// A checksum did not match the expected value.
    #[error("checksum mismatch for {filename}: expected {expected} ({kind}), got {actual}")]
    ChecksumMismatch {
        /// file the checksum was computed for
        filename: String,
        /// expected hex digest
        expected: String,
        /// actual hex digest
        actual: String,
        /// digest kind used
        kind: DigestKind,
    },

    /// The `ReleaseFile` did not carry a digest of the kind required for
    /// streaming verification.
    #[error("no trusted digest available for {0}")]
    NoTrustedDigest(String),

    /// A control paragraph or `Release` section failed to parse.
    #[error("failed to parse {context}: {message}")]
    ParseError {
        /// what was being parsed
        context: String,
        /// human-readable detail
        message: String,
    },

    /// A requested package does not exist in the catalogue.
    #[error("package not found: {0}")]
    PackageMissing(String),

    /// A pinned package spec did not match the version found in the catalogue.
    #[error("version mismatch for {name}: requested {requested}, found {found}")]
    VersionMismatch {
        /// package name
        name: String,
        /// version requested by the caller
        requested: String,
        /// version actually present
        found: String,
    },

    /// A dependency named by a resolved package could not be found.
    #[error("dependency missing: {0}")]
    DependencyMissing(String),

    /// Writing a file into a pool/mirror tree failed.
    #[error("failed to write {path}: {source}")]
    PoolWriteFailure {
        /// path that could not be written
        path: PathBuf,
        /// underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Detached or clearsigned signing failed.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// The configuration supplied by the caller is invalid.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Wraps an I/O error with no more specific kind above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

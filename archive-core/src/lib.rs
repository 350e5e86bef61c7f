// Copyright 2021 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Debian-archive protocol engine
//!
//! This crate consists of the following modules:
//! * [architectures]: Helpers to handle Debian architectures
//! * [archive]: Helpers for various features of the Debian archive
//! * [version]: Helpers to handle package versions
//! * [package]: Binary and source package records, and dependency relations
//! * [release]: The `Release` manifest and its per-file checksums
//! * [control]: Streaming `Packages`/`Sources` paragraph scanner
//! * [compress]: Decompression of `.gz`/`.xz` index variants
//! * [digest]: Checksum computation and streaming verification
//! * [openpgp]: Clearsigned/detached signature verification and signing
//! * [transport]: HTTP fetch with retry, timeout and rate limiting
//! * [catalogue]: In-memory collection of packages and source packages
//! * [resolver]: Breadth-first dependency-closure resolution
//! * [client]: Orchestrates Release/Packages/Sources fetch and verify
//! * [downloader]: Content-addressed pool file downloads
//! * [mirror]: Composes and (optionally) signs a `dists/{suite}/...` tree
//! * [error]: Typed error kinds shared across the crate

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod architectures;
pub mod archive;
pub mod catalogue;
pub mod client;
pub mod compress;
pub mod control;
pub mod digest;
pub mod downloader;
pub mod error;
pub mod mirror;
pub mod openpgp;
pub mod package;
pub mod release;
pub mod resolver;
pub mod transport;
mod utils;
pub mod version;

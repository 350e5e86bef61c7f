// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Decompression by file suffix
//!
//! `Packages`/`Sources` indices are published plain, gzip- and
//! xz-compressed; the client probes suffixes in order and decompresses
//! whichever variant it found.

use std::io::Read;

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use crate::error::{ArchiveError, Result};

/// The compression variants an index file may be published under, in the
/// probe order [`crate::client`] tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// No compression
    Identity,
    /// `.gz`
    Gzip,
    /// `.xz`
    Xz,
}

impl Compression {
    /// The suffix this variant adds to a base filename, e.g. `Packages` ->
    /// `Packages.gz`.
    pub fn suffix(self) -> &'static str {
        match self {
            Compression::Identity => "",
            Compression::Gzip => ".gz",
            Compression::Xz => ".xz",
        }
    }

    /// Probe order: try the smallest transfer first.
    pub const PROBE_ORDER: [Compression; 3] = [Compression::Xz, Compression::Gzip, Compression::Identity];

    /// Infer the variant from a full filename's suffix.
    pub fn from_filename(filename: &str) -> Result<Self> {
        if filename.ends_with(".xz") {
            Ok(Compression::Xz)
        } else if filename.ends_with(".gz") {
            Ok(Compression::Gzip)
        } else {
            Ok(Compression::Identity)
        }
    }

    /// Wrap `reader` in the decoder for this variant.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::Identity => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
        }
    }
}

/// Decompress a full buffer according to the suffix of `filename`.
pub fn decompress_by_suffix(filename: &str, data: &[u8]) -> Result<Vec<u8>> {
    let suffix = filename.rsplit_once('.').map(|(_, s)| s).unwrap_or("");
    let mut out = Vec::new();
    let compression = match suffix {
        "gz" => Compression::Gzip,
        "xz" => Compression::Xz,
        "" => Compression::Identity,
        other => {
            // Any other known plain suffix (deb, dsc, tar, ...) is treated as
            // uncompressed; anything unrecognized by the caller's own check
            // should already have been rejected before reaching here.
            if ["deb", "dsc", "changes", "buildinfo"].contains(&other) {
                Compression::Identity
            } else {
                return Err(ArchiveError::UnsupportedCompression(filename.to_owned()));
            }
        }
    };
    compression
        .decoder(data)
        .read_to_end(&mut out)
        .map_err(ArchiveError::Io)?;
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let data = decompress_by_suffix("Packages", b"hello").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn gzip_round_trip() {
        use std::io::Write;

        use flate2::write::GzEncoder;
        use flate2::Compression as GzLevel;

        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(b"hello world").unwrap();
        let compressed = encoder.finish().unwrap();

        let data = decompress_by_suffix("Packages.gz", &compressed).unwrap();
        assert_eq!(data, b"hello world");
    }

    #[test]
    fn unknown_suffix_rejected() {
        assert!(decompress_by_suffix("Packages.lz4", b"x").is_err());
    }

    #[test]
    fn probe_order_starts_with_xz() {
        assert_eq!(Compression::PROBE_ORDER[0], Compression::Xz);
    }
}

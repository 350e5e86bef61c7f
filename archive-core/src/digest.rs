// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Checksum verification
//!
//! Two verification modes are supported: a one-shot hash-then-compare over
//! an in-memory buffer, and a streaming tee reader that hashes while the
//! caller reads, so a large `Packages`/`Sources` file or `.deb` can be
//! verified without buffering it twice.

use std::io::Read;

use md5::{Digest, Md5};
use sha2::Sha256;

use crate::error::{ArchiveError, DigestKind, Result};

/// Compute the hex-encoded digest of `data` for the given `kind`.
pub fn digest_hex(kind: DigestKind, data: &[u8]) -> String {
    match kind {
        DigestKind::Md5 => hex::encode(Md5::digest(data)),
        DigestKind::Sha256 => hex::encode(Sha256::digest(data)),
    }
}

/// Verify `data` against an expected hex digest, case-insensitively.
/// `filename` is used only to annotate the returned error.
pub fn verify(kind: DigestKind, data: &[u8], expected_hex: &str, filename: &str) -> Result<()> {
    let actual = digest_hex(kind, data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(ArchiveError::ChecksumMismatch {
            filename: filename.to_owned(),
            expected: expected_hex.to_owned(),
            actual,
            kind,
        })
    }
}

enum Hasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(kind: DigestKind) -> Self {
        match kind {
            DigestKind::Md5 => Hasher::Md5(Md5::new()),
            DigestKind::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// A reader adapter that hashes every byte read from the wrapped reader,
/// so callers can stream-verify a download while decompressing or parsing
/// it rather than buffering it up front.
pub struct TeeReader<R> {
    inner: R,
    hasher: Hasher,
}

impl<R: Read> TeeReader<R> {
    /// Wrap `inner`, hashing everything read from it with `kind`.
    pub fn new(inner: R, kind: DigestKind) -> Self {
        Self {
            inner,
            hasher: Hasher::new(kind),
        }
    }

    /// Consume the reader and return the hex-encoded digest of everything
    /// read so far. Call this only after reading to EOF.
    pub fn finalize_hex(self) -> String {
        self.hasher.finalize_hex()
    }
}

impl<R: Read> Read for TeeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use super::*;

    #[test]
    fn md5_known_vector() {
        assert_eq!(digest_hex(DigestKind::Md5, b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            digest_hex(DigestKind::Sha256, b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn verify_case_insensitive() {
        let expected = digest_hex(DigestKind::Sha256, b"hello").to_uppercase();
        assert!(verify(DigestKind::Sha256, b"hello", &expected, "hello.txt").is_ok());
    }

    #[test]
    fn verify_mismatch() {
        let err = verify(DigestKind::Sha256, b"hello", "00", "hello.txt").unwrap_err();
        assert!(matches!(err, ArchiveError::ChecksumMismatch { .. }));
    }

    #[test]
    fn tee_reader_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut tee = TeeReader::new(&data[..], DigestKind::Sha256);
        let mut buf = Vec::new();
        tee.read_to_end(&mut buf).unwrap();
        assert_eq!(tee.finalize_hex(), digest_hex(DigestKind::Sha256, data));
    }
}

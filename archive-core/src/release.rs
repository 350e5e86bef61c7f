// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Helper to handle `Release` files
//!
//! A custom or third-party archive may carry a codename this crate has never
//! heard of, so unlike the original `Suite`/`Codename` enumeration,
//! [`ReleaseFile::codename`] is a plain `String` here.

use std::collections::HashMap;
use std::fmt::Formatter;
use std::io::{BufRead, Cursor};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::architectures::Architecture;
use crate::archive::{Component, Suite};
use crate::utils::{DateTimeVisitor, WhitespaceListVisitor};

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(DateTimeVisitor("%a, %d %b %Y %H:%M:%S %Z"))
}

fn deserialize_datetime_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_datetime(deserializer).map(Some)
}

fn deserialize_architectures<'de, D>(deserializer: D) -> Result<Vec<Architecture>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(WhitespaceListVisitor::<Architecture>::new())
}

fn deserialize_components<'de, D>(deserializer: D) -> Result<Vec<Component>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(WhitespaceListVisitor::<Component>::new())
}

/// Visitor for a `MD5Sum:`/`SHA256:` style block: one `hash size filename`
/// triple per line, fixed hash width `N` in bytes.
#[derive(Debug)]
struct FileChecksumVisitor<const N: usize>;

impl<'de, const N: usize> serde::de::Visitor<'de> for FileChecksumVisitor<N> {
    type Value = HashMap<String, FileChecksum<N>>;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "a list of files")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let cursor = Cursor::new(s);
        let mut ret: HashMap<String, FileChecksum<N>> = Default::default();
        for line in cursor.lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<_> = line.split_ascii_whitespace().collect();
            if fields.len() != 3 {
                return Err(E::invalid_value(serde::de::Unexpected::Str(&line), &self));
            }

            let file = fields[2];
            let file_size = fields[1].parse().map_err(E::custom)?;
            let hash = hex::decode(fields[0]).map_err(E::custom)?;

            ret.insert(
                file.to_string(),
                FileChecksum {
                    file_size,
                    hash: hash
                        .try_into()
                        .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(fields[0]), &self))?,
                },
            );
        }
        Ok(ret)
    }
}

fn deserialize_sha256<'de, D>(deserializer: D) -> Result<HashMap<String, FileChecksum<32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(FileChecksumVisitor::<32>)
}

fn deserialize_md5<'de, D>(deserializer: D) -> Result<HashMap<String, FileChecksum<16>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_str(FileChecksumVisitor::<16>)
}

/// One entry of a `Release` file's `MD5Sum:`/`SHA256:` section.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct FileChecksum<const N: usize> {
    /// Expected size in bytes
    pub file_size: u64,
    /// Expected digest
    pub hash: [u8; N],
}

impl<const N: usize> FileChecksum<N> {
    /// The expected digest, hex-encoded.
    pub fn hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Representation of a `Release` file
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseFile {
    /// Origin of the release
    pub origin: String,
    /// Label of the release
    pub label: String,
    /// Suite of the release
    pub suite: Suite,
    /// Codename of the release, e.g. `sid`, or an arbitrary name for a
    /// custom archive
    pub codename: String,
    /// Version of the release
    pub version: Option<String>,
    /// Date of the release
    #[serde(deserialize_with = "deserialize_datetime")]
    pub date: DateTime<Utc>,
    /// Validity of the release
    #[serde(default, deserialize_with = "deserialize_datetime_option", rename = "Valid-Until")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Whether files should be acquired by hash
    #[serde(rename = "Acquire-By-Hash")]
    pub acquire_by_hash: Option<bool>,
    /// Supported architectures of the release
    #[serde(deserialize_with = "deserialize_architectures")]
    pub architectures: Vec<Architecture>,
    /// Components of the release
    #[serde(deserialize_with = "deserialize_components")]
    pub components: Vec<Component>,
    /// Release description
    pub description: String,
    /// `MD5Sum:` entries, kept for archives or tools that only advertise MD5
    #[serde(default, rename = "MD5Sum", deserialize_with = "deserialize_md5")]
    pub files_md5: HashMap<String, FileChecksum<16>>,
    /// `SHA256:` entries, the preferred digest wherever present
    #[serde(default, rename = "SHA256", deserialize_with = "deserialize_sha256")]
    pub files_sha256: HashMap<String, FileChecksum<32>>,
}

impl ReleaseFile {
    /// Look up the best available digest for a path relative to the suite
    /// directory (e.g. `main/binary-amd64/Packages.gz`), preferring SHA256.
    pub fn best_digest(&self, path: &str) -> Option<(crate::error::DigestKind, String, u64)> {
        if let Some(entry) = self.files_sha256.get(path) {
            return Some((crate::error::DigestKind::Sha256, entry.hex(), entry.file_size));
        }
        self.files_md5
            .get(path)
            .map(|entry| (crate::error::DigestKind::Md5, entry.hex(), entry.file_size))
    }

    /// Whether this release carries a digest of any kind for `path`.
    pub fn has_entry(&self, path: &str) -> bool {
        self.files_sha256.contains_key(path) || self.files_md5.contains_key(path)
    }
}

/// Read a `Release` file from a reader.
pub fn from_reader(reader: impl BufRead) -> Result<ReleaseFile, rfc822_like::de::Error> {
    rfc822_like::from_reader(reader)
}

/// Read a `Release` file from a string.
pub fn from_str(data: &str) -> Result<ReleaseFile, rfc822_like::de::Error> {
    rfc822_like::from_str(data)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn archive() {
        let data = r#"Origin: Debian-ramacher.at
Label: Debian-ramacher.at
Suite: unstable
Codename: sid
Version: 13.0
Date: Sun, 17 Dec 2023 18:43:37 UTC
Architectures: i386 amd64
Components: main
Description: Experimental and unfinished Debian packages (for unstable)
MD5Sum:
 628a4efab35e598c7b6debdb0ac85314 26187 main/binary-i386/Packages
 6c849211e65839aac2682c461c82dbb3 7777 main/binary-i386/Packages.gz
SHA256:
 efe2dafdf6a50f376af1dfc574d6bd3360558fde917555671b13832c89604d9f 26187 main/binary-i386/Packages
 3637559f78ac17d0e55bce465d510ef912d539e4b810a66b32431dd76f5929d8 193 main/source/Release"#;
        let release = from_str(data).unwrap();

        assert_eq!(release.architectures, vec![Architecture::try_from("i386").unwrap(), Architecture::try_from("amd64").unwrap()]);
        assert_eq!(release.components, vec![Component::try_from("main").unwrap()]);
        assert_eq!(release.suite, Suite::try_from("unstable").unwrap());
        assert_eq!(release.codename, "sid");
        assert!(release.files_sha256.contains_key("main/source/Release"));
        assert_eq!(
            release.files_sha256["main/source/Release"],
            FileChecksum {
                file_size: 193,
                hash: [
                    0x36, 0x37, 0x55, 0x9f, 0x78, 0xac, 0x17, 0xd0, 0xe5, 0x5b, 0xce, 0x46, 0x5d,
                    0x51, 0x0e, 0xf9, 0x12, 0xd5, 0x39, 0xe4, 0xb8, 0x10, 0xa6, 0x6b, 0x32, 0x43,
                    0x1d, 0xd7, 0x6f, 0x59, 0x29, 0xd8
                ]
            }
        );
    }

    #[test]
    fn best_digest_prefers_sha256() {
        let data = r#"Origin: Debian
Label: Debian
Suite: unstable
Codename: sid
Date: Sun, 17 Dec 2023 18:43:37 UTC
Architectures: amd64
Components: main
Description: test
MD5Sum:
 628a4efab35e598c7b6debdb0ac85314 26187 main/binary-amd64/Packages
SHA256:
 efe2dafdf6a50f376af1dfc574d6bd3360558fde917555671b13832c89604d9f 26187 main/binary-amd64/Packages"#;
        let release = from_str(data).unwrap();
        let (kind, hex, size) = release.best_digest("main/binary-amd64/Packages").unwrap();
        assert_eq!(kind, crate::error::DigestKind::Sha256);
        assert_eq!(size, 26187);
        assert_eq!(hex, "efe2dafdf6a50f376af1dfc574d6bd3360558fde917555671b13832c89604d9f");
        assert!(release.has_entry("main/binary-amd64/Packages"));
        assert!(!release.has_entry("main/binary-amd64/Packages.gz"));
    }
}

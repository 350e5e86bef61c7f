// Copyright 2021 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Helpers to handle Debian architectures
//!
//! Unlike a fixed release's architecture list, an arbitrary archive (a custom
//! mirror, a third-party repository) may advertise architecture tags this
//! crate has never seen, so [`Architecture`] is a validated string newtype
//! rather than a closed enum: it accepts anything that looks like a Debian
//! architecture tag and leaves matching up to the caller.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::utils::TryFromStrVisitor;

/// The pseudo-architecture under which source packages are indexed.
pub const SOURCE: &str = "source";

/// The pseudo-architecture for architecture-independent binary packages.
pub const ALL: &str = "all";

fn check_architecture(value: &str) -> Result<(), ArchitectureError> {
    if value.is_empty() {
        return Err(ArchitectureError::Empty);
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(ArchitectureError::InvalidCharacter);
    }
    Ok(())
}

/// Errors encountered while validating an architecture tag.
#[derive(Clone, Copy, Debug, Error)]
pub enum ArchitectureError {
    /// An architecture tag must not be empty
    #[error("architecture tag must not be empty")]
    Empty,
    /// An architecture tag may only contain lowercase ASCII, digits and `-`
    #[error("architecture tag contains an invalid character")]
    InvalidCharacter,
}

/// A Debian architecture tag, e.g. `amd64`, `arm64`, or the pseudo-architecture
/// `source` used by source package indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Architecture(String);

impl Architecture {
    /// The `all` pseudo-architecture, used by architecture-independent packages.
    pub fn all() -> Self {
        Self(ALL.to_owned())
    }

    /// The `source` pseudo-architecture, used by source package indices.
    pub fn source() -> Self {
        Self(SOURCE.to_owned())
    }

    /// True if this is the `source` pseudo-architecture.
    pub fn is_source(&self) -> bool {
        self.0 == SOURCE
    }
}

impl AsRef<str> for Architecture {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Architecture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Architecture {
    type Error = ArchitectureError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        check_architecture(value).map(|_| Self(value.to_owned()))
    }
}

impl TryFrom<String> for Architecture {
    type Error = ArchitectureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_architecture(&value).map(|_| Self(value))
    }
}

impl FromStr for Architecture {
    type Err = ArchitectureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::try_from(s)
    }
}

impl PartialEq<str> for Architecture {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(TryFromStrVisitor::new("an architecture tag"))
    }
}

/// A short list of common release architectures, handy as a default when a
/// caller has not configured an explicit architecture list.
pub fn common_release_architectures() -> Vec<Architecture> {
    ["amd64", "arm64", "armel", "armhf", "i386", "ppc64el", "s390x"]
        .into_iter()
        .map(|a| Architecture::try_from(a).expect("built-in architecture tags are valid"))
        .collect()
}

#[cfg(test)]
mod test {
    use super::Architecture;

    #[test]
    fn valid_architectures() {
        assert!(Architecture::try_from("amd64").is_ok());
        assert!(Architecture::try_from("kfreebsd-amd64").is_ok());
        assert_eq!(Architecture::source(), Architecture::try_from("source").unwrap());
        assert!(Architecture::try_from("source").unwrap().is_source());
    }

    #[test]
    fn invalid_architectures() {
        assert!(Architecture::try_from("").is_err());
        assert!(Architecture::try_from("AMD64").is_err());
        assert!(Architecture::try_from("amd 64").is_err());
    }
}

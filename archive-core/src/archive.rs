// Copyright 2022 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Helpers to handle Debian archives
//!
//! A generic archive client has to work against mirrors that were never
//! built into this crate (security mirrors, custom third-party archives,
//! the archive produced by the mirror writer itself), so suites and
//! components are validated string newtypes rather than the closed
//! enumeration of well-known Debian codenames a release-team tool can get
//! away with.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::utils::TryFromStrVisitor;

fn check_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\', '\0'])
        && value.bytes().all(|b| b.is_ascii_graphic())
}

/// Errors encountered while validating a suite or component name.
#[derive(Clone, Copy, Debug, Error)]
pub enum ArchiveNameError {
    /// The name is empty or contains characters that cannot appear in a URL
    /// path segment (`/`, whitespace, control characters, ...).
    #[error("not a valid archive path segment")]
    InvalidName,
}

/// A suite name, e.g. `bookworm`, `bookworm-security`, or an arbitrary name
/// chosen for a custom-built archive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Suite(String);

impl AsRef<str> for Suite {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Suite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Suite {
    type Error = ArchiveNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        check_path_segment(value)
            .then(|| Self(value.to_owned()))
            .ok_or(ArchiveNameError::InvalidName)
    }
}

impl FromStr for Suite {
    type Err = ArchiveNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::try_from(s)
    }
}

impl PartialEq<str> for Suite {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for Suite {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(TryFromStrVisitor::new("a suite name"))
    }
}

/// A component, e.g. `main`, `contrib`, `non-free`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Component(String);

impl Component {
    /// The `main` component, the default for a minimal custom archive.
    pub fn main() -> Self {
        Self("main".to_owned())
    }
}

impl AsRef<str> for Component {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Component {
    type Error = ArchiveNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        check_path_segment(value)
            .then(|| Self(value.to_owned()))
            .ok_or(ArchiveNameError::InvalidName)
    }
}

impl FromStr for Component {
    type Err = ArchiveNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::try_from(s)
    }
}

impl PartialEq<str> for Component {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(TryFromStrVisitor::new("a component name"))
    }
}

/// Compute the pool fan-out prefix for a source package name: the first four
/// characters for `lib*` packages (so `libfoo`, `libfoo-dev` and
/// `libfoo-doc` all land under the same `libf/` directory), otherwise just
/// the first character.
pub fn pool_prefix(name: &str) -> &str {
    if name.len() >= 4 && name.starts_with("lib") {
        &name[..4]
    } else {
        &name[..1.min(name.len())]
    }
}

#[cfg(test)]
mod test {
    use super::{pool_prefix, Component, Suite};

    #[test]
    fn suite() {
        assert!(Suite::try_from("bookworm").is_ok());
        assert!(Suite::try_from("bookworm-security").is_ok());
        assert!(Suite::try_from("").is_err());
        assert!(Suite::try_from("../escape").is_err());
    }

    #[test]
    fn component() {
        assert_eq!(Component::main(), Component::try_from("main").unwrap());
        assert!(Component::try_from("non-free").is_ok());
    }

    #[test]
    fn pool_prefix_law() {
        assert_eq!(pool_prefix("hello"), "h");
        assert_eq!(pool_prefix("libfoo"), "libf");
        assert_eq!(pool_prefix("lib"), "l");
        assert_eq!(pool_prefix("libc6"), "libc");
        assert_eq!(pool_prefix("a"), "a");
    }
}

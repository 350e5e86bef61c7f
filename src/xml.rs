// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: GPL-3.0-or-later

//! # Root-package XML input
//!
//! `custom-repo` takes its root package set as an XML document: a root
//! element containing zero or more `<package version="…">name</package>`
//! children. Empty names are skipped; an absent or empty `version`
//! attribute means "any version" (`None`). A document with no root element,
//! or with no valid entries after filtering, is a fatal error.

use std::path::Path;

use anyhow::{bail, Context, Result};
use archive_core::package::PackageName;
use archive_core::resolver::PackageSpec;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Parse a root-package XML document into resolver roots.
pub fn parse_root_packages(path: &Path) -> Result<Vec<PackageSpec>> {
    let data = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_root_packages_str(&data)
}

fn parse_root_packages_str(data: &str) -> Result<Vec<PackageSpec>> {
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text = true;

    let mut specs = Vec::new();
    let mut saw_root_element = false;
    let mut in_package = false;
    let mut pending_version: Option<String> = None;

    loop {
        match reader.read_event().context("malformed root-package XML")? {
            Event::Start(tag) if tag.name().as_ref() == b"package" => {
                in_package = true;
                pending_version = tag
                    .try_get_attribute("version")
                    .ok()
                    .flatten()
                    .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
                    .filter(|v| !v.is_empty());
            }
            Event::Start(_) => {
                saw_root_element = true;
            }
            Event::Text(text) if in_package => {
                let name = text.unescape().context("invalid text content")?.trim().to_owned();
                if !name.is_empty() {
                    if let Ok(package) = PackageName::try_from(name.as_str()) {
                        specs.push(PackageSpec {
                            name: package,
                            version: pending_version.clone(),
                        });
                    }
                }
            }
            Event::End(tag) if tag.name().as_ref() == b"package" => {
                in_package = false;
                pending_version = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root_element {
        bail!("root-package XML has no root element");
    }
    if specs.is_empty() {
        bail!("root-package XML contains no valid package entries");
    }

    Ok(specs)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_packages_with_and_without_version() {
        let xml = r#"<packages><package version="2.10-2">hello</package><package>zsh</package></packages>"#;
        let specs = parse_root_packages_str(xml).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "hello");
        assert_eq!(specs[0].version.as_deref(), Some("2.10-2"));
        assert_eq!(specs[1].version, None);
    }

    #[test]
    fn empty_names_are_skipped() {
        let xml = r#"<packages><package></package><package>hello</package></packages>"#;
        let specs = parse_root_packages_str(xml).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "hello");
    }

    #[test]
    fn missing_root_element_is_fatal() {
        assert!(parse_root_packages_str("").is_err());
    }

    #[test]
    fn no_valid_entries_is_fatal() {
        let xml = r#"<packages><package></package></packages>"#;
        assert!(parse_root_packages_str(xml).is_err());
    }
}

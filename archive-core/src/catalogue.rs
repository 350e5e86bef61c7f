// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # In-memory package catalogue
//!
//! Owned by an [`crate::client::ArchiveClient`] for the lifetime of one
//! fetch cycle; the resolver and downloader only ever see borrowed,
//! read-only views of it.

use crate::architectures::Architecture;
use crate::package::{Package, PackageName, SourcePackage};
use crate::release::ReleaseFile;

/// Append-only collection of packages and source packages gathered across a
/// suite's (component, architecture) pairs, plus the `ReleaseFile` that
/// vouched for the indices they came from.
#[derive(Debug, Default)]
pub struct Catalogue {
    release: Option<ReleaseFile>,
    packages: Vec<Package>,
    sources: Vec<SourcePackage>,
}

impl Catalogue {
    /// An empty catalogue, as constructed by a freshly reset archive client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the `ReleaseFile` that authorized this fetch cycle.
    pub fn set_release(&mut self, release: ReleaseFile) {
        self.release = Some(release);
    }

    /// The `ReleaseFile` for this catalogue, if a fetch has populated it.
    pub fn release(&self) -> Option<&ReleaseFile> {
        self.release.as_ref()
    }

    /// Append packages parsed from one (component, architecture) index.
    pub fn extend_packages(&mut self, packages: impl IntoIterator<Item = Package>) {
        self.packages.extend(packages);
    }

    /// Append source packages parsed from one component's `Sources` index.
    pub fn extend_sources(&mut self, sources: impl IntoIterator<Item = SourcePackage>) {
        self.sources.extend(sources);
    }

    /// All binary packages accumulated so far.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// All source packages accumulated so far.
    pub fn sources(&self) -> &[SourcePackage] {
        &self.sources
    }

    /// Find a binary package by name, optionally pinned to a version, with
    /// ties among matching architectures broken by `arch_order` (the first
    /// architecture listed wins); when `arch_order` is empty, first match in
    /// catalogue order wins.
    pub fn find_package(&self, name: &PackageName, version: Option<&str>, arch_order: &[Architecture]) -> Option<&Package> {
        let candidates: Vec<&Package> = self
            .packages
            .iter()
            .filter(|p| &p.name == name)
            .filter(|p| version.is_none_or(|v| p.version.to_string() == v))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        for arch in arch_order {
            if let Some(found) = candidates.iter().find(|p| p.architecture == arch.as_ref()) {
                return Some(found);
            }
        }
        candidates.into_iter().next()
    }

    /// Find a source package by name, optionally pinned to a version.
    pub fn find_source(&self, name: &PackageName, version: Option<&str>) -> Option<&SourcePackage> {
        self.sources
            .iter()
            .find(|p| &p.name == name && version.is_none_or(|v| p.version.to_string() == v))
    }

    /// Look up every binary package carrying `name`, across architectures.
    pub fn packages_by_name<'a>(&'a self, name: &'a PackageName) -> impl Iterator<Item = &'a Package> {
        self.packages.iter().filter(move |p| &p.name == name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::version::PackageVersion;

    fn pkg(name: &str, version: &str, arch: &str) -> Package {
        Package {
            name: PackageName::try_from(name).unwrap(),
            version: PackageVersion::try_from(version).unwrap(),
            architecture: arch.to_owned(),
            maintainer: String::new(),
            description: String::new(),
            section: String::new(),
            priority: String::new(),
            essential: false,
            source: None,
            filename: String::new(),
            size: 0,
            md5sum: None,
            sha256: None,
            relations: Default::default(),
            extra_fields: Vec::new(),
        }
    }

    #[test]
    fn find_package_by_name_and_version() {
        let mut catalogue = Catalogue::new();
        catalogue.extend_packages([pkg("hello", "2.10-2", "amd64")]);
        let name = PackageName::try_from("hello").unwrap();
        assert!(catalogue.find_package(&name, Some("2.10-2"), &[]).is_some());
        assert!(catalogue.find_package(&name, Some("9.9-9"), &[]).is_none());
    }

    #[test]
    fn find_package_respects_architecture_preference() {
        let mut catalogue = Catalogue::new();
        catalogue.extend_packages([pkg("hello", "2.10-2", "i386"), pkg("hello", "2.10-2", "amd64")]);
        let name = PackageName::try_from("hello").unwrap();
        let amd64 = Architecture::try_from("amd64").unwrap();
        let i386 = Architecture::try_from("i386").unwrap();
        let found = catalogue.find_package(&name, None, &[amd64.clone()]).unwrap();
        assert_eq!(found.architecture, "amd64");
        let found = catalogue.find_package(&name, None, &[i386, amd64]).unwrap();
        assert_eq!(found.architecture, "i386");
    }
}

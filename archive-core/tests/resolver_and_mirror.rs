// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

use std::collections::BTreeMap;

use archive_core::archive::{Component, Suite};
use archive_core::architectures::Architecture;
use archive_core::catalogue::Catalogue;
use archive_core::mirror::{MirrorWriter, ReleaseMetadata};
use archive_core::package::{Package, PackageName, RelationKind};
use archive_core::resolver::{self, PackageSpec};
use archive_core::version::PackageVersion;
use chrono::Duration;

fn leaf_package(name: &str, deps: &[&str]) -> Package {
    let mut relations: BTreeMap<RelationKind, Vec<String>> = BTreeMap::new();
    if !deps.is_empty() {
        relations.insert(RelationKind::Depends, deps.iter().map(|s| s.to_string()).collect());
    }
    Package {
        name: PackageName::try_from(name).unwrap(),
        version: PackageVersion::try_from("1.0").unwrap(),
        architecture: "amd64".to_owned(),
        maintainer: String::new(),
        description: String::new(),
        section: String::new(),
        priority: String::new(),
        essential: false,
        source: None,
        filename: String::new(),
        size: 1,
        md5sum: None,
        sha256: None,
        relations,
        extra_fields: Vec::new(),
    }
}

/// S1-style scenario: a single root with no surviving dependencies (all
/// relation kinds excluded) resolves to exactly itself, and the resolved
/// set writes out to a well-formed, unsigned `dists/` tree.
#[test]
fn single_root_no_deps_produces_a_minimal_unsigned_archive() {
    let mut catalogue = Catalogue::new();
    catalogue.extend_packages([leaf_package("hello", &["libc6 (>= 2.34)"])]);

    let roots = vec![PackageSpec::unpinned(PackageName::try_from("hello").unwrap())];
    let excluded = [
        RelationKind::Depends,
        RelationKind::PreDepends,
        RelationKind::Recommends,
        RelationKind::Suggests,
        RelationKind::Enhances,
    ];
    let resolved = resolver::resolve(&catalogue, roots, &excluded).unwrap();

    assert_eq!(resolved.len(), 1);
    assert!(resolved.contains_key("hello"));

    let dir = tempfile::tempdir().unwrap();
    let writer = MirrorWriter::new(dir.path(), Suite::try_from("bookworm").unwrap());
    let component = Component::try_from("main").unwrap();
    let arch = Architecture::try_from("amd64").unwrap();
    let packages: Vec<_> = resolved.into_values().collect();
    let mut entries = BTreeMap::new();
    for (path, size, sha256, md5) in writer.write_packages(&component, &arch, &packages).unwrap() {
        entries.insert(path, (size, sha256, md5));
    }

    let metadata = ReleaseMetadata {
        origin: "Example".to_owned(),
        label: "Example".to_owned(),
        description: "custom subset".to_owned(),
        validity: Duration::days(7),
    };
    writer
        .write_release(&metadata, "bookworm", std::slice::from_ref(&arch), std::slice::from_ref(&component), &entries, None)
        .unwrap();

    assert!(dir.path().join("dists/bookworm/main/binary-amd64/Packages").exists());
    assert!(dir.path().join("dists/bookworm/main/binary-amd64/Packages.gz").exists());
    assert!(dir.path().join("dists/bookworm/main/binary-amd64/Packages.xz").exists());

    let release = std::fs::read(dir.path().join("dists/bookworm/Release")).unwrap();
    let inrelease = std::fs::read(dir.path().join("dists/bookworm/InRelease")).unwrap();
    assert_eq!(release, inrelease, "unsigned InRelease must equal Release byte-for-byte");
    assert!(!dir.path().join("dists/bookworm/Release.gpg").exists());
}

/// Resolver monotonicity (testable property 4): widening the exclusion set
/// never grows the resolved set.
#[test]
fn excluding_more_kinds_never_grows_the_resolved_set() {
    let mut catalogue = Catalogue::new();
    catalogue.extend_packages([
        leaf_package("foo", &["bar"]),
        leaf_package("bar", &[]),
    ]);

    let roots = || vec![PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];

    let narrow = resolver::resolve(&catalogue, roots(), &[]).unwrap();
    let wide = resolver::resolve(&catalogue, roots(), &[RelationKind::Depends]).unwrap();

    assert!(wide.len() <= narrow.len());
    assert!(narrow.contains_key("bar"));
    assert!(!wide.contains_key("bar"));
}

/// S6: dependency version constraints are recorded but never enforced
/// during resolution (see DESIGN.md open-question decision 1).
#[test]
fn resolver_ignores_version_constraints_in_dependency_expressions() {
    let mut catalogue = Catalogue::new();
    catalogue.extend_packages([leaf_package("foo", &["bar (>= 9.9)"]), leaf_package("bar", &[])]);

    let roots = vec![PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
    let resolved = resolver::resolve(&catalogue, roots, &[]).unwrap();

    let bar = resolved.get("bar").expect("bar should resolve despite unmet version constraint");
    assert_eq!(bar.version.to_string(), "1.0");
}

// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Dependency closure resolver
//!
//! Breadth-first over a [`Catalogue`], matching dependency expressions by
//! leading package name only: version constraints inside a dependency
//! expression are never evaluated (documented open question, see
//! `SPEC_FULL.md` §9.1).

use std::collections::{HashMap, VecDeque};

use crate::catalogue::Catalogue;
use crate::error::{ArchiveError, Result};
use crate::package::{Package, PackageName, RelationKind};

/// A resolver root: a package name, optionally pinned to an exact version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    /// Package name to resolve
    pub name: PackageName,
    /// Exact version required, if any
    pub version: Option<String>,
}

impl PackageSpec {
    /// A spec with no version pin.
    pub fn unpinned(name: PackageName) -> Self {
        Self { name, version: None }
    }
}

/// Extract the leading identifier of a dependency expression: everything
/// up to the first space, `(`, or `<`.
fn leading_identifier(expression: &str) -> &str {
    let end = expression
        .find([' ', '(', '<'])
        .unwrap_or(expression.len());
    expression[..end].trim()
}

/// Pick the first alternative (`|`-separated) whose leading identifier is
/// present in the catalogue.
fn select_alternative<'a>(expression: &'a str, catalogue: &Catalogue) -> Option<&'a str> {
    for alt in expression.split('|') {
        let name = leading_identifier(alt);
        if name.is_empty() {
            continue;
        }
        if let Ok(pkg_name) = PackageName::try_from(name) {
            if catalogue.packages_by_name(&pkg_name).next().is_some() {
                return Some(name);
            }
        }
    }
    None
}

/// Resolve the transitive dependency closure of `roots`, following every
/// relation kind in [`RelationKind::CLOSURE_KINDS`] except those named in
/// `excluded`.
pub fn resolve(
    catalogue: &Catalogue,
    roots: impl IntoIterator<Item = PackageSpec>,
    excluded: &[RelationKind],
) -> Result<HashMap<String, Package>> {
    let mut visited: HashMap<String, Package> = HashMap::new();
    let mut queue: VecDeque<PackageSpec> = roots.into_iter().collect();
    let mut seen_names = std::collections::HashSet::new();

    while let Some(spec) = queue.pop_front() {
        let key = spec.name.as_ref().to_owned();
        if !seen_names.insert(key.clone()) {
            continue;
        }

        let package = catalogue
            .packages_by_name(&spec.name)
            .next()
            .ok_or_else(|| ArchiveError::PackageMissing(spec.name.as_ref().to_owned()))?;

        if let Some(expected) = &spec.version {
            let found = package.version.to_string();
            if &found != expected {
                return Err(ArchiveError::VersionMismatch {
                    name: key,
                    requested: expected.clone(),
                    found,
                });
            }
        }

        for kind in RelationKind::CLOSURE_KINDS {
            if excluded.contains(&kind) {
                continue;
            }
            for expression in package.relation(kind) {
                let Some(name) = select_alternative(expression, catalogue) else {
                    return Err(ArchiveError::DependencyMissing(leading_identifier(expression).to_owned()));
                };
                if let Ok(pkg_name) = PackageName::try_from(name) {
                    if !seen_names.contains(pkg_name.as_ref()) {
                        queue.push_back(PackageSpec::unpinned(pkg_name));
                    }
                }
            }
        }

        visited.insert(key, package.clone());
    }

    Ok(visited)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::version::PackageVersion;

    fn pkg(name: &str, depends: &[&str], recommends: &[&str]) -> Package {
        let mut relations = std::collections::BTreeMap::new();
        if !depends.is_empty() {
            relations.insert(RelationKind::Depends, depends.iter().map(|s| s.to_string()).collect());
        }
        if !recommends.is_empty() {
            relations.insert(RelationKind::Recommends, recommends.iter().map(|s| s.to_string()).collect());
        }
        Package {
            name: PackageName::try_from(name).unwrap(),
            version: PackageVersion::try_from("1.0-1").unwrap(),
            architecture: "amd64".to_owned(),
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
            relations,
            extra_fields: Vec::new(),
        }
    }

    fn catalogue_with(packages: Vec<Package>) -> Catalogue {
        let mut catalogue = Catalogue::new();
        catalogue.extend_packages(packages);
        catalogue
    }

    #[test]
    fn follows_depends_transitively() {
        let catalogue = catalogue_with(vec![
            pkg("foo", &["bar"], &[]),
            pkg("bar", &["baz"], &[]),
            pkg("baz", &[], &[]),
        ]);
        let roots = [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
        let result = resolve(&catalogue, roots, &[]).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.contains_key("baz"));
    }

    #[test]
    fn excluding_recommends_shrinks_the_closure() {
        let catalogue = catalogue_with(vec![pkg("foo", &[], &["bar"]), pkg("bar", &[], &[])]);
        let roots = [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];

        let with_recommends = resolve(&catalogue, roots.clone(), &[]).unwrap();
        assert_eq!(with_recommends.len(), 2);

        let without_recommends = resolve(&catalogue, roots, &[RelationKind::Recommends]).unwrap();
        assert_eq!(without_recommends.len(), 1);
    }

    #[test]
    fn resolver_monotonicity() {
        let catalogue = catalogue_with(vec![
            pkg("foo", &["bar"], &["baz"]),
            pkg("bar", &[], &[]),
            pkg("baz", &[], &[]),
        ]);
        let roots = || [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
        let full = resolve(&catalogue, roots(), &[]).unwrap().len();
        let excluded = resolve(&catalogue, roots(), &[RelationKind::Recommends]).unwrap().len();
        assert!(excluded <= full);
    }

    #[test]
    fn picks_first_available_alternative() {
        let catalogue = catalogue_with(vec![pkg("foo", &["missing | bar (>= 1.0)"], &[]), pkg("bar", &[], &[])]);
        let roots = [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
        let result = resolve(&catalogue, roots, &[]).unwrap();
        assert!(result.contains_key("bar"));
    }

    #[test]
    fn version_constraints_in_expressions_are_ignored() {
        let catalogue = catalogue_with(vec![pkg("foo", &["bar (>= 9.9)"], &[]), pkg("bar", &[], &[])]);
        let roots = [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
        let result = resolve(&catalogue, roots, &[]).unwrap();
        assert!(result.contains_key("bar"));
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let catalogue = catalogue_with(vec![pkg("foo", &["bar"], &[])]);
        let roots = [PackageSpec::unpinned(PackageName::try_from("foo").unwrap())];
        let err = resolve(&catalogue, roots, &[]).unwrap_err();
        assert!(matches!(err, ArchiveError::DependencyMissing(name) if name == "bar"));
    }
}

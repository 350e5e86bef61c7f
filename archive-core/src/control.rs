// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Streaming control-paragraph scanner
//!
//! `Packages` and `Sources` indices are sequences of RFC822-like
//! paragraphs separated by blank lines; [`rfc822_like`] (used by
//! [`crate::release`] and upstream `.buildinfo` parsing) expects a single
//! struct per document, which does not fit an index of thousands of
//! paragraphs of unknown fields. This scanner reads one paragraph at a
//! time, preserving every field's canonical (as-written) spelling, so a
//! caller that only recognizes a handful of fields does not silently drop
//! the rest.

use std::io::BufRead;

use crate::package::{Package, PackageName, RelationKind, SourceFile, SourceFileKind, SourcePackage};
use crate::version::PackageVersion;

/// One field of a control paragraph: canonical name as written in the
/// source, and value with continuation lines joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    /// Field name exactly as it appeared in the source (e.g. `Pre-Depends`)
    pub name: String,
    /// Field value, continuation lines joined with `\n` and their leading
    /// single space stripped
    pub value: String,
}

/// A single control paragraph: an ordered list of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParagraph {
    fields: Vec<RawField>,
}

impl RawParagraph {
    /// Look up a field by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// Iterate over the fields in source order.
    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }

    /// True if this paragraph carries no fields (blank-line runs collapse
    /// to nothing, never an empty paragraph).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Scans a stream of control paragraphs out of any [`BufRead`].
///
/// Lines that are neither a `Key: value` header nor a continuation of the
/// previous field (i.e. do not start with whitespace) are skipped rather
/// than treated as a parse error, since real-world archives occasionally
/// carry stray blank-ish or malformed lines.
pub struct ParagraphReader<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> ParagraphReader<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = self.line.trim_end_matches(['\n', '\r']).to_string();
        Ok(Some(trimmed))
    }

    /// Read the next paragraph, or `None` at end of stream.
    pub fn next_paragraph(&mut self) -> std::io::Result<Option<RawParagraph>> {
        if self.done {
            return Ok(None);
        }

        let mut paragraph = RawParagraph::default();
        loop {
            let Some(line) = self.read_line()? else {
                self.done = true;
                break;
            };

            if line.trim().is_empty() {
                if paragraph.is_empty() {
                    continue;
                }
                break;
            }

            if let Some(first) = line.chars().next() {
                if first.is_whitespace() {
                    if let Some(last) = paragraph.fields.last_mut() {
                        let continuation = line.trim_start();
                        if continuation == "." {
                            last.value.push('\n');
                        } else {
                            last.value.push('\n');
                            last.value.push_str(continuation);
                        }
                    }
                    continue;
                }
            }

            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            paragraph.fields.push(RawField {
                name: name.trim().to_owned(),
                value: value.trim().to_owned(),
            });
        }

        if paragraph.is_empty() {
            Ok(None)
        } else {
            Ok(Some(paragraph))
        }
    }
}

impl<R: BufRead> Iterator for ParagraphReader<R> {
    type Item = std::io::Result<RawParagraph>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_paragraph().transpose()
    }
}

fn split_relation_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse a binary package record out of a paragraph. Returns `None` if the
/// paragraph carries no `Package:` field (e.g. it is a `Sources`
/// paragraph encountered while scanning a `Packages` file).
pub fn parse_package(paragraph: &RawParagraph) -> Option<Package> {
    let name = PackageName::try_from(paragraph.get("Package")?).ok()?;
    let version = PackageVersion::try_from(paragraph.get("Version")?).ok()?;

    let known_fields = [
        "Package",
        "Version",
        "Architecture",
        "Maintainer",
        "Description",
        "Section",
        "Priority",
        "Essential",
        "Source",
        "Filename",
        "Size",
        "MD5sum",
        "SHA256",
        RelationKind::Depends.field_name(),
        RelationKind::PreDepends.field_name(),
        RelationKind::Recommends.field_name(),
        RelationKind::Suggests.field_name(),
        RelationKind::Enhances.field_name(),
        RelationKind::Breaks.field_name(),
        RelationKind::Conflicts.field_name(),
        RelationKind::Provides.field_name(),
        RelationKind::Replaces.field_name(),
    ];

    let mut relations = std::collections::BTreeMap::new();
    for field in paragraph.fields() {
        if let Some(kind) = RelationKind::from_field_name(&field.name) {
            relations.insert(kind, split_relation_list(&field.value));
        }
    }

    let extra_fields = paragraph
        .fields()
        .iter()
        .filter(|f| !known_fields.iter().any(|k| f.name.eq_ignore_ascii_case(k)))
        .map(|f| (f.name.clone(), f.value.clone()))
        .collect();

    Some(Package {
        name,
        version,
        architecture: paragraph.get("Architecture").unwrap_or_default().to_owned(),
        maintainer: paragraph.get("Maintainer").unwrap_or_default().to_owned(),
        description: paragraph
            .get("Description")
            .and_then(|d| d.lines().next())
            .unwrap_or_default()
            .to_owned(),
        section: paragraph.get("Section").unwrap_or_default().to_owned(),
        priority: paragraph.get("Priority").unwrap_or_default().to_owned(),
        essential: paragraph.get("Essential").is_some_and(|v| v.eq_ignore_ascii_case("yes")),
        source: paragraph.get("Source").map(|s| {
            // `Source: foo (1.0-1)` names a source version that may differ
            // from the binary's; only the name matters for pool placement.
            s.split_whitespace().next().unwrap_or(s).to_owned()
        }),
        filename: paragraph.get("Filename").unwrap_or_default().to_owned(),
        size: paragraph.get("Size").and_then(|s| s.parse().ok()).unwrap_or(0),
        md5sum: paragraph.get("MD5sum").map(str::to_owned),
        sha256: paragraph.get("SHA256").map(str::to_owned),
        relations,
        extra_fields,
    })
}

fn parse_files_section(value: &str) -> Vec<(String, u64, String)> {
    value
        .lines()
        .filter_map(|line| {
            let fields: Vec<_> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return None;
            }
            let size = fields[1].parse().ok()?;
            Some((fields[0].to_owned(), size, fields[2].to_owned()))
        })
        .collect()
}

/// Parse a source package record out of a paragraph. Returns `None` if the
/// paragraph carries no `Package:` field (`Sources` indices name the source
/// package with the same `Package:` field as a `Packages` index).
pub fn parse_source_package(paragraph: &RawParagraph, base_url: &str) -> Option<SourcePackage> {
    let name = PackageName::try_from(paragraph.get("Package")?).ok()?;
    let version = PackageVersion::try_from(paragraph.get("Version")?).ok()?;
    let directory = paragraph.get("Directory").unwrap_or_default().to_owned();

    let md5_entries = paragraph.get("Files").map(parse_files_section).unwrap_or_default();
    let sha256_entries = paragraph
        .get("Checksums-Sha256")
        .map(parse_files_section)
        .unwrap_or_default();

    let mut files: Vec<SourceFile> = Vec::new();
    for (hash, size, filename) in &md5_entries {
        files.push(SourceFile {
            kind: SourceFileKind::infer(filename),
            name: filename.clone(),
            url: format!("{}/{}/{}", base_url.trim_end_matches('/'), directory, filename),
            size: *size,
            md5sum: Some(hash.clone()),
            sha256: None,
        });
    }
    for (hash, size, filename) in &sha256_entries {
        if let Some(existing) = files.iter_mut().find(|f| &f.name == filename) {
            existing.sha256 = Some(hash.clone());
        } else {
            files.push(SourceFile {
                kind: SourceFileKind::infer(filename),
                name: filename.clone(),
                url: format!("{}/{}/{}", base_url.trim_end_matches('/'), directory, filename),
                size: *size,
                md5sum: None,
                sha256: Some(hash.clone()),
            });
        }
    }

    Some(SourcePackage {
        name,
        version,
        maintainer: paragraph.get("Maintainer").unwrap_or_default().to_owned(),
        directory,
        files,
    })
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn scans_multiple_paragraphs() {
        let data = "Package: hello\nVersion: 2.10-2\n\nPackage: zsh\nVersion: 5.9-4\n";
        let mut reader = ParagraphReader::new(Cursor::new(data));
        let first = reader.next_paragraph().unwrap().unwrap();
        assert_eq!(first.get("Package"), Some("hello"));
        let second = reader.next_paragraph().unwrap().unwrap();
        assert_eq!(second.get("Package"), Some("zsh"));
        assert!(reader.next_paragraph().unwrap().is_none());
    }

    #[test]
    fn continuation_lines_join_with_newline() {
        let data = "Package: hello\nVersion: 2.10-2\nDescription: short\n long description\n .\n more.\n";
        let mut reader = ParagraphReader::new(Cursor::new(data));
        let paragraph = reader.next_paragraph().unwrap().unwrap();
        assert_eq!(paragraph.get("Description"), Some("short\nlong description\n\nmore."));
    }

    #[test]
    fn skips_malformed_lines() {
        let data = "this is not a field\nPackage: hello\nVersion: 2.10-2\n";
        let mut reader = ParagraphReader::new(Cursor::new(data));
        let paragraph = reader.next_paragraph().unwrap().unwrap();
        assert_eq!(paragraph.get("Package"), Some("hello"));
    }

    #[test]
    fn parses_package_with_relations_and_extra_fields() {
        let data = "Package: hello\nVersion: 2.10-2\nArchitecture: amd64\nDepends: libc6 (>= 2.34), libgcc-s1\nX-Cargo-Built-Using: foo\n";
        let mut reader = ParagraphReader::new(Cursor::new(data));
        let paragraph = reader.next_paragraph().unwrap().unwrap();
        let package = parse_package(&paragraph).unwrap();
        assert_eq!(package.name, "hello");
        assert_eq!(package.relation(RelationKind::Depends), &["libc6 (>= 2.34)", "libgcc-s1"]);
        assert_eq!(package.source_name(), "hello");
        assert_eq!(package.extra_fields, vec![("X-Cargo-Built-Using".to_owned(), "foo".to_owned())]);
    }

    #[test]
    fn parses_source_package_files() {
        let data = "Package: hello\nVersion: 2.10-2\nDirectory: pool/main/h/hello\nFiles:\n 9e1 100 hello_2.10-2.dsc\nChecksums-Sha256:\n abcd 100 hello_2.10-2.dsc\n";
        let mut reader = ParagraphReader::new(Cursor::new(data));
        let paragraph = reader.next_paragraph().unwrap().unwrap();
        let source = parse_source_package(&paragraph, "http://example.org").unwrap();
        let file = source.file("hello_2.10-2.dsc").unwrap();
        assert_eq!(file.md5sum.as_deref(), Some("9e1"));
        assert_eq!(file.sha256.as_deref(), Some("abcd"));
        assert_eq!(file.url, "http://example.org/pool/main/h/hello/hello_2.10-2.dsc");
    }
}

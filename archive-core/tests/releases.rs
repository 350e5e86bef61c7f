// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

use archive_core::release;

const RELEASE: &str = r#"Origin: Debian
Label: Debian
Suite: unstable
Codename: sid
Version: 13.0
Date: Sun, 17 Dec 2023 18:43:37 UTC
Valid-Until: Sun, 24 Dec 2023 18:43:37 UTC
Acquire-By-Hash: yes
Architectures: amd64 arm64
Components: main contrib
Description: Debian x.y Unstable
MD5Sum:
 628a4efab35e598c7b6debdb0ac85314 26187 main/binary-amd64/Packages
SHA256:
 efe2dafdf6a50f376af1dfc574d6bd3360558fde917555671b13832c89604d9f 26187 main/binary-amd64/Packages
 3637559f78ac17d0e55bce465d510ef912d539e4b810a66b32431dd76f5929d8 193 main/source/Release"#;

#[test]
fn parses_a_full_release_file() {
    let archive = release::from_str(RELEASE).expect("Release file parses correctly.");

    assert_eq!(archive.origin, "Debian");
    assert_eq!(archive.codename, "sid");
    assert_eq!(archive.version.as_deref(), Some("13.0"));
    assert!(archive.valid_until.is_some());
    assert!(!archive.architectures.is_empty());
    assert!(!archive.components.is_empty());
    assert!(archive.has_entry("main/binary-amd64/Packages"));
    assert!(!archive.has_entry("main/binary-amd64/Packages.gz"));
}

#[test]
fn best_digest_prefers_sha256_over_md5() {
    let archive = release::from_str(RELEASE).unwrap();
    let (kind, hex, size) = archive.best_digest("main/binary-amd64/Packages").unwrap();

    assert_eq!(kind, archive_core::error::DigestKind::Sha256);
    assert_eq!(size, 26187);
    assert_eq!(hex.len(), 64);
}

#[test]
fn rejects_truncated_release_files() {
    let truncated = "Origin: Debian\nLabel: Debian\n";
    assert!(release::from_str(truncated).is_err());
}

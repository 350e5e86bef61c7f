// Copyright 2025 Sebastian Ramacher
// SPDX-License-Identifier: LGPL-3.0-or-later

//! # OpenPGP signature verification and signing
//!
//! Verification accepts either an `InRelease`-style clearsigned message or a
//! `Release`/`Release.gpg` detached pair, checked against a keyring loaded
//! from one or more files. A keyring directory is expanded to every `*.gpg`
//! file it directly contains.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sequoia_openpgp::cert::CertParser;
use sequoia_openpgp::packet::Signature;
use sequoia_openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper, VerifierBuilder,
};
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::policy::StandardPolicy;
use sequoia_openpgp::serialize::stream::{Armorer, Message, Signer as StreamSigner};
use sequoia_openpgp::{Cert, Fingerprint, KeyHandle};

use crate::error::{ArchiveError, Result};

/// A verified `(signing certificate, signature packet)` pair.
pub type Signatures = Vec<(Cert, Signature)>;

/// Loads a keyring (one or more certificate files, or a directory of
/// `*.gpg` files) and verifies clearsigned/detached messages against it.
pub struct KeyRing {
    keys: HashMap<Fingerprint, Cert>,
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing").field("keys", &self.keys.len()).finish()
    }
}

impl KeyRing {
    /// Build an empty keyring. [`KeyRing::verify`] will then fail closed
    /// with [`ArchiveError::NoTrustRoot`] for any message.
    pub fn empty() -> Self {
        Self { keys: HashMap::new() }
    }

    /// Load certificates from the given paths, expanding any directory to
    /// the `*.gpg` files directly inside it.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let mut keys = HashMap::new();
        for path in paths {
            let files = if path.is_dir() {
                std::fs::read_dir(path)?
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("gpg"))
                    .collect::<Vec<_>>()
            } else {
                vec![path.clone()]
            };

            for file in files {
                for cert in CertParser::from_file(&file)
                    .map_err(|e| ArchiveError::ConfigInvalid(format!("failed to read keyring {}: {e}", file.display())))?
                {
                    let cert = cert.map_err(|e| {
                        ArchiveError::ConfigInvalid(format!("malformed certificate in {}: {e}", file.display()))
                    })?;
                    keys.insert(cert.fingerprint(), cert.clone());
                    for key in cert.keys() {
                        keys.insert(key.key().fingerprint(), cert.clone());
                    }
                }
            }
        }
        Ok(Self { keys })
    }

    /// Number of distinct fingerprints known to this keyring (subkeys
    /// included).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether this keyring has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn helper(&self) -> Helper<'_> {
        Helper {
            keyring: self,
            results: Vec::new(),
        }
    }

    /// Verify a clearsigned message (e.g. `InRelease`), returning the
    /// signatures that validated and the recovered plaintext.
    pub fn verify_clearsigned(&self, message: &[u8]) -> Result<(Signatures, Vec<u8>)> {
        if self.is_empty() {
            return Err(ArchiveError::NoTrustRoot);
        }

        let policy = StandardPolicy::new();
        let mut helper = self.helper();
        let mut verifier = VerifierBuilder::from_bytes(message)
            .map_err(|_| ArchiveError::SignatureInvalid)?
            .with_policy(&policy, None, &mut helper)
            .map_err(|_| ArchiveError::SignatureInvalid)?;

        let mut content = Vec::new();
        verifier.read_to_end(&mut content).map_err(|_| ArchiveError::SignatureInvalid)?;
        drop(verifier);

        if helper.results.is_empty() {
            return Err(ArchiveError::SignatureInvalid);
        }
        Ok((helper.results, content))
    }

    /// Verify a detached signature (`Release.gpg`) against the signed
    /// content (`Release`).
    pub fn verify_detached(&self, signature: &[u8], content: &[u8]) -> Result<Signatures> {
        if self.is_empty() {
            return Err(ArchiveError::NoTrustRoot);
        }

        let policy = StandardPolicy::new();
        let mut helper = self.helper();
        let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
            .map_err(|_| ArchiveError::SignatureInvalid)?
            .with_policy(&policy, None, &mut helper)
            .map_err(|_| ArchiveError::SignatureInvalid)?;

        verifier
            .verify_bytes(content)
            .map_err(|_| ArchiveError::SignatureInvalid)?;

        if helper.results.is_empty() {
            return Err(ArchiveError::SignatureInvalid);
        }
        Ok(helper.results)
    }
}

struct Helper<'a> {
    keyring: &'a KeyRing,
    results: Signatures,
}

impl VerificationHelper for &mut Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> sequoia_openpgp::Result<Vec<Cert>> {
        Ok(self.keyring.keys.values().cloned().collect())
    }

    fn check(&mut self, structure: MessageStructure) -> sequoia_openpgp::Result<()> {
        for layer in structure.into_iter() {
            let MessageLayer::SignatureGroup { results } = layer else {
                continue;
            };
            for result in results {
                let Ok(result) = result else { continue };
                let signature = result.sig.clone();
                for fingerprint in signature.issuer_fingerprints() {
                    if let Some(signer) = self.keyring.keys.get(fingerprint) {
                        self.results.push((signer.clone(), signature.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Produce a detached, ASCII-armored signature over `content` using the
/// given secret-key certificate.
pub fn sign_detached(cert: &Cert, passphrase: Option<&str>, content: &[u8]) -> Result<Vec<u8>> {
    let keypair = signing_keypair(cert, passphrase)?;

    let mut output = Vec::new();
    {
        let message = Message::new(&mut output);
        let message = Armorer::new(message)
            .build()
            .map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
        let mut signer = StreamSigner::new(message, keypair)
            .detached()
            .build()
            .map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
        signer.write_all(content).map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
        signer.finalize().map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
    }
    Ok(output)
}

/// Produce a clearsigned message wrapping `content`.
pub fn sign_clearsigned(cert: &Cert, passphrase: Option<&str>, content: &[u8]) -> Result<Vec<u8>> {
    let keypair = signing_keypair(cert, passphrase)?;

    let mut output = Vec::new();
    {
        let message = Message::new(&mut output);
        let mut signer = StreamSigner::new(message, keypair)
            .cleartext()
            .build()
            .map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
        signer.write_all(content).map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
        signer.finalize().map_err(|e| ArchiveError::SigningFailure(e.to_string()))?;
    }
    Ok(output)
}

fn signing_keypair(cert: &Cert, passphrase: Option<&str>) -> Result<sequoia_openpgp::crypto::KeyPair> {
    use sequoia_openpgp::crypto::Password;

    let policy = StandardPolicy::new();
    let key = cert
        .keys()
        .with_policy(&policy, None)
        .alive()
        .revoked(false)
        .for_signing()
        .secret()
        .next()
        .ok_or_else(|| ArchiveError::SigningFailure("no usable signing-capable secret key in certificate".into()))?
        .key()
        .clone();

    let unencrypted = if key.has_secret() {
        let secret = key.secret();
        if let Some(passphrase) = passphrase {
            secret
                .clone()
                .decrypt_in_place(&policy, &Password::from(passphrase))
                .map_err(|e| ArchiveError::SigningFailure(format!("failed to decrypt secret key: {e}")))?;
        }
        key
    } else {
        return Err(ArchiveError::SigningFailure("certificate carries no secret key material".into()));
    };

    unencrypted
        .into_keypair()
        .map_err(|e| ArchiveError::SigningFailure(format!("failed to build signing keypair: {e}")))
}

/// Load a single certificate (public or secret) from an armored file.
pub fn load_cert(path: &Path) -> Result<Cert> {
    Cert::from_file(path).map_err(|e| ArchiveError::ConfigInvalid(format!("failed to read certificate {}: {e}", path.display())))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_keyring_fails_closed_on_clearsigned() {
        let keyring = KeyRing::empty();
        let err = keyring.verify_clearsigned(b"anything").unwrap_err();
        assert!(matches!(err, ArchiveError::NoTrustRoot));
    }

    #[test]
    fn empty_keyring_fails_closed_on_detached() {
        let keyring = KeyRing::empty();
        let err = keyring.verify_detached(b"sig", b"content").unwrap_err();
        assert!(matches!(err, ArchiveError::NoTrustRoot));
    }
}

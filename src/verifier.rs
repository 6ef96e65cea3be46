//! Signature verification seam (C5's cryptographic primitives, §4.4.1).
//!
//! Grounded on the teacher's `Hasher`/`sha2` pairing in `platform/mod.rs`'s
//! `sha` submodule: a `Verifier` is handed raw bytes and a signature type
//! tag and never needs to know about `Name`, the PIT, or the key cache —
//! those live in `verify_flow.rs`.

use crate::codec::SignatureType;
use crate::hash::sha256;

/// An opaque, owned key blob tagged with the algorithm it was parsed for.
/// `DigestSha256` never carries real key material (see
/// [`DigestSha256Verifier::parse_key`]); other signature types carry
/// whatever bytes the host's `Verifier` implementation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub signature_type: SignatureType,
    pub bytes: Vec<u8>,
}

pub trait Verifier {
    fn parse_key(&self, signature_type: SignatureType, bytes: &[u8]) -> Option<PublicKey>;
    fn verify(&self, key: &PublicKey, signed_bytes: &[u8], signature: &[u8]) -> bool;

    /// Produces a signature over `signed_bytes` under whatever algorithm
    /// this verifier signs with (used only for self-registration's signed
    /// `ForwardingEntry` envelope, §4.7.2 — the Face never verifies its own
    /// signature, it just needs to produce one a forwarder will accept).
    fn sign(&self, signed_bytes: &[u8]) -> Vec<u8>;

    fn signature_type(&self) -> SignatureType;
}

/// The only verifier this crate ships a full implementation for: digest
/// signatures need no real asymmetric key, only a comparison of SHA-256
/// digests (the historical source's `DigestSha256` path). RSA/ECDSA/Ed25519
/// verification is represented by [`SignatureType::Other`] / the named
/// non-digest variants; a host crate supplies its own `Verifier` for those,
/// and this default verifier reports a verification failure for them rather
/// than panicking (§7: "verifier failures become `ContentBad`").
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestSha256Verifier;

impl Verifier for DigestSha256Verifier {
    fn parse_key(&self, signature_type: SignatureType, _bytes: &[u8]) -> Option<PublicKey> {
        match signature_type {
            SignatureType::DigestSha256 => {
                Some(PublicKey { signature_type, bytes: Vec::new() })
            }
            _ => None,
        }
    }

    fn verify(&self, key: &PublicKey, signed_bytes: &[u8], signature: &[u8]) -> bool {
        match key.signature_type {
            SignatureType::DigestSha256 => sha256(signed_bytes).as_slice() == signature,
            _ => false,
        }
    }

    fn sign(&self, signed_bytes: &[u8]) -> Vec<u8> {
        sha256(signed_bytes).to_vec()
    }

    fn signature_type(&self) -> SignatureType {
        SignatureType::DigestSha256
    }
}

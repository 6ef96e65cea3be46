//! Verifier orchestration (C5, §4.4): decides, for one inbound Data, what
//! outcome to deliver — or that a key must be fetched first.
//!
//! Deliberately kept as a pure function of `(verify_enabled, Data, Verifier,
//! KeyCache)` rather than something that itself calls back into
//! `Face::express_interest`: the actual re-entrant nested-Interest dance
//! (§9, "defer through the event loop") needs the Face's PIT and transport,
//! so `face.rs` drives the loop this module only decides the branch of.

use crate::codec::{Data, KeyLocator};
use crate::keycache::KeyCache;
use crate::name::Name;
use crate::pit::DataOutcome;
use crate::verifier::{PublicKey, Verifier};

/// What the Face must do next for one inbound Data, per §4.4's algorithm.
pub enum VerifyDecision {
    /// The outcome is already known; deliver it to the original sink.
    Immediate(DataOutcome),
    /// The key locator names a key this Face hasn't cached. The Face must
    /// express an Interest for `key_name_prefix` and resume verification
    /// with [`finish_after_key_fetch`] once (if) the key Data arrives.
    NeedKey { key_name_prefix: Name },
}

/// The number of key-name components used as the nested Interest's target,
/// per §4.4's "first four components" rule.
const KEY_NAME_PREFIX_COMPONENTS: usize = 4;

pub fn decide(
    verify_enabled: bool,
    data: &Data,
    verifier: &dyn Verifier,
    key_cache: &KeyCache,
) -> VerifyDecision {
    if !verify_enabled {
        return VerifyDecision::Immediate(DataOutcome::ContentUnverified);
    }

    if data.witness.is_some() {
        // A witness (e.g. a Merkle hash tree witness for a batch-signed
        // block) has no verifier hook in this implementation; reject
        // before ever looking at the key locator (§4.4/§9).
        return VerifyDecision::Immediate(DataOutcome::ContentBad);
    }

    match &data.signed_info.key_locator {
        None => VerifyDecision::Immediate(DataOutcome::ContentBad),
        Some(KeyLocator::KeyName(key_name)) => {
            if key_name.is_prefix_of(&data.name) {
                // Self-referential: the signing key travels inline in the
                // content (e.g. a KEY Data object signing itself).
                VerifyDecision::Immediate(verify_with_key_bytes(data, &data.content, verifier))
            } else if let Some(key) = key_cache.lookup(key_name) {
                VerifyDecision::Immediate(verify_with_key(data, key, verifier))
            } else {
                let prefix_len = key_name.components_count().min(KEY_NAME_PREFIX_COMPONENTS);
                VerifyDecision::NeedKey { key_name_prefix: key_name.get_prefix(prefix_len) }
            }
        }
        Some(KeyLocator::Key(bytes)) => {
            // §9's "likely bug" fix: the historical source delivers
            // `Content` here unconditionally. This implementation checks
            // the verification result like every other locator kind.
            VerifyDecision::Immediate(verify_with_key_bytes(data, bytes, verifier))
        }
        Some(KeyLocator::Cert(_)) => {
            // Certificate chain verification is an open extension point
            // (DESIGN.md); no `Verifier::verify_cert` hook exists yet.
            VerifyDecision::Immediate(DataOutcome::ContentBad)
        }
    }
}

fn verify_with_key_bytes(data: &Data, key_bytes: &[u8], verifier: &dyn Verifier) -> DataOutcome {
    match verifier.parse_key(data.signature_type, key_bytes) {
        Some(key) => verify_with_key(data, &key, verifier),
        None => DataOutcome::ContentBad,
    }
}

fn verify_with_key(data: &Data, key: &PublicKey, verifier: &dyn Verifier) -> DataOutcome {
    if verifier.verify(key, &data.signed_portion(), &data.signature) {
        DataOutcome::Content
    } else {
        DataOutcome::ContentBad
    }
}

/// Resumes verification of `original` once a nested key-fetch Interest
/// (issued for a `NeedKey` decision) has been answered by `key_data`. On
/// success, also returns the parsed key for the Face to insert into its key
/// cache (§4.6).
pub fn finish_after_key_fetch(
    original: &Data,
    key_data: &Data,
    verifier: &dyn Verifier,
) -> (DataOutcome, Option<PublicKey>) {
    match verifier.parse_key(original.signature_type, &key_data.content) {
        Some(key) => {
            if verifier.verify(&key, &original.signed_portion(), &original.signature) {
                (DataOutcome::Content, Some(key))
            } else {
                (DataOutcome::ContentBad, None)
            }
        }
        None => (DataOutcome::ContentBad, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{SignatureType, SignedInfo};
    use crate::verifier::DigestSha256Verifier;

    fn signed_data(name: &str, locator: Option<KeyLocator>) -> Data {
        let signed_info = SignedInfo {
            key_locator: locator,
            publisher_public_key_digest: None,
            timestamp_ms: None,
            content_type: 0,
            freshness_seconds: None,
        };
        let mut data = Data {
            name: Name::from_uri(name),
            content: b"payload".to_vec(),
            signed_info,
            signature_type: SignatureType::DigestSha256,
            signature: Vec::new(),
            witness: None,
        };
        data.signature = DigestSha256Verifier.sign(&data.signed_portion());
        data
    }

    #[test]
    fn test_verify_disabled_yields_unverified() {
        let data = signed_data("/a", None);
        let cache = KeyCache::new(4);
        let decision = decide(false, &data, &DigestSha256Verifier, &cache);
        assert!(matches!(decision, VerifyDecision::Immediate(DataOutcome::ContentUnverified)));
    }

    #[test]
    fn test_self_referential_key_name_verifies_inline() {
        let data = signed_data("/keys/signer/KEY/1", Some(KeyLocator::KeyName(Name::from_uri("/keys/signer/KEY"))));
        let cache = KeyCache::new(4);
        let decision = decide(true, &data, &DigestSha256Verifier, &cache);
        assert!(matches!(decision, VerifyDecision::Immediate(DataOutcome::Content)));
    }

    #[test]
    fn test_other_key_name_misses_cache_and_requests_fetch() {
        let data = signed_data("/testecho/hello", Some(KeyLocator::KeyName(Name::from_uri("/keys/signer/KEY/1"))));
        let cache = KeyCache::new(4);
        let decision = decide(true, &data, &DigestSha256Verifier, &cache);
        match decision {
            VerifyDecision::NeedKey { key_name_prefix } => {
                assert_eq!(key_name_prefix, Name::from_uri("/keys/signer/KEY/1"));
            }
            _ => panic!("expected NeedKey"),
        }
    }

    #[test]
    fn test_inline_key_bad_signature_is_content_bad_not_content() {
        let mut data = signed_data("/a", Some(KeyLocator::Key(vec![])));
        data.signature = vec![0xFF; 32];
        let cache = KeyCache::new(4);
        let decision = decide(true, &data, &DigestSha256Verifier, &cache);
        assert!(matches!(decision, VerifyDecision::Immediate(DataOutcome::ContentBad)));
    }

    #[test]
    fn test_witness_present_is_content_bad_even_with_good_locator() {
        let mut data = signed_data(
            "/keys/signer/KEY/1",
            Some(KeyLocator::KeyName(Name::from_uri("/keys/signer/KEY"))),
        );
        data.witness = Some(vec![0xAA; 8]);
        let cache = KeyCache::new(4);
        let decision = decide(true, &data, &DigestSha256Verifier, &cache);
        assert!(matches!(decision, VerifyDecision::Immediate(DataOutcome::ContentBad)));
    }

    #[test]
    fn test_cert_locator_is_content_bad() {
        let data = signed_data("/a", Some(KeyLocator::Cert(vec![1, 2, 3])));
        let cache = KeyCache::new(4);
        let decision = decide(true, &data, &DigestSha256Verifier, &cache);
        assert!(matches!(decision, VerifyDecision::Immediate(DataOutcome::ContentBad)));
    }

    #[test]
    fn test_finish_after_key_fetch_inserts_verifiable_key() {
        let original = signed_data("/testecho/hello", Some(KeyLocator::KeyName(Name::from_uri("/keys/signer"))));
        let key_data = Data {
            name: Name::from_uri("/keys/signer/KEY/1"),
            content: Vec::new(),
            signed_info: SignedInfo::default(),
            signature_type: SignatureType::DigestSha256,
            signature: Vec::new(),
            witness: None,
        };
        let (outcome, key) = finish_after_key_fetch(&original, &key_data, &DigestSha256Verifier);
        assert!(matches!(outcome, DataOutcome::Content));
        assert!(key.is_some());
    }
}

//! Key cache (C4, §4.6): name-indexed cache of verified public keys,
//! longest-match lookup, FIFO eviction bounded to a configurable capacity.
//!
//! Grounded on the teacher's `store.rs` (`ContentStore` trait shape and its
//! "evict unsolicited first, then stale, then fresh" eviction commentary),
//! simplified to plain FIFO: a key cache only ever holds entries this Face
//! itself fetched and verified, so there is no unsolicited/stale
//! distinction to make — FIFO is the faithful simplification of that
//! eviction order (see DESIGN.md).

use crate::name::{longest_match, Name};
use crate::timestamp::Timestamp;
use crate::verifier::PublicKey;

struct Entry {
    key_name: Name,
    key: PublicKey,
    created_at: Timestamp,
}

pub struct KeyCache {
    entries: Vec<Entry>,
    capacity: usize,
}

impl KeyCache {
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), capacity: capacity.max(1) }
    }

    /// Longest-match lookup (§4.1) over cached key names interpreted as
    /// prefixes of `name`.
    pub fn lookup(&self, name: &Name) -> Option<&PublicKey> {
        longest_match(&self.entries, name, |e| &e.key_name).map(|e| &e.key)
    }

    pub fn insert(&mut self, key_name: Name, key: PublicKey, now: Timestamp) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(Entry { key_name, key, created_at: now });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SignatureType;

    fn key(tag: u8) -> PublicKey {
        PublicKey { signature_type: SignatureType::DigestSha256, bytes: vec![tag] }
    }

    fn ts(ms: u64) -> Timestamp {
        Timestamp { ms_since_1970: ms }
    }

    #[test]
    fn test_insert_and_longest_match_lookup() {
        let mut cache = KeyCache::new(4);
        cache.insert(Name::from_uri("/keys"), key(1), ts(0));
        cache.insert(Name::from_uri("/keys/signer"), key(2), ts(0));

        let found = cache.lookup(&Name::from_uri("/keys/signer/cert")).unwrap();
        assert_eq!(found.bytes, vec![2]);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut cache = KeyCache::new(2);
        cache.insert(Name::from_uri("/a"), key(1), ts(0));
        cache.insert(Name::from_uri("/b"), key(2), ts(0));
        cache.insert(Name::from_uri("/c"), key(3), ts(0));

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&Name::from_uri("/a")).is_none());
        assert!(cache.lookup(&Name::from_uri("/b")).is_some());
        assert!(cache.lookup(&Name::from_uri("/c")).is_some());
    }

    #[test]
    fn test_lookup_miss_returns_none() {
        let cache = KeyCache::new(4);
        assert!(cache.lookup(&Name::from_uri("/nope")).is_none());
    }
}

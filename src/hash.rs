//! Digest primitives (teacher: `src/hash.rs` + `platform/mod.rs`'s `sha`
//! submodule, collapsed into a single concrete SHA-256 hasher since this
//! crate is not generic over hash width the way the teacher's `no_std`
//! core is).

use sha2::{Digest, Sha256};

pub const DIGEST_LEN: usize = 32;

pub trait Hasher {
    fn reset(&mut self);
    fn update(&mut self, bytes: &[u8]);
    fn finalize_reset(&mut self) -> [u8; DIGEST_LEN];
}

#[derive(Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self { inner: Sha256::new() }
    }
}

impl Hasher for Sha256Hasher {
    fn reset(&mut self) {
        self.inner = Sha256::new();
    }

    fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    fn finalize_reset(&mut self) -> [u8; DIGEST_LEN] {
        let digest = std::mem::take(&mut self.inner).finalize();
        digest.into()
    }
}

/// One-shot convenience used by the codec and verifier; avoids callers
/// standing up a `Sha256Hasher` for a single digest.
pub fn sha256(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256Hasher::new();
    hasher.update(bytes);
    hasher.finalize_reset()
}

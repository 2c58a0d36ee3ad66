//! Keccak-256, the digest function of the typed-data hashing scheme.

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 digest of a byte string.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let digest: [u8; 32] = Keccak256::new().chain_update(data.as_ref()).finalize().into();
    digest
}

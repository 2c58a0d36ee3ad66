//! Prehash signing and signer recovery over secp256k1.
//!
//! The digest being signed is always the 32-byte typed-data signing
//! digest; no hashing happens here.

use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::address::Address;
use crate::error::SignatureError;
use crate::keccak::keccak256;
use crate::signature::RecoverableSignature;

/// Sign a 32-byte digest, producing a recoverable signature.
pub fn sign_digest(
    digest: &[u8; 32],
    signing_key: &SigningKey,
) -> Result<RecoverableSignature, SignatureError> {
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(digest)
        .map_err(|_| SignatureError::SigningFailed)?;
    Ok((signature, recovery_id).into())
}

/// Recover the signer's address from a digest and a recoverable
/// signature.
///
/// Fails with [`SignatureError::RecoveryFailed`] when no public key can
/// be recovered; a successfully recovered but unexpected signer is not an
/// error at this layer.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address, SignatureError> {
    let (signature, recovery_id) = signature.to_k256()?;
    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_of(&verifying_key))
}

/// The address of a public key: the low 20 bytes of the Keccak-256 digest
/// of the uncompressed point, tag byte excluded.
pub fn address_of(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::from(bytes)
}

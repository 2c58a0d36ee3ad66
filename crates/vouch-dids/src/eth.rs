//! # Ethereum DIDs
//!
//! `did:pkh` identifiers over Ethereum accounts, the single-shot typed-data
//! signature verification protocol, and the signing provider.
//!
//! Verification reconstructs the signing digest from a content-addressed
//! block: decode the canonical payload, convert it to typed data under the
//! network's fixed domain and primary-type conventions, hash, recover the
//! signer, and compare addresses case-insensitively. A well-formed
//! signature from the wrong key is a `false` result; only malformed input
//! is an error.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;

use vouch_core::{
    convert_to_typed_data, default_float_policy, ConversionError, TypedData, TypedValue,
};
use vouch_crypto::{
    recover_address, sign_digest, signing_digest, Address, Eip712HashError, SignatureError,
};

use crate::block::{Block, BlockError};

/// Scheme prefix of an Ethereum `did:pkh` identifier on mainnet.
pub const ETH_DID_PREFIX: &str = "did:pkh:eip155:1:";

/// Typed-data domain name every signer and verifier on the network uses.
pub const TYPED_DATA_DOMAIN: &str = "vouch.network";

/// Primary type name of the transaction container format.
pub const TX_CONTAINER_TYPE: &str = "tx_container_v0";

/// Error in the DID verification or signing protocol.
#[derive(Error, Debug)]
pub enum EthDidError {
    /// The DID string does not carry the expected scheme prefix.
    #[error("malformed DID `{0}`: expected `{ETH_DID_PREFIX}<address>`")]
    MalformedDid(String),

    /// The block payload could not be decoded.
    #[error(transparent)]
    Block(#[from] BlockError),

    /// The decoded payload could not be converted to typed data.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The signing digest could not be computed.
    #[error(transparent)]
    Hash(#[from] Eip712HashError),

    /// The signer could not be recovered from the signature.
    #[error("signature recovery failed: {0}")]
    SignatureRecoveryFailed(#[source] SignatureError),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(#[source] SignatureError),
}

/// An Ethereum `did:pkh` identifier.
///
/// Construction concatenates the scheme prefix with the given address
/// string and performs no validation; a nonsensical address segment
/// simply never verifies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EthDid(String);

impl EthDid {
    /// Build a DID from an address string, verbatim.
    pub fn new(address: &str) -> Self {
        Self(format!("{ETH_DID_PREFIX}{address}"))
    }

    /// The full DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address segment of the DID.
    pub fn address(&self) -> Result<&str, EthDidError> {
        self.0
            .strip_prefix(ETH_DID_PREFIX)
            .ok_or_else(|| EthDidError::MalformedDid(self.0.clone()))
    }

    /// Verify a typed-data signature over a content-addressed block.
    ///
    /// Returns `Ok(true)` when the recovered signer matches this DID's
    /// address, `Ok(false)` when a well-formed signature was produced by
    /// some other key, and an error when the block cannot be decoded and
    /// converted or the signature is malformed.
    pub fn verify(&self, block: &Block, signature_hex: &str) -> Result<bool, EthDidError> {
        let digest = block_signing_digest(block)?;

        let signature = vouch_crypto::RecoverableSignature::from_hex(signature_hex)
            .map_err(EthDidError::SignatureRecoveryFailed)?;
        let recovered =
            recover_address(&digest, &signature).map_err(EthDidError::SignatureRecoveryFailed)?;

        let expected = self.address()?;
        let matches = recovered.to_lowercase_hex() == expected.to_lowercase();
        tracing::debug!(
            did = %self.0,
            recovered = %recovered,
            matches,
            "verified typed-data signature"
        );
        Ok(matches)
    }
}

impl fmt::Display for EthDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EthDid {
    type Err = EthDidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with(ETH_DID_PREFIX) {
            return Err(EthDidError::MalformedDid(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

/// Convert a block's payload and compute its signing digest under the
/// network conventions. Shared by the signing and verification paths so
/// both sides always classify identically.
fn block_signing_digest(block: &Block) -> Result<[u8; 32], EthDidError> {
    let value = block.decode()?;
    let typed_data = convert_block_value(&value)?;
    Ok(signing_digest(&typed_data)?)
}

fn convert_block_value(value: &TypedValue) -> Result<TypedData, ConversionError> {
    convert_to_typed_data(
        TYPED_DATA_DOMAIN,
        value,
        TX_CONTAINER_TYPE,
        default_float_policy,
    )
}

/// A signing capability over a managed secp256k1 private key.
///
/// Does not implement `Serialize`; the key never leaves the provider.
pub struct EthProvider {
    signing_key: SigningKey,
}

impl EthProvider {
    /// Generate a provider with a fresh random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Wrap an existing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// The address of the managed key.
    pub fn address(&self) -> Address {
        vouch_crypto::address_of(self.signing_key.verifying_key())
    }

    /// The DID of the managed key, with a checksum-rendered address.
    pub fn did(&self) -> EthDid {
        EthDid::new(&self.address().to_checksum_string())
    }

    /// Sign an assembled typed-data value, returning the hex transport
    /// form of the signature.
    pub fn sign_typed_data(&self, typed_data: &TypedData) -> Result<String, EthDidError> {
        let digest = signing_digest(typed_data)?;
        let signature =
            sign_digest(&digest, &self.signing_key).map_err(EthDidError::Signing)?;
        Ok(signature.to_hex())
    }

    /// Sign a content-addressed block under the network conventions.
    ///
    /// Decodes and converts the block exactly like verification does, so
    /// the produced signature verifies against this provider's DID.
    pub fn sign_block(&self, block: &Block) -> Result<String, EthDidError> {
        let digest = block_signing_digest(block)?;
        let signature =
            sign_digest(&digest, &self.signing_key).map_err(EthDidError::Signing)?;
        tracing::debug!(did = %self.did(), id = %block.content_id(), "signed block");
        Ok(signature.to_hex())
    }
}

impl fmt::Debug for EthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthProvider({}, <private>)", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_eth_did_concatenates_prefix() {
        let address = "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC";
        let did = EthDid::new(address);
        assert_eq!(did.as_str(), format!("{ETH_DID_PREFIX}{address}"));
        assert_eq!(did.address().unwrap(), address);
    }

    #[test]
    fn test_did_string_roundtrip() {
        let did = EthDid::new("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC");
        let parsed: EthDid = did.to_string().parse().unwrap();
        assert_eq!(parsed, did);
    }

    #[test]
    fn test_foreign_prefix_is_malformed() {
        let err = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
            .parse::<EthDid>()
            .unwrap_err();
        assert!(matches!(err, EthDidError::MalformedDid(_)));
    }

    #[test]
    fn test_provider_construction() {
        let provider = EthProvider::generate();
        assert!(provider.did().as_str().starts_with(ETH_DID_PREFIX));
        // The address segment renders in checksum form.
        assert_eq!(
            provider.did().address().unwrap(),
            provider.address().to_checksum_string()
        );
    }

    #[test]
    fn test_provider_debug_does_not_leak_key() {
        let provider = EthProvider::generate();
        let debug = format!("{provider:?}");
        assert!(debug.contains("<private>"));
        assert!(!debug.contains("SigningKey"));
    }
}

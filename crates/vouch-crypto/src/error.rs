//! # Error Types
//!
//! Errors for the cryptographic layer. All errors use `thiserror`; none of
//! the hashing or recovery paths panic on malformed input.

use thiserror::Error;

/// Error parsing an Ethereum address literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid address literal `{0}`: expected 0x-prefixed 40-character hex")]
pub struct AddressError(pub String);

/// Error handling a recoverable ECDSA signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The hex transport form could not be decoded.
    #[error("signature is not valid hex")]
    InvalidHex,

    /// The signature byte length was not 65 (`r || s || v`).
    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),

    /// The recovery byte was outside 0/1 (or 27/28 before normalization).
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    /// The `r`/`s` scalars do not form a valid signature.
    #[error("malformed signature scalars")]
    MalformedSignature,

    /// Producing a signature over the digest failed.
    #[error("signing failed")]
    SigningFailed,

    /// No public key could be recovered from the digest and signature.
    #[error("signer recovery failed")]
    RecoveryFailed,
}

/// Error computing the typed-data signing digest.
#[derive(Error, Debug)]
pub enum Eip712HashError {
    /// A referenced composite type is missing from the registry.
    #[error("composite type `{0}` is not registered")]
    UnknownType(String),

    /// A message value does not match the shape its type tag requires.
    #[error("value does not match type tag `{tag}` at field `{field}`")]
    ValueMismatch {
        /// The tag that failed to encode.
        tag: String,
        /// The field being encoded.
        field: String,
    },

    /// An integer leaf does not fit the 256-bit word of its tag.
    #[error("integer out of range for `{0}`")]
    IntegerOutOfRange(String),

    /// A bytes leaf carried in hex transport form failed to decode.
    #[error("invalid hex in bytes value: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// An address leaf failed to parse.
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
}

//! # vouch-crypto — Cryptographic Primitives
//!
//! The trusted primitives under the typed-data signing protocol:
//! Keccak-256, Ethereum account addresses, recoverable secp256k1 ECDSA,
//! and the EIP-712 signing digest over an assembled
//! [`TypedData`](vouch_core::TypedData).
//!
//! ## Key Design Principles
//!
//! 1. **Digest in, digest out.** Signing and recovery operate on the
//!    32-byte signing digest only; producing that digest is the exclusive
//!    job of [`eip712::signing_digest`].
//!
//! 2. **Malformed input is an error, not a panic.** Hand-built or
//!    tampered typed data surfaces as `Eip712HashError`; undecodable
//!    signatures as `SignatureError`.
//!
//! 3. **Addresses compare by bytes.** Case conventions (EIP-55) are a
//!    rendering concern, so recovered-vs-expected comparison is
//!    case-insensitive by construction.

pub mod address;
pub mod eip712;
pub mod error;
pub mod keccak;
pub mod secp256k1;
pub mod signature;

// Re-export primary types for ergonomic imports.
pub use address::Address;
pub use eip712::{encode_type, signing_digest};
pub use error::{AddressError, Eip712HashError, SignatureError};
pub use keccak::keccak256;
pub use secp256k1::{address_of, recover_address, sign_digest};
pub use signature::RecoverableSignature;

//! # vouch-dids — Decentralized Identifiers
//!
//! The consumer layer of the typed-data signing protocol: content-addressed
//! data blocks, `did:pkh` Ethereum DIDs, single-shot signature
//! verification, and the signing provider.
//!
//! ## Key Design Principles
//!
//! 1. **One pipeline, both directions.** Signing and verification share the
//!    block-decode and conversion path, so a signature produced here always
//!    verifies against the producer's DID.
//!
//! 2. **Verification result vs. verification error.** A well-formed
//!    signature from the wrong key yields `Ok(false)`. Errors are reserved
//!    for undecodable blocks, unconvertible payloads and malformed
//!    signatures.
//!
//! 3. **Integrity at the boundary.** Blocks re-verify their content
//!    identifier on construction; a payload and identifier that disagree
//!    never enter the protocol.

pub mod block;
pub mod eth;

// Re-export primary types for ergonomic imports.
pub use block::{Block, BlockError, ContentId};
pub use eth::{
    EthDid, EthDidError, EthProvider, ETH_DID_PREFIX, TX_CONTAINER_TYPE, TYPED_DATA_DOMAIN,
};

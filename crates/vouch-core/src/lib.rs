//! # vouch-core — Typed-Data Codec
//!
//! Converts arbitrary, dynamically-shaped records into canonical,
//! strongly-typed data suitable for domain-separated hashing and signing:
//! a domain descriptor, a registry of named composite types, a primary
//! type name, and a rewritten message tree whose shape the registry
//! describes field-for-field.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value space.** [`TypedValue`] is a tagged variant over
//!    exactly the supported kinds, with an explicit `Unsupported`
//!    fallthrough. Nothing outside the set can be silently dropped.
//!
//! 2. **One walk, two outputs.** The schema builder and the message
//!    rewriter share a single traversal, so the emitted types always
//!    describe the emitted message.
//!
//! 3. **Determinism by construction.** Records and the type registry are
//!    `BTreeMap`-backed; field descriptors come out in lexicographic key
//!    order at every level. Logically equal inputs serialize and hash
//!    identically.
//!
//! 4. **Numeric policy as a parameter.** Floating-point leaves are only
//!    admissible through a caller-supplied conversion function, exercised
//!    per call, never configured globally.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vouch-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod schema;
pub mod typed_data;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{ConversionError, FloatPolicyError};
pub use schema::{
    FieldDescriptor, ParseTypeTagError, TypeRegistry, TypeTag, DOMAIN_TYPE_NAME,
    UNDEFINED_TYPE_NAME,
};
pub use typed_data::{
    convert_to_typed_data, default_float_policy, domain_field_descriptors, Domain, MessageValue,
    TypedData,
};
pub use value::{is_address_literal, Kind, TypedValue, UnsupportedKind};

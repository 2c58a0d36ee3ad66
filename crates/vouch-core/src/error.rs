//! # Error Types
//!
//! Errors raised by the typed-data conversion walk. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Every variant aborts the conversion that raised it: there is no
//! partial-success mode, and no partial `TypedData` ever escapes a failed
//! call. Variants that point into the input carry the offending path in
//! `$.field[index]` notation.

use thiserror::Error;

/// Error returned by a caller-supplied numeric policy when it refuses to
/// convert a floating-point value.
///
/// The policy's message is carried verbatim through
/// [`ConversionError::NumericPolicyRejected`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FloatPolicyError(pub String);

impl FloatPolicyError {
    /// Create a policy error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Error during typed-data conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The domain identifier string was empty.
    #[error("domain name must not be empty")]
    InvalidDomain,

    /// The primary type name was empty.
    #[error("primary type name must not be empty")]
    InvalidPrimaryType,

    /// A value outside the supported kind set was encountered.
    #[error("unsupported value kind `{kind}` at {path}")]
    UnsupportedType {
        /// Path of the offending value.
        path: String,
        /// Name of the foreign kind, e.g. `function` or `channel`.
        kind: String,
    },

    /// The numeric policy refused a floating-point value.
    #[error("numeric policy rejected float at {path}: {source}")]
    NumericPolicyRejected {
        /// Path of the offending value.
        path: String,
        /// The policy's error, verbatim.
        #[source]
        source: FloatPolicyError,
    },

    /// A sequence mixed element kinds that cannot unify to a single
    /// element type tag.
    #[error("sequence at {path} mixes incompatible element types")]
    InconsistentArrayElementType {
        /// Path of the offending sequence.
        path: String,
    },

    /// The same composite type name was synthesized with two different
    /// field lists.
    #[error("conflicting definitions for composite type `{name}`")]
    TypeSchemaConflict {
        /// The qualified type name that was redefined.
        name: String,
    },

    /// A fixed-shape record could not be read through its serialization
    /// contract.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

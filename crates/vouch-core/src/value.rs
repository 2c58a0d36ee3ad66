//! # Typed Value Model
//!
//! The closed input value space of the typed-data codec, and the kind
//! classifier over it.
//!
//! `TypedValue` is a tagged variant over exactly the kinds the schema
//! generator supports. Anything else (function values, channel-like
//! handles, nulls) enters the tree only as [`TypedValue::Unsupported`],
//! which every conversion rejects. This replaces open-ended runtime type
//! dispatch: adding a kind forces every consumer to handle it at compile
//! time, and nothing can be silently dropped.
//!
//! Records are `BTreeMap`-backed, so field iteration is lexicographic by
//! key at every level. Two logically equal records therefore always
//! traverse, register, and hash identically.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ConversionError;

/// A dynamically-shaped value in the supported input space.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Boolean scalar.
    Bool(bool),
    /// UTF-8 string scalar. Strings matching the address literal pattern
    /// are classified as addresses, not strings.
    String(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer. Kept distinct from [`TypedValue::Int`]
    /// because unsigned sources promote to `uint256`.
    Uint(u64),
    /// Floating-point scalar. Only admissible through the caller-supplied
    /// numeric policy.
    Float(f64),
    /// Raw byte sequence. Never treated as a sequence of small integers.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<TypedValue>),
    /// Key-value record with lexicographically ordered keys.
    Record(BTreeMap<String, TypedValue>),
    /// Explicit fallthrough for values outside the supported set. The
    /// payload names the foreign kind (`"function"`, `"channel"`,
    /// `"null"`, ...) for error reporting.
    Unsupported(&'static str),
}

impl TypedValue {
    /// Build a record from key-value pairs.
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypedValue)>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Read a fixed-shape record through its serialization contract.
    ///
    /// Named members are read exactly as key-value record entries, so a
    /// struct input converts identically to the equivalent map. Note that
    /// this bridge cannot distinguish byte sequences from integer
    /// sequences; pass [`TypedValue::Bytes`] directly when byte semantics
    /// matter.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, ConversionError> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Name of this value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Int(_) => "integer",
            Self::Uint(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "sequence",
            Self::Record(_) => "record",
            Self::Unsupported(kind) => kind,
        }
    }
}

impl From<serde_json::Value> for TypedValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Unsupported("null"),
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                // JSON carries no signedness; mirror the block decoder and
                // stay signed up to i64::MAX so both ingestion paths
                // classify identically.
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Uint(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => Self::Record(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u64> for TypedValue {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<TypedValue>> for TypedValue {
    fn from(value: Vec<TypedValue>) -> Self {
        Self::Array(value)
    }
}

/// Structural kind of a classified value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Boolean scalar.
    Bool,
    /// String scalar that is not an address literal.
    String,
    /// String scalar matching the address literal pattern.
    Address,
    /// Signed integer scalar.
    Int,
    /// Unsigned integer scalar.
    Uint,
    /// Floating-point scalar, pending the numeric policy.
    Float,
    /// Raw byte sequence.
    Bytes,
    /// Ordered sequence.
    Sequence,
    /// Key-value record.
    Record,
}

/// Kind of a value outside the supported set. Surfaced by the conversion
/// walk as [`ConversionError::UnsupportedType`] with the offending path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedKind(pub &'static str);

impl Kind {
    /// Classify a value. Total over the value space: every supported
    /// variant maps to a kind, and `Unsupported` payloads surface as the
    /// error case rather than being dropped.
    pub fn classify(value: &TypedValue) -> Result<Self, UnsupportedKind> {
        match value {
            TypedValue::Bool(_) => Ok(Self::Bool),
            TypedValue::String(s) if is_address_literal(s) => Ok(Self::Address),
            TypedValue::String(_) => Ok(Self::String),
            TypedValue::Int(_) => Ok(Self::Int),
            TypedValue::Uint(_) => Ok(Self::Uint),
            TypedValue::Float(_) => Ok(Self::Float),
            TypedValue::Bytes(_) => Ok(Self::Bytes),
            TypedValue::Array(_) => Ok(Self::Sequence),
            TypedValue::Record(_) => Ok(Self::Record),
            TypedValue::Unsupported(kind) => Err(UnsupportedKind(kind)),
        }
    }
}

/// Whether a string is an Ethereum address literal: `0x` followed by
/// exactly 40 hexadecimal characters, any case.
pub fn is_address_literal(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s.as_bytes()[2..].iter().all(u8::is_ascii_hexdigit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_literal_detection() {
        assert!(is_address_literal(
            "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        ));
        assert!(is_address_literal(
            "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826"
        ));
        // wrong length
        assert!(!is_address_literal("0xCcCC"));
        // missing prefix
        assert!(!is_address_literal(
            "CcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC00"
        ));
        // non-hex payload
        assert!(!is_address_literal(
            "0xZZCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        ));
        assert!(!is_address_literal(""));
    }

    #[test]
    fn test_classify_scalars() {
        assert_eq!(Kind::classify(&TypedValue::Bool(true)), Ok(Kind::Bool));
        assert_eq!(Kind::classify(&TypedValue::from("hello")), Ok(Kind::String));
        assert_eq!(
            Kind::classify(&TypedValue::from(
                "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            )),
            Ok(Kind::Address)
        );
        assert_eq!(Kind::classify(&TypedValue::Int(-5)), Ok(Kind::Int));
        assert_eq!(Kind::classify(&TypedValue::Uint(5)), Ok(Kind::Uint));
        assert_eq!(Kind::classify(&TypedValue::Float(1.5)), Ok(Kind::Float));
        assert_eq!(
            Kind::classify(&TypedValue::Bytes(vec![1, 2, 3])),
            Ok(Kind::Bytes)
        );
    }

    #[test]
    fn test_classify_unsupported_is_an_error_not_a_drop() {
        let err = Kind::classify(&TypedValue::Unsupported("function")).unwrap_err();
        assert_eq!(err, UnsupportedKind("function"));
    }

    #[test]
    fn test_from_serialize_reads_named_members() {
        #[derive(serde::Serialize)]
        struct Dummy {
            #[serde(rename = "Name")]
            name: String,
        }

        let value = TypedValue::from_serialize(&Dummy {
            name: "alice".to_string(),
        })
        .unwrap();
        let TypedValue::Record(fields) = value else {
            panic!("expected record");
        };
        assert_eq!(fields.get("Name"), Some(&TypedValue::from("alice")));
    }

    #[test]
    fn test_json_null_maps_to_unsupported() {
        let value: TypedValue = serde_json::json!({ "x": null }).into();
        let TypedValue::Record(fields) = value else {
            panic!("expected record");
        };
        assert_eq!(fields.get("x"), Some(&TypedValue::Unsupported("null")));
    }

    #[test]
    fn test_json_numbers_stay_signed_up_to_i64_max() {
        let value: TypedValue = serde_json::json!(25).into();
        assert_eq!(value, TypedValue::Int(25));

        let value: TypedValue = serde_json::json!(u64::MAX).into();
        assert_eq!(value, TypedValue::Uint(u64::MAX));
    }
}

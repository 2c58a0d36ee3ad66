//! # Typed Data
//!
//! The assembled conversion result and its interchange form, plus the
//! conversion entry point that drives the schema walk.
//!
//! The interchange JSON has exactly five top-level fields: `EIP712Domain`
//! (the fixed domain descriptor type), `types` (qualified composite name
//! to field list), `primaryType`, `domain` and `message`. Descriptor order
//! within each type's array is lexicographic by field name, so repeated
//! conversions of logically identical input serialize byte-for-byte
//! identically.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConversionError, FloatPolicyError};
use crate::schema::{Conversion, FieldDescriptor, TypeRegistry, TypeTag};
use crate::value::TypedValue;

/// A canonicalized leaf or subtree of the rewritten message.
///
/// Shape matches the registered composite types field-for-field. Numeric
/// leaves are arbitrary-precision integers regardless of their source
/// width; floating-point input only appears here after the numeric policy
/// converted it.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
    /// Boolean leaf.
    Bool(bool),
    /// String or address-literal leaf, stored verbatim.
    String(String),
    /// Canonical integer leaf.
    Int(BigInt),
    /// Byte-sequence leaf, serialized as `0x`-prefixed hex.
    Bytes(Vec<u8>),
    /// Sequence of rewritten elements.
    Array(Vec<MessageValue>),
    /// Record of rewritten fields, lexicographically ordered.
    Object(BTreeMap<String, MessageValue>),
}

impl MessageValue {
    /// The boolean payload, if this is a boolean leaf.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The string payload, if this is a string leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an integer leaf.
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(n) => Some(n),
            _ => None,
        }
    }

    /// The elements, if this is a sequence.
    pub fn as_array(&self) -> Option<&[MessageValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The fields, if this is a record.
    pub fn as_object(&self) -> Option<&BTreeMap<String, MessageValue>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Field lookup on a record value.
    pub fn get(&self, name: &str) -> Option<&MessageValue> {
        self.as_object().and_then(|fields| fields.get(name))
    }
}

impl Serialize for MessageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::String(s) => serializer.serialize_str(s),
            Self::Int(n) => {
                if let Some(i) = n.to_i64() {
                    serializer.serialize_i64(i)
                } else if let Some(u) = n.to_u64() {
                    serializer.serialize_u64(u)
                } else {
                    // Past 64 bits, decimal strings avoid JSON number
                    // precision hazards.
                    serializer.serialize_str(&n.to_string())
                }
            }
            Self::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl TryFrom<serde_json::Value> for MessageValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Err("null is not a message value".to_string()),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(BigInt::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self::Int(BigInt::from(u)))
                } else {
                    Err(format!("float {n} is not a canonical message value"))
                }
            }
            serde_json::Value::String(s) => Ok(Self::String(s)),
            serde_json::Value::Array(items) => Ok(Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            serde_json::Value::Object(map) => Ok(Self::Object(
                map.into_iter()
                    .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}

impl<'de> Deserialize<'de> for MessageValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// The signing-context descriptor value. Carries just the domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// The domain identifier string, never empty.
    pub name: String,
}

/// The assembled conversion result.
///
/// Immutable once returned; one instance per conversion call. Serializes
/// to and from the interchange form consumed by the hash function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedData {
    /// The fixed domain descriptor type: one `name: string` field.
    #[serde(rename = "EIP712Domain")]
    pub domain_types: Vec<FieldDescriptor>,
    /// Every composite type registered during the walk.
    pub types: TypeRegistry,
    /// The caller-supplied root type name; always present in `types`.
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    /// The domain descriptor value.
    pub domain: Domain,
    /// The rewritten message tree.
    pub message: MessageValue,
}

impl TypedData {
    /// Render the interchange JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the interchange JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The field descriptors of the fixed domain descriptor type.
pub fn domain_field_descriptors() -> Vec<FieldDescriptor> {
    vec![FieldDescriptor::new("name", TypeTag::String)]
}

/// Default numeric policy: truncate finite floats toward zero into an
/// arbitrary-precision integer; reject non-finite values.
pub fn default_float_policy(f: f64) -> Result<BigInt, FloatPolicyError> {
    if !f.is_finite() {
        return Err(FloatPolicyError::new(format!(
            "cannot convert non-finite float {f} to an integer"
        )));
    }
    BigInt::from_f64(f.trunc())
        .ok_or_else(|| FloatPolicyError::new(format!("cannot convert float {f} to an integer")))
}

/// Convert a dynamically-shaped record into typed data.
///
/// Walks `data` once, inferring a type tag for every field, registering
/// each distinct composite shape exactly once, and rewriting the value
/// into the canonical message tree. `float_policy` decides the fate of
/// every floating-point leaf; its error aborts the conversion verbatim.
///
/// # Errors
///
/// `InvalidDomain` / `InvalidPrimaryType` for empty identifiers, and the
/// walk's own errors for unsupported kinds, rejected floats, inconsistent
/// sequences and conflicting type registrations. No partial result is
/// returned on any failure.
pub fn convert_to_typed_data<F>(
    domain_name: &str,
    data: &TypedValue,
    primary_type_name: &str,
    float_policy: F,
) -> Result<TypedData, ConversionError>
where
    F: Fn(f64) -> Result<BigInt, FloatPolicyError>,
{
    if domain_name.is_empty() {
        return Err(ConversionError::InvalidDomain);
    }
    if primary_type_name.is_empty() {
        return Err(ConversionError::InvalidPrimaryType);
    }

    let record = match data {
        TypedValue::Record(record) => record,
        other => {
            return Err(ConversionError::UnsupportedType {
                path: "$".to_string(),
                kind: other.kind_name().to_string(),
            })
        }
    };

    let mut conversion = Conversion::new(&float_policy);
    let message = conversion.register_composite(primary_type_name, record, "$")?;

    Ok(TypedData {
        domain_types: domain_field_descriptors(),
        types: conversion.into_registry(),
        primary_type: primary_type_name.to_string(),
        domain: Domain {
            name: domain_name.to_string(),
        },
        message: MessageValue::Object(message),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for records in the supported value space, floats included
    /// (the default policy accepts any finite float).
    fn supported_value() -> impl Strategy<Value = TypedValue> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(TypedValue::Bool),
            any::<i64>().prop_map(TypedValue::Int),
            any::<u64>().prop_map(TypedValue::Uint),
            (-1.0e12f64..1.0e12).prop_map(TypedValue::Float),
            "[a-zA-Z0-9_ ]{0,24}".prop_map(TypedValue::from),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(TypedValue::Bytes),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(TypedValue::Record)
        })
    }

    proptest! {
        /// Conversion of a record never panics; it either succeeds or
        /// reports a structured error.
        #[test]
        fn conversion_never_panics(record in prop::collection::btree_map(
            "[a-z]{1,8}", supported_value(), 0..6
        )) {
            let data = TypedValue::Record(record);
            let _ = convert_to_typed_data("vouch.network", &data, "tx_container_v0", default_float_policy);
        }

        /// Converting the same logical input twice yields byte-identical
        /// interchange JSON, so the canonical hash is reproducible.
        #[test]
        fn conversion_is_deterministic(record in prop::collection::btree_map(
            "[a-z]{1,8}", supported_value(), 0..6
        )) {
            let data = TypedValue::Record(record);
            let first = convert_to_typed_data("vouch.network", &data, "tx_container_v0", default_float_policy);
            let second = convert_to_typed_data("vouch.network", &data, "tx_container_v0", default_float_policy);
            match (first, second) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
                }
                (Err(_), Err(_)) => {}
                (a, b) => prop_assert!(false, "diverging outcomes: {:?} vs {:?}", a.is_ok(), b.is_ok()),
            }
        }

        /// Every composite type referenced by a field tag is registered.
        #[test]
        fn referenced_types_are_always_registered(record in prop::collection::btree_map(
            "[a-z]{1,8}", supported_value(), 0..6
        )) {
            let data = TypedValue::Record(record);
            if let Ok(typed_data) = convert_to_typed_data(
                "vouch.network", &data, "tx_container_v0", default_float_policy,
            ) {
                for (_, fields) in typed_data.types.iter() {
                    for field in fields {
                        if let Some(name) = field.type_tag.referenced_type() {
                            prop_assert!(
                                typed_data.types.contains(name),
                                "dangling type reference `{}`", name
                            );
                        }
                    }
                }
                prop_assert!(typed_data.types.contains("tx_container_v0"));
            }
        }
    }
}

//! # Type Schema
//!
//! Type tags, field descriptors, the per-conversion type registry, and the
//! recursive walk that builds the schema and rewrites the message tree in
//! lock-step.
//!
//! The walk visits each record once. For every nested record it synthesizes
//! a qualified type name (the parent type name extended with the field name,
//! dot-separated), registers the composite exactly once, and tags the field
//! with the child name. Sequences unify their element tags; records inside a
//! sequence all conform to one index-free child type. Because records
//! iterate in lexicographic key order, registration order and descriptor
//! order are reproducible for logically identical input.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::{ConversionError, FloatPolicyError};
use crate::typed_data::MessageValue;
use crate::value::{is_address_literal, Kind, TypedValue};

/// Name of the fixed domain descriptor type.
pub const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// Element marker for sequences whose element type cannot be inferred
/// (empty sequences).
pub const UNDEFINED_TYPE_NAME: &str = "undefined";

/// A type tag in the typed-data schema.
///
/// The scalar set is closed: only the kinds the generator emits. Composite
/// references carry the qualified name of a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `address`
    Address,
    /// `bytes` (dynamic length)
    Bytes,
    /// `int256`
    Int256,
    /// `uint256`
    Uint256,
    /// `undefined`, the element marker for uninferable sequences.
    Undefined,
    /// Reference to a registered composite type.
    Struct(String),
    /// Homogeneous sequence of the inner tag, rendered `inner[]`.
    Array(Box<TypeTag>),
}

impl TypeTag {
    /// Wrap a tag into its sequence form.
    pub fn array_of(element: TypeTag) -> Self {
        Self::Array(Box::new(element))
    }

    /// The composite type name this tag references, if any, looking
    /// through sequence wrappers.
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            Self::Struct(name) => Some(name),
            Self::Array(inner) => inner.referenced_type(),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Address => f.write_str("address"),
            Self::Bytes => f.write_str("bytes"),
            Self::Int256 => f.write_str("int256"),
            Self::Uint256 => f.write_str("uint256"),
            Self::Undefined => f.write_str(UNDEFINED_TYPE_NAME),
            Self::Struct(name) => f.write_str(name),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// Error parsing a type tag from its textual form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid type tag `{0}`")]
pub struct ParseTypeTagError(pub String);

impl FromStr for TypeTag {
    type Err = ParseTypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Self::array_of(element.parse()?));
        }
        match s {
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "address" => Ok(Self::Address),
            "bytes" => Ok(Self::Bytes),
            "int256" => Ok(Self::Int256),
            "uint256" => Ok(Self::Uint256),
            UNDEFINED_TYPE_NAME => Ok(Self::Undefined),
            name if !name.is_empty() && !name.contains(['[', ']']) => {
                Ok(Self::Struct(name.to_string()))
            }
            other => Err(ParseTypeTagError(other.to_string())),
        }
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A named, typed field of a composite type. Order within a composite's
/// field list is significant and reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears in the record.
    pub name: String,
    /// The field's type tag.
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
}

impl FieldDescriptor {
    /// Construct a descriptor.
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
        }
    }
}

/// Registry of composite type definitions, keyed by qualified type name.
///
/// Owned by a single conversion call: empty at the start, populated once
/// per distinct composite shape during the walk, immutable once the call
/// returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: BTreeMap<String, Vec<FieldDescriptor>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a composite type. Re-registering an identical field list
    /// is a no-op; a conflicting field list under the same name is an
    /// error.
    pub(crate) fn register(
        &mut self,
        name: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<(), ConversionError> {
        match self.types.get(name) {
            None => {
                self.types.insert(name.to_string(), fields);
                Ok(())
            }
            Some(existing) if *existing == fields => Ok(()),
            Some(_) => Err(ConversionError::TypeSchemaConflict {
                name: name.to_string(),
            }),
        }
    }

    /// Field list of a registered composite type.
    pub fn get(&self, name: &str) -> Option<&[FieldDescriptor]> {
        self.types.get(name).map(Vec::as_slice)
    }

    /// Whether a composite type name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterate registered types in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldDescriptor])> {
        self.types.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of registered composite types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<(String, Vec<FieldDescriptor>)> for TypeRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Vec<FieldDescriptor>)>>(iter: I) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion walk
// ---------------------------------------------------------------------------

/// Single-pass schema builder and message rewriter.
///
/// One instance per conversion call; the registry it accumulates is moved
/// into the resulting `TypedData`.
pub(crate) struct Conversion<'p, F> {
    registry: TypeRegistry,
    float_policy: &'p F,
}

impl<'p, F> Conversion<'p, F>
where
    F: Fn(f64) -> Result<BigInt, FloatPolicyError>,
{
    pub(crate) fn new(float_policy: &'p F) -> Self {
        Self {
            registry: TypeRegistry::new(),
            float_policy,
        }
    }

    pub(crate) fn into_registry(self) -> TypeRegistry {
        self.registry
    }

    /// Walk a record, register it under `type_name`, and return its
    /// rewritten message tree.
    pub(crate) fn register_composite(
        &mut self,
        type_name: &str,
        record: &BTreeMap<String, TypedValue>,
        path: &str,
    ) -> Result<BTreeMap<String, MessageValue>, ConversionError> {
        let (fields, message) = self.build_composite(type_name, record, path)?;
        self.registry.register(type_name, fields)?;
        Ok(message)
    }

    /// Build the field list and message tree of a record without
    /// registering it. Used directly by sequence elements, which must all
    /// produce the same field list for one shared registration.
    fn build_composite(
        &mut self,
        type_name: &str,
        record: &BTreeMap<String, TypedValue>,
        path: &str,
    ) -> Result<(Vec<FieldDescriptor>, BTreeMap<String, MessageValue>), ConversionError> {
        let mut fields = Vec::with_capacity(record.len());
        let mut message = BTreeMap::new();
        for (name, value) in record {
            let field_path = format!("{path}.{name}");
            let (tag, rewritten) = self.build_field(type_name, name, value, &field_path)?;
            fields.push(FieldDescriptor::new(name.clone(), tag));
            message.insert(name.clone(), rewritten);
        }
        Ok((fields, message))
    }

    /// Tag one field and rewrite its value.
    fn build_field(
        &mut self,
        parent_type: &str,
        field_name: &str,
        value: &TypedValue,
        path: &str,
    ) -> Result<(TypeTag, MessageValue), ConversionError> {
        match value {
            TypedValue::Record(record) => {
                let child_type = format!("{parent_type}.{field_name}");
                let message = self.register_composite(&child_type, record, path)?;
                Ok((
                    TypeTag::Struct(child_type),
                    MessageValue::Object(message),
                ))
            }
            TypedValue::Array(elements) => {
                self.build_sequence(parent_type, field_name, elements, path)
            }
            scalar => self.build_scalar(scalar, path),
        }
    }

    /// Tag and rewrite a scalar leaf.
    fn build_scalar(
        &mut self,
        value: &TypedValue,
        path: &str,
    ) -> Result<(TypeTag, MessageValue), ConversionError> {
        match value {
            TypedValue::Bool(b) => Ok((TypeTag::Bool, MessageValue::Bool(*b))),
            TypedValue::String(s) if is_address_literal(s) => {
                // Retype only; the literal passes through unchanged.
                Ok((TypeTag::Address, MessageValue::String(s.clone())))
            }
            TypedValue::String(s) => Ok((TypeTag::String, MessageValue::String(s.clone()))),
            TypedValue::Int(i) => Ok((TypeTag::Int256, MessageValue::Int(BigInt::from(*i)))),
            TypedValue::Uint(u) => Ok((TypeTag::Uint256, MessageValue::Int(BigInt::from(*u)))),
            TypedValue::Float(f) => {
                let n = (self.float_policy)(*f).map_err(|source| {
                    ConversionError::NumericPolicyRejected {
                        path: path.to_string(),
                        source,
                    }
                })?;
                let tag = if n.sign() == Sign::Minus {
                    TypeTag::Int256
                } else {
                    TypeTag::Uint256
                };
                Ok((tag, MessageValue::Int(n)))
            }
            TypedValue::Bytes(b) => Ok((TypeTag::Bytes, MessageValue::Bytes(b.clone()))),
            other => Err(ConversionError::UnsupportedType {
                path: path.to_string(),
                kind: other.kind_name().to_string(),
            }),
        }
    }

    /// Tag and rewrite a sequence, unifying its element types.
    fn build_sequence(
        &mut self,
        parent_type: &str,
        field_name: &str,
        elements: &[TypedValue],
        path: &str,
    ) -> Result<(TypeTag, MessageValue), ConversionError> {
        if elements.is_empty() {
            // Nothing to infer from; tag with the explicit marker so the
            // schema stays well-formed.
            return Ok((
                TypeTag::array_of(TypeTag::Undefined),
                MessageValue::Array(Vec::new()),
            ));
        }

        let mut kinds = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let kind = Kind::classify(element).map_err(|unsupported| {
                ConversionError::UnsupportedType {
                    path: format!("{path}[{index}]"),
                    kind: unsupported.0.to_string(),
                }
            })?;
            kinds.push(kind);
        }

        let records = kinds.iter().filter(|k| **k == Kind::Record).count();
        if records > 0 && records < elements.len() {
            return Err(ConversionError::InconsistentArrayElementType {
                path: path.to_string(),
            });
        }
        if records == elements.len() {
            return self.build_record_sequence(parent_type, field_name, elements, path);
        }
        if kinds.contains(&Kind::Sequence) {
            // Multi-dimensional sequences are outside the supported subset.
            return Err(ConversionError::UnsupportedType {
                path: path.to_string(),
                kind: "nested sequence".to_string(),
            });
        }

        let mut unified: Option<TypeTag> = None;
        let mut rewritten = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let element_path = format!("{path}[{index}]");
            let (tag, message) = self.build_scalar(element, &element_path)?;
            unified = Some(match unified {
                None => tag,
                Some(current) => unify_element_tags(current, tag).ok_or_else(|| {
                    ConversionError::InconsistentArrayElementType {
                        path: path.to_string(),
                    }
                })?,
            });
            rewritten.push(message);
        }

        // Non-empty by the guard above.
        let element_tag = unified.ok_or_else(|| ConversionError::InconsistentArrayElementType {
            path: path.to_string(),
        })?;
        Ok((
            TypeTag::array_of(element_tag),
            MessageValue::Array(rewritten),
        ))
    }

    /// A sequence of records: every element conforms to one shared,
    /// index-free child type named after the field itself.
    fn build_record_sequence(
        &mut self,
        parent_type: &str,
        field_name: &str,
        elements: &[TypedValue],
        path: &str,
    ) -> Result<(TypeTag, MessageValue), ConversionError> {
        let child_type = format!("{parent_type}.{field_name}");
        let mut first_fields: Option<Vec<FieldDescriptor>> = None;
        let mut rewritten = Vec::with_capacity(elements.len());

        for (index, element) in elements.iter().enumerate() {
            let TypedValue::Record(record) = element else {
                return Err(ConversionError::InconsistentArrayElementType {
                    path: path.to_string(),
                });
            };
            let element_path = format!("{path}[{index}]");
            let built = self.build_composite(&child_type, record, &element_path);
            // A nested redefinition inside a later element means the
            // elements diverge somewhere below the top-level field list.
            let (fields, message) = match built {
                Ok(ok) => ok,
                Err(ConversionError::TypeSchemaConflict { .. }) if first_fields.is_some() => {
                    return Err(ConversionError::InconsistentArrayElementType {
                        path: path.to_string(),
                    })
                }
                Err(err) => return Err(err),
            };
            match &first_fields {
                None => {
                    self.registry.register(&child_type, fields.clone())?;
                    first_fields = Some(fields);
                }
                Some(expected) if *expected == fields => {}
                Some(_) => {
                    return Err(ConversionError::InconsistentArrayElementType {
                        path: path.to_string(),
                    })
                }
            }
            rewritten.push(MessageValue::Object(message));
        }

        Ok((
            TypeTag::array_of(TypeTag::Struct(child_type)),
            MessageValue::Array(rewritten),
        ))
    }
}

/// Unify two sequence element tags. Equal tags unify to themselves; the
/// two loss-free refinements (`uint256` into `int256`, `address` into
/// `string`) widen; anything else is incompatible.
fn unify_element_tags(a: TypeTag, b: TypeTag) -> Option<TypeTag> {
    use TypeTag::{Address, Int256, String, Uint256};
    match (a, b) {
        (a, b) if a == b => Some(a),
        (Int256, Uint256) | (Uint256, Int256) => Some(Int256),
        (String, Address) | (Address, String) => Some(String),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_display_roundtrip() {
        let tags = [
            TypeTag::Bool,
            TypeTag::String,
            TypeTag::Address,
            TypeTag::Bytes,
            TypeTag::Int256,
            TypeTag::Uint256,
            TypeTag::Undefined,
            TypeTag::Struct("tx_container_v0.tx".to_string()),
            TypeTag::array_of(TypeTag::String),
            TypeTag::array_of(TypeTag::Undefined),
        ];
        for tag in tags {
            let text = tag.to_string();
            assert_eq!(text.parse::<TypeTag>().unwrap(), tag, "{text}");
        }
    }

    #[test]
    fn test_type_tag_rendering() {
        assert_eq!(TypeTag::array_of(TypeTag::String).to_string(), "string[]");
        assert_eq!(TypeTag::array_of(TypeTag::Int256).to_string(), "int256[]");
        assert_eq!(
            TypeTag::array_of(TypeTag::Undefined).to_string(),
            "undefined[]"
        );
    }

    #[test]
    fn test_type_tag_parse_rejects_stray_bracket() {
        assert!("string]".parse::<TypeTag>().is_err());
        assert!("".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_registry_registration_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let fields = vec![FieldDescriptor::new("name", TypeTag::String)];
        registry.register("person", fields.clone()).unwrap();
        registry.register("person", fields.clone()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("person"), Some(fields.as_slice()));
    }

    #[test]
    fn test_registry_conflicting_redefinition_is_an_error() {
        let mut registry = TypeRegistry::new();
        registry
            .register("person", vec![FieldDescriptor::new("name", TypeTag::String)])
            .unwrap();
        let err = registry
            .register("person", vec![FieldDescriptor::new("name", TypeTag::Int256)])
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::TypeSchemaConflict { name } if name == "person"
        ));
    }

    #[test]
    fn test_unify_element_tags() {
        assert_eq!(
            unify_element_tags(TypeTag::String, TypeTag::String),
            Some(TypeTag::String)
        );
        assert_eq!(
            unify_element_tags(TypeTag::Uint256, TypeTag::Int256),
            Some(TypeTag::Int256)
        );
        assert_eq!(
            unify_element_tags(TypeTag::Address, TypeTag::String),
            Some(TypeTag::String)
        );
        assert_eq!(unify_element_tags(TypeTag::String, TypeTag::Int256), None);
        assert_eq!(unify_element_tags(TypeTag::Bytes, TypeTag::Bool), None);
    }
}

//! # Typed-Data Signing Digest
//!
//! EIP-712 hashing over an assembled [`TypedData`] value:
//!
//! `keccak256("\x19\x01" || hashStruct(EIP712Domain, domain) ||
//! hashStruct(primaryType, message))`
//!
//! where `hashStruct(T, v) = keccak256(typeHash(T) || encodeData(T, v))`
//! and `typeHash` digests the type encoding string (the primary type
//! followed by every referenced composite type, sorted by name).
//!
//! Only the tag set the schema generator emits is encodable. The message
//! tree and the registry are produced in lock-step by the same walk, so a
//! shape mismatch here indicates a hand-built or tampered structure and
//! surfaces as an error, never a panic.

use std::collections::BTreeSet;

use num_bigint::{BigInt, Sign};
use vouch_core::{
    FieldDescriptor, MessageValue, TypeRegistry, TypeTag, TypedData, DOMAIN_TYPE_NAME,
};

use crate::address::Address;
use crate::error::Eip712HashError;
use crate::keccak::keccak256;

/// Compute the 32-byte signing digest of an assembled typed-data value.
pub fn signing_digest(typed_data: &TypedData) -> Result<[u8; 32], Eip712HashError> {
    let domain_separator = domain_separator(typed_data)?;

    let message_hash = hash_struct(
        &typed_data.primary_type,
        &typed_data.message,
        &typed_data.types,
    )?;

    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(&domain_separator);
    buf.extend_from_slice(&message_hash);
    Ok(keccak256(&buf))
}

/// Hash the domain descriptor under its fixed type definition.
fn domain_separator(typed_data: &TypedData) -> Result<[u8; 32], Eip712HashError> {
    let domain_value = MessageValue::Object(
        [(
            "name".to_string(),
            MessageValue::String(typed_data.domain.name.clone()),
        )]
        .into_iter()
        .collect(),
    );
    hash_fields(
        DOMAIN_TYPE_NAME,
        &typed_data.domain_types,
        &domain_value,
        &typed_data.types,
    )
}

/// `hashStruct` for a composite type registered in the registry.
fn hash_struct(
    type_name: &str,
    value: &MessageValue,
    types: &TypeRegistry,
) -> Result<[u8; 32], Eip712HashError> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| Eip712HashError::UnknownType(type_name.to_string()))?;
    hash_fields(type_name, fields, value, types)
}

/// `hashStruct` with an explicit field list. The domain descriptor type
/// lives outside the registry, so its fields are passed in directly.
fn hash_fields(
    type_name: &str,
    fields: &[FieldDescriptor],
    value: &MessageValue,
    types: &TypeRegistry,
) -> Result<[u8; 32], Eip712HashError> {
    let type_hash = keccak256(encode_type(type_name, fields, types));

    let object = value
        .as_object()
        .ok_or_else(|| Eip712HashError::ValueMismatch {
            tag: type_name.to_string(),
            field: String::new(),
        })?;

    let mut buf = Vec::with_capacity((1 + fields.len()) * 32);
    buf.extend_from_slice(&type_hash);
    for field in fields {
        let field_value =
            object
                .get(&field.name)
                .ok_or_else(|| Eip712HashError::ValueMismatch {
                    tag: field.type_tag.to_string(),
                    field: field.name.clone(),
                })?;
        buf.extend_from_slice(&encode_field(field, field_value, types)?);
    }
    Ok(keccak256(&buf))
}

/// Build the type encoding string: the primary type's own rendering
/// followed by every transitively referenced composite type, sorted by
/// name.
pub fn encode_type(
    type_name: &str,
    fields: &[FieldDescriptor],
    types: &TypeRegistry,
) -> String {
    let mut referenced = BTreeSet::new();
    for field in fields {
        collect_referenced_types(&field.type_tag, types, &mut referenced);
    }
    referenced.remove(type_name);

    let mut encoded = encode_single_type(type_name, fields);
    for name in &referenced {
        if let Some(ref_fields) = types.get(name) {
            encoded.push_str(&encode_single_type(name, ref_fields));
        }
    }
    encoded
}

/// One type's rendering, e.g. `Person(string name,address wallet)`.
fn encode_single_type(type_name: &str, fields: &[FieldDescriptor]) -> String {
    let mut out = String::new();
    out.push_str(type_name);
    out.push('(');
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&field.type_tag.to_string());
        out.push(' ');
        out.push_str(&field.name);
    }
    out.push(')');
    out
}

/// Recursively collect composite type names referenced from a tag.
fn collect_referenced_types(
    tag: &TypeTag,
    types: &TypeRegistry,
    referenced: &mut BTreeSet<String>,
) {
    let Some(name) = tag.referenced_type() else {
        return;
    };
    if !referenced.insert(name.to_string()) {
        return;
    }
    if let Some(fields) = types.get(name) {
        for field in fields {
            collect_referenced_types(&field.type_tag, types, referenced);
        }
    }
}

/// Encode one field value into its 32-byte word.
fn encode_field(
    field: &FieldDescriptor,
    value: &MessageValue,
    types: &TypeRegistry,
) -> Result<[u8; 32], Eip712HashError> {
    let mismatch = || Eip712HashError::ValueMismatch {
        tag: field.type_tag.to_string(),
        field: field.name.clone(),
    };

    match &field.type_tag {
        TypeTag::Array(element_tag) => {
            let elements = value.as_array().ok_or_else(mismatch)?;
            // An empty sequence hashes the empty byte string whatever its
            // element marker says; `undefined[]` is only ever empty.
            let mut buf = Vec::with_capacity(elements.len() * 32);
            let element_field = FieldDescriptor::new(field.name.clone(), (**element_tag).clone());
            for element in elements {
                buf.extend_from_slice(&encode_field(&element_field, element, types)?);
            }
            Ok(keccak256(&buf))
        }
        TypeTag::Struct(name) => hash_struct(name, value, types),
        TypeTag::Bool => {
            let mut word = [0u8; 32];
            if value.as_bool().ok_or_else(mismatch)? {
                word[31] = 1;
            }
            Ok(word)
        }
        TypeTag::String => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Ok(keccak256(s.as_bytes()))
        }
        TypeTag::Address => {
            let literal = value.as_str().ok_or_else(mismatch)?;
            let address: Address = literal.parse()?;
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(address.as_bytes());
            Ok(word)
        }
        TypeTag::Bytes => {
            // Accept both the raw form and the hex transport form a
            // deserialized interchange document carries.
            let bytes = match value {
                MessageValue::Bytes(b) => b.clone(),
                MessageValue::String(s) => hex::decode(s.strip_prefix("0x").unwrap_or(s))?,
                _ => return Err(mismatch()),
            };
            Ok(keccak256(&bytes))
        }
        TypeTag::Uint256 => {
            let n = value.as_int().ok_or_else(mismatch)?;
            uint256_word(n)
        }
        TypeTag::Int256 => {
            let n = value.as_int().ok_or_else(mismatch)?;
            int256_word(n)
        }
        TypeTag::Undefined => Err(mismatch()),
    }
}

/// Big-endian 32-byte word of a non-negative integer.
fn uint256_word(n: &BigInt) -> Result<[u8; 32], Eip712HashError> {
    let (sign, bytes) = n.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 32 {
        return Err(Eip712HashError::IntegerOutOfRange("uint256".to_string()));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// Big-endian 32-byte two's-complement word of a signed integer.
fn int256_word(n: &BigInt) -> Result<[u8; 32], Eip712HashError> {
    let bytes = n.to_signed_bytes_be();
    if bytes.len() > 32 {
        return Err(Eip712HashError::IntegerOutOfRange("int256".to_string()));
    }
    let fill = if n.sign() == Sign::Minus { 0xff } else { 0x00 };
    let mut word = [fill; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

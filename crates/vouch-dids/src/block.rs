//! # Content-Addressed Data Blocks
//!
//! An immutable payload named by the SHA-256 digest of its own canonical
//! encoding. The payload is CBOR with RFC 8949 deterministic map ordering
//! (entries sorted by encoded key bytes), so the same value always
//! produces the same bytes and therefore the same identifier.
//!
//! ## Integrity Invariant
//!
//! A `Block` can only be built by encoding a value or by re-verifying a
//! claimed identifier against the supplied bytes. A block whose bytes and
//! identifier disagree cannot be constructed.

use std::fmt;
use std::str::FromStr;

use ciborium::value::Value as CborValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use vouch_core::TypedValue;

/// Textual prefix of a rendered content identifier.
const CONTENT_ID_PREFIX: &str = "sha256:";

/// Error handling a content-addressed block.
#[derive(Error, Debug)]
pub enum BlockError {
    /// The value could not be canonically encoded.
    #[error("block encoding failed: {0}")]
    Encode(String),

    /// The payload could not be decoded back into a value.
    #[error("block decoding failed: {0}")]
    Decode(String),

    /// The supplied identifier does not match the payload digest.
    #[error("content id mismatch: claimed {claimed}, computed {computed}")]
    DigestMismatch {
        /// The identifier the caller claimed.
        claimed: ContentId,
        /// The digest of the supplied bytes.
        computed: ContentId,
    },
}

/// A SHA-256 content identifier, rendered `sha256:<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Compute the identifier of a byte string.
    pub fn for_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex of the digest, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_ID_PREFIX}{}", self.to_hex())
    }
}

impl FromStr for ContentId {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix(CONTENT_ID_PREFIX)
            .ok_or_else(|| BlockError::Decode(format!("content id `{s}` lacks prefix")))?;
        let bytes = hex::decode(hex_part)
            .map_err(|e| BlockError::Decode(format!("content id hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| BlockError::Decode("content id must be 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// An immutable content-addressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    data: Vec<u8>,
    id: ContentId,
}

impl Block {
    /// Canonically encode a value and derive its identifier.
    pub fn wrap(value: &TypedValue) -> Result<Self, BlockError> {
        let data = encode_canonical(value)?;
        let id = ContentId::for_bytes(&data);
        Ok(Self { data, id })
    }

    /// Adopt existing bytes under a claimed identifier, re-verifying the
    /// digest.
    pub fn from_parts(data: Vec<u8>, id: ContentId) -> Result<Self, BlockError> {
        let computed = ContentId::for_bytes(&data);
        if computed != id {
            return Err(BlockError::DigestMismatch {
                claimed: id,
                computed,
            });
        }
        Ok(Self { data, id })
    }

    /// The raw canonical bytes.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// The content identifier.
    pub fn content_id(&self) -> &ContentId {
        &self.id
    }

    /// Decode the canonical payload back into a value.
    pub fn decode(&self) -> Result<TypedValue, BlockError> {
        let value: CborValue = ciborium::from_reader(self.data.as_slice())
            .map_err(|e| BlockError::Decode(e.to_string()))?;
        cbor_to_typed(value)
    }
}

/// Canonically encode a value: CBOR with map entries sorted by their
/// encoded key bytes, minimal integer widths, definite lengths.
fn encode_canonical(value: &TypedValue) -> Result<Vec<u8>, BlockError> {
    let cbor = typed_to_cbor(value)?;
    let mut buf = Vec::new();
    ciborium::into_writer(&cbor, &mut buf).map_err(|e| BlockError::Encode(e.to_string()))?;
    Ok(buf)
}

fn typed_to_cbor(value: &TypedValue) -> Result<CborValue, BlockError> {
    match value {
        TypedValue::Bool(b) => Ok(CborValue::Bool(*b)),
        TypedValue::String(s) => Ok(CborValue::Text(s.clone())),
        TypedValue::Int(i) => Ok(CborValue::Integer((*i).into())),
        TypedValue::Uint(u) => Ok(CborValue::Integer((*u).into())),
        TypedValue::Float(f) => Ok(CborValue::Float(*f)),
        TypedValue::Bytes(b) => Ok(CborValue::Bytes(b.clone())),
        TypedValue::Array(items) => Ok(CborValue::Array(
            items
                .iter()
                .map(typed_to_cbor)
                .collect::<Result<_, _>>()?,
        )),
        TypedValue::Record(fields) => {
            let mut entries = Vec::with_capacity(fields.len());
            for (key, field_value) in fields {
                let key_value = CborValue::Text(key.clone());
                let mut encoded_key = Vec::new();
                ciborium::into_writer(&key_value, &mut encoded_key)
                    .map_err(|e| BlockError::Encode(e.to_string()))?;
                entries.push((encoded_key, key_value, typed_to_cbor(field_value)?));
            }
            // Deterministic map ordering is by encoded key bytes, which
            // differs from plain lexicographic order for keys of unequal
            // length.
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(CborValue::Map(
                entries.into_iter().map(|(_, k, v)| (k, v)).collect(),
            ))
        }
        TypedValue::Unsupported(kind) => Err(BlockError::Encode(format!(
            "cannot encode unsupported kind `{kind}`"
        ))),
    }
}

fn cbor_to_typed(value: CborValue) -> Result<TypedValue, BlockError> {
    match value {
        CborValue::Bool(b) => Ok(TypedValue::Bool(b)),
        CborValue::Text(s) => Ok(TypedValue::String(s)),
        CborValue::Integer(i) => {
            let n: i128 = i.into();
            // Decode signed-first so a round-tripped value classifies the
            // same way it did before encoding; unsigned is reserved for
            // magnitudes a signed 64-bit integer cannot hold.
            if let Ok(i) = i64::try_from(n) {
                Ok(TypedValue::Int(i))
            } else if let Ok(u) = u64::try_from(n) {
                Ok(TypedValue::Uint(u))
            } else {
                Err(BlockError::Decode(format!("integer {n} out of range")))
            }
        }
        CborValue::Float(f) => Ok(TypedValue::Float(f)),
        CborValue::Bytes(b) => Ok(TypedValue::Bytes(b)),
        CborValue::Array(items) => Ok(TypedValue::Array(
            items
                .into_iter()
                .map(cbor_to_typed)
                .collect::<Result<_, _>>()?,
        )),
        CborValue::Map(entries) => {
            let mut fields = std::collections::BTreeMap::new();
            for (key, field_value) in entries {
                let CborValue::Text(key) = key else {
                    return Err(BlockError::Decode(
                        "map keys must be text strings".to_string(),
                    ));
                };
                fields.insert(key, cbor_to_typed(field_value)?);
            }
            Ok(TypedValue::Record(fields))
        }
        CborValue::Null => Ok(TypedValue::Unsupported("null")),
        other => Err(BlockError::Decode(format!(
            "unsupported CBOR item: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TypedValue {
        TypedValue::record([
            ("foo", TypedValue::from("bar")),
            ("baz", TypedValue::Int(12345)),
            ("raw", TypedValue::Bytes(vec![0x01, 0x02, 0x03])),
            (
                "tags",
                TypedValue::from(vec![TypedValue::from("a"), TypedValue::from("b")]),
            ),
        ])
    }

    #[test]
    fn test_wrap_decode_roundtrip() {
        let value = sample_record();
        let block = Block::wrap(&value).unwrap();
        assert_eq!(block.decode().unwrap(), value);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let value = sample_record();
        let a = Block::wrap(&value).unwrap();
        let b = Block::wrap(&value).unwrap();
        assert_eq!(a.raw_data(), b.raw_data());
        assert_eq!(a.content_id(), b.content_id());
    }

    #[test]
    fn test_from_parts_verifies_digest() {
        let block = Block::wrap(&sample_record()).unwrap();
        let id = *block.content_id();

        // Honest reconstruction succeeds.
        let rebuilt = Block::from_parts(block.raw_data().to_vec(), id).unwrap();
        assert_eq!(rebuilt, block);

        // Tampered bytes are rejected.
        let mut tampered = block.raw_data().to_vec();
        tampered[0] ^= 0xff;
        assert!(matches!(
            Block::from_parts(tampered, id),
            Err(BlockError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_content_id_display_roundtrip() {
        let id = ContentId::for_bytes(b"payload");
        let text = id.to_string();
        assert!(text.starts_with("sha256:"));
        assert_eq!(text.parse::<ContentId>().unwrap(), id);
    }

    #[test]
    fn test_unsupported_values_do_not_encode() {
        let value = TypedValue::record([("f", TypedValue::Unsupported("function"))]);
        assert!(matches!(Block::wrap(&value), Err(BlockError::Encode(_))));
    }

    #[test]
    fn test_integer_signedness_survives_roundtrip() {
        let value = TypedValue::record([
            ("small", TypedValue::Int(42)),
            ("negative", TypedValue::Int(-7)),
            ("huge", TypedValue::Uint(u64::MAX)),
        ]);
        let decoded = Block::wrap(&value).unwrap().decode().unwrap();
        let TypedValue::Record(fields) = decoded else {
            panic!("expected record");
        };
        // Positive integers come back signed below i64::MAX; only larger
        // magnitudes stay unsigned.
        assert_eq!(fields.get("small"), Some(&TypedValue::Int(42)));
        assert_eq!(fields.get("negative"), Some(&TypedValue::Int(-7)));
        assert_eq!(fields.get("huge"), Some(&TypedValue::Uint(u64::MAX)));
    }

    #[test]
    fn test_map_keys_sort_by_encoded_bytes() {
        // "z" encodes shorter than "aa"; deterministic CBOR puts it first.
        let value = TypedValue::record([
            ("aa", TypedValue::Int(1)),
            ("z", TypedValue::Int(2)),
        ]);
        let block = Block::wrap(&value).unwrap();
        let bytes = block.raw_data();
        let z_pos = bytes
            .windows(1)
            .position(|w| w == b"z")
            .expect("key z present");
        let aa_pos = bytes
            .windows(2)
            .position(|w| w == b"aa")
            .expect("key aa present");
        assert!(z_pos < aa_pos);
    }
}

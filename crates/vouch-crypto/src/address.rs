//! Ethereum account addresses with EIP-55 checksum rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;
use crate::keccak::keccak256;

/// A 20-byte Ethereum account address.
///
/// Parses from any-case `0x` hex; displays in EIP-55 checksum form.
/// Equality is over the raw bytes, so two casings of the same address
/// compare equal once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render as `0x` plus lowercase hex.
    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Render in EIP-55 mixed-case checksum form. A hex digit is
    /// uppercased when the corresponding nibble of the Keccak-256 digest
    /// of the lowercase hex address is at least 8.
    pub fn to_checksum_string(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = digest[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressError(s.to_string()))?;
        if hex_part.len() != 40 {
            return Err(AddressError(s.to_string()));
        }
        let bytes = hex::decode(hex_part).map_err(|_| AddressError(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_string())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_roundtrip() {
        let literal = "0x020A6aef4E458630be6f696E8d23C0958029a47d";
        let address: Address = literal.parse().unwrap();
        assert_eq!(address.to_checksum_string(), literal);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let upper: Address = "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC"
            .parse()
            .unwrap();
        let lower: Address = "0xcccccccccccccccccccccccccccccccccccccccc"
            .parse()
            .unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_parse_rejects_bad_literals() {
        assert!("deadbeef".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZZ"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let address: Address = "0x020A6aef4E458630be6f696E8d23C0958029a47d"
            .parse()
            .unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x020A6aef4E458630be6f696E8d23C0958029a47d\"");
        let restored: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, address);
    }
}

//! Recoverable ECDSA signatures in the 65-byte `r || s || v` transport
//! layout.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::{RecoveryId, Signature};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SignatureError;

/// A secp256k1 ECDSA signature with recovery information.
///
/// Wire layout is `r (32) || s (32) || v (1)`, hex-encoded in transport.
/// The recovery byte is normalized to 0/1 on construction; the legacy
/// 27/28 convention is accepted and folded down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// The `r` scalar, big-endian.
    pub r: [u8; 32],
    /// The `s` scalar, big-endian.
    pub s: [u8; 32],
    /// The normalized recovery id, 0 or 1.
    pub v: u8,
}

impl RecoverableSignature {
    /// Parse the 65-byte wire layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }

        let v = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            v => return Err(SignatureError::InvalidRecoveryId(v)),
        };

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, v })
    }

    /// Parse the hex transport form, with or without a `0x` prefix.
    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        let text = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(text).map_err(|_| SignatureError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    /// The 65-byte wire layout.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// The hex transport form (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Split into the backend signature and recovery id.
    pub(crate) fn to_k256(&self) -> Result<(Signature, RecoveryId), SignatureError> {
        let mut scalars = [0u8; 64];
        scalars[..32].copy_from_slice(&self.r);
        scalars[32..].copy_from_slice(&self.s);

        let signature = Signature::from_slice(&scalars)
            .map_err(|_| SignatureError::MalformedSignature)?;
        let recovery_id =
            RecoveryId::from_byte(self.v).ok_or(SignatureError::InvalidRecoveryId(self.v))?;
        Ok((signature, recovery_id))
    }
}

impl From<(Signature, RecoveryId)> for RecoverableSignature {
    fn from((signature, recovery_id): (Signature, RecoveryId)) -> Self {
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self {
            r,
            s,
            v: recovery_id.to_byte(),
        }
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecoverableSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecoverableSignature {
        RecoverableSignature {
            r: [0x11; 32],
            s: [0x22; 32],
            v: 1,
        }
    }

    #[test]
    fn test_hex_roundtrip() {
        let signature = sample();
        let hex = signature.to_hex();
        assert_eq!(hex.len(), 130);
        assert_eq!(RecoverableSignature::from_hex(&hex).unwrap(), signature);
        // A 0x prefix is tolerated on input.
        assert_eq!(
            RecoverableSignature::from_hex(&format!("0x{hex}")).unwrap(),
            signature
        );
    }

    #[test]
    fn test_legacy_recovery_byte_is_normalized() {
        let mut bytes = sample().to_bytes();
        bytes[64] = 28;
        let signature = RecoverableSignature::from_bytes(&bytes).unwrap();
        assert_eq!(signature.v, 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            RecoverableSignature::from_hex("zz"),
            Err(SignatureError::InvalidHex)
        ));
        assert!(matches!(
            RecoverableSignature::from_bytes(&[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        ));
        let mut bytes = sample().to_bytes();
        bytes[64] = 9;
        assert!(matches!(
            RecoverableSignature::from_bytes(&bytes),
            Err(SignatureError::InvalidRecoveryId(9))
        ));
    }
}

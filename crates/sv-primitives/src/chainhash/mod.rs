//! 32-byte chain hash displayed as byte-reversed hex, the convention for
//! transaction ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Size of a chain hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte hash stored in internal (little-endian) order.
///
/// `Display` reverses the bytes so the string form matches the usual
/// big-endian transaction-id representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Build from a slice that must be exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != HASH_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash length {}, want {}",
                bytes.len(),
                HASH_SIZE
            )));
        }
        let mut arr = [0u8; HASH_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Hash(arr))
    }

    /// Parse a byte-reversed hex string. Short strings are zero padded on
    /// the high end, so `"1"` is the hash ending in byte 0x01.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Ok(Hash::default());
        }
        if hex_str.len() > HASH_SIZE * 2 {
            return Err(PrimitivesError::InvalidHash(format!(
                "hash string longer than {} characters",
                HASH_SIZE * 2
            )));
        }

        let padded = if hex_str.len() % 2 != 0 {
            format!("0{}", hex_str)
        } else {
            hex_str.to_string()
        };
        let decoded = hex::decode(&padded)?;

        // Right-align in display order, then reverse into internal order.
        let mut display = [0u8; HASH_SIZE];
        display[HASH_SIZE - decoded.len()..].copy_from_slice(&decoded);
        display.reverse();
        Ok(Hash(display))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_array(&self) -> [u8; HASH_SIZE] {
        self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Double SHA-256 of `data` as a chain hash.
pub fn double_hash(data: &[u8]) -> Hash {
    Hash(sha256d(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: Hash = Hash([
        0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, 0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63,
        0xf7, 0x4f, 0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, 0x68, 0xd6, 0x19, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ]);

    #[test]
    fn display_reverses_bytes() {
        assert_eq!(
            GENESIS.to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn from_hex_roundtrip() {
        let parsed = Hash::from_hex(
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
        )
        .unwrap();
        assert_eq!(parsed, GENESIS);

        // Stripped leading zeros parse to the same hash.
        let stripped =
            Hash::from_hex("19d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f").unwrap();
        assert_eq!(stripped, GENESIS);

        assert_eq!(Hash::from_hex("").unwrap(), Hash::default());

        let one = Hash::from_hex("1").unwrap();
        let mut expected = [0u8; HASH_SIZE];
        expected[0] = 0x01;
        assert_eq!(one, Hash::new(expected));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        // 65 characters.
        assert!(Hash::from_hex(
            "01234567890123456789012345678901234567890123456789012345678912345"
        )
        .is_err());
        assert!(Hash::from_hex("abcdefg").is_err());
    }

    #[test]
    fn from_bytes_length_check() {
        assert!(Hash::from_bytes(&[0u8; 31]).is_err());
        assert!(Hash::from_bytes(&[0u8; 33]).is_err());
        assert!(Hash::from_bytes(&[0u8; 32]).is_ok());
    }

    #[test]
    fn serde_as_hex_string() {
        let json = serde_json::to_string(&GENESIS).unwrap();
        assert_eq!(
            json,
            r#""000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f""#
        );
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GENESIS);
    }

    #[test]
    fn double_hash_matches_sha256d() {
        let h = double_hash(b"hello");
        assert_eq!(h.as_bytes(), &crate::hash::sha256d(b"hello"));
    }
}

//! The script byte container.
//!
//! A [`Script`] wraps raw script bytes and provides construction from hex
//! or ASM, minimal-prefix push building, classification predicates for the
//! standard output templates, and hex/ASM rendering.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Parse a space separated ASM string. Tokens that name an opcode are
    /// emitted directly, anything else must be hex and becomes a push.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split(' ').filter(|t| !t.is_empty()) {
            match string_to_opcode(token) {
                Some(op) => script.append_opcodes(&[op])?,
                None => script.append_push_data_hex(token)?,
            }
        }
        Ok(script)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render the script as space separated ASM. Pushes appear as bare hex
    /// and an unconditional OP_RETURN tail as a single hex blob, so data
    /// carrier outputs render even when the tail is not well-framed.
    /// Malformed scripts render as an empty string.
    pub fn to_asm(&self) -> String {
        let Ok(chunks) = self.chunks() else {
            return String::new();
        };
        let mut parts = Vec::new();
        for chunk in &chunks {
            if chunk.op == OP_RETURN {
                parts.push(opcode_to_string(OP_RETURN).to_string());
                match &chunk.data {
                    Some(data) if !data.is_empty() => parts.push(hex::encode(data)),
                    _ => {}
                }
                continue;
            }
            let s = chunk.to_asm_string();
            if !s.is_empty() {
                parts.push(s);
            }
        }
        parts.join(" ")
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// <33 or 65 byte pubkey> OP_CHECKSIG
    pub fn is_p2pk(&self) -> bool {
        let Ok(parts) = self.chunks() else {
            return false;
        };
        if parts.len() != 2 || parts[1].op != OP_CHECKSIG {
            return false;
        }
        match parts[0].data.as_deref() {
            Some(key @ [0x04 | 0x06 | 0x07, ..]) => key.len() == 65,
            Some(key @ [0x02 | 0x03, ..]) => key.len() == 33,
            _ => false,
        }
    }

    /// OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// OP_RETURN or OP_FALSE OP_RETURN data carrier.
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN)
            || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// OP_N <pubkey>... OP_M OP_CHECKMULTISIG
    pub fn is_multisig_out(&self) -> bool {
        let Ok(parts) = self.chunks() else {
            return false;
        };
        if parts.len() < 3 || !is_small_int_op(parts[0].op) {
            return false;
        }
        for chunk in &parts[1..parts.len() - 2] {
            match &chunk.data {
                Some(d) if !d.is_empty() => {}
                _ => return false,
            }
        }
        is_small_int_op(parts[parts.len() - 2].op) && parts[parts.len() - 1].op == OP_CHECKMULTISIG
    }

    /// Extract the hash160 from a P2PKH locking script.
    pub fn public_key_hash(&self) -> Result<Vec<u8>, ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if self.0.len() <= 2 || self.0[0] != OP_DUP || self.0[1] != OP_HASH160 {
            return Err(ScriptError::NotP2PKH);
        }
        decode_script(&self.0[2..])?
            .first()
            .and_then(|chunk| chunk.data.clone())
            .ok_or(ScriptError::NotP2PKH)
    }

    /// Decode the script into chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Append a minimal-prefix data push.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append hex-decoded bytes as a data push.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str).map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes. Push opcodes are rejected, they belong in
    /// [`append_push_data`](Script::append_push_data).
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op).to_string()));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    pub fn equals(&self, other: &Script) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
    const P2PKH_ASM: &str =
        "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";

    #[test]
    fn hex_round_trip() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert!(Script::from_hex("").unwrap().is_empty());
        assert!(Script::from_hex("zz").is_err());
    }

    #[test]
    fn asm_round_trip() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(script.to_asm(), P2PKH_ASM);
        assert_eq!(Script::from_asm(P2PKH_ASM).unwrap().to_hex(), P2PKH_HEX);
        assert!(Script::from_asm("").unwrap().is_empty());
    }

    #[test]
    fn classification() {
        let p2pkh = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac").unwrap();
        let p2sh = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87").unwrap();
        let p2pk = Script::from_hex(
            "2102f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac",
        )
        .unwrap();
        let multisig = Script::from_hex("5201110122013353ae").unwrap();

        assert!(p2pkh.is_p2pkh());
        assert!(!p2sh.is_p2pkh());
        assert!(p2sh.is_p2sh());
        assert!(!p2pkh.is_p2sh());
        assert!(p2pk.is_p2pk());
        assert!(!p2pkh.is_p2pk());
        assert!(multisig.is_multisig_out());
        assert!(!p2pkh.is_multisig_out());
    }

    #[test]
    fn data_scripts() {
        let plain = Script::from_bytes(&[OP_RETURN, 0x04, 0x01, 0x02, 0x03, 0x04]);
        assert!(plain.is_data());

        let prefixed = Script::from_hex(
            "006a04ac1eed884d53027b2276657273696f6e223a22302e31222c22686569676874223a3634323436302c22707265764d696e65724964223a22303365393264336535633366376264393435646662663438653761393933393362316266623366313166333830616533306432383665376666326165633561323730227d",
        )
        .unwrap();
        assert!(prefixed.is_data());
        // The payload is not well-framed push data, it still must render.
        assert!(prefixed.to_asm().starts_with("OP_0 OP_RETURN 04ac1eed88"));

        let p2pkh = Script::from_hex(P2PKH_HEX).unwrap();
        assert!(!p2pkh.is_data());
    }

    #[test]
    fn public_key_hash_extraction() {
        let script = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        let pkh = script.public_key_hash().unwrap();
        assert_eq!(hex::encode(pkh), "04d03f746652cfcb6cb55119ab473a045137d265");

        assert!(Script::new().public_key_hash().is_err());
        assert!(Script::from_hex("76").unwrap().public_key_hash().is_err());
    }

    #[test]
    fn push_data_prefix_selection() {
        let mut small = Script::new();
        small.append_push_data(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(small.to_hex(), "050102030405");

        let mut medium = Script::new();
        medium.append_push_data(&[0xaa; 80]).unwrap();
        assert_eq!(&medium.to_hex()[..4], "4c50");

        let mut large = Script::new();
        large.append_push_data(&[0xbb; 256]).unwrap();
        assert_eq!(&large.to_hex()[..6], "4d0001");
    }

    #[test]
    fn append_opcodes_guards_pushes() {
        let mut script = Script::from_asm("OP_2 OP_2 OP_ADD").unwrap();
        script.append_opcodes(&[OP_EQUAL, OP_VERIFY]).unwrap();
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUAL OP_VERIFY");
        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
        assert!(script.append_opcodes(&[OP_DATA_5]).is_err());
    }

    #[test]
    fn equality() {
        let bytes = hex::decode("5201110122013353ae").unwrap();
        assert!(Script::from_bytes(&bytes).equals(&Script::from_bytes(&bytes)));
        let a = Script::from_hex(P2PKH_HEX).unwrap();
        let b = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        assert!(!a.equals(&b));
    }

    #[test]
    fn serde_as_hex() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY").unwrap();
        assert_eq!(serde_json::to_string(&script).unwrap(), r#""5252935488""#);

        let parsed: Script = serde_json::from_str(r#""5252935488""#).unwrap();
        assert_eq!(parsed.to_hex(), "5252935488");
        let empty: Script = serde_json::from_str(r#""""#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn display_and_debug() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(format!("{}", script), P2PKH_HEX);
        assert_eq!(format!("{:?}", script), format!("Script({})", P2PKH_HEX));
    }
}

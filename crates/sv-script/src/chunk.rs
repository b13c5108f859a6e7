//! Chunk-level script decoding.
//!
//! A chunk is one opcode together with the bytes it pushes, if any.
//! Decoding here is lenient about opcode semantics; it only cares about
//! framing, so malformed-but-well-framed scripts still decode.

use crate::opcodes::*;
use crate::ScriptError;

/// One parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes of 1 to 75 bytes this is the
    /// push length itself.
    pub op: u8,
    /// Pushed bytes when the chunk is a data push.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render the chunk for ASM output. Pushes become bare hex, other
    /// opcodes use their canonical name.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op).to_string()
    }
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8], ScriptError> {
    let end = pos.checked_add(n).ok_or(ScriptError::DataTooSmall)?;
    if end > bytes.len() {
        return Err(ScriptError::DataTooSmall);
    }
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}

/// Decode raw script bytes into chunks.
///
/// Direct pushes and OP_PUSHDATA1/2/4 carry their payload. An OP_RETURN
/// outside any conditional block swallows the remainder of the script as
/// its data.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut conditional_depth: i32 = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;

        let prefix_len = match op {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => {
                conditional_depth += 1;
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
            OP_ENDIF => {
                conditional_depth -= 1;
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
            OP_RETURN if conditional_depth <= 0 => {
                let data = bytes[pos..].to_vec();
                chunks.push(ScriptChunk { op, data: Some(data) });
                break;
            }
            0x01..=0x4b => 0,
            OP_PUSHDATA1 => 1,
            OP_PUSHDATA2 => 2,
            OP_PUSHDATA4 => 4,
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                continue;
            }
        };

        let data_len = if prefix_len == 0 {
            op as usize
        } else {
            let prefix = take(bytes, &mut pos, prefix_len)?;
            let mut len = 0usize;
            for (i, b) in prefix.iter().enumerate() {
                len |= (*b as usize) << (8 * i);
            }
            len
        };

        let data = take(bytes, &mut pos, data_len)?.to_vec();
        chunks.push(ScriptChunk { op, data: Some(data) });
    }

    Ok(chunks)
}

/// Push-opcode prefix for a payload of the given length.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Encode each payload in `parts` as its own push, concatenated.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut out = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let prefix = push_data_prefix(part.len()).map_err(|_| ScriptError::PartTooBig(i))?;
        out.extend_from_slice(&prefix);
        out.extend_from_slice(part);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_pushes() {
        let bytes = hex::decode("05000102030401ff02abcd").unwrap();
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].data.as_deref(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(chunks[1].data.as_deref(), Some(&[0xff][..]));
        assert_eq!(chunks[2].data.as_deref(), Some(&[0xab, 0xcd][..]));
    }

    #[test]
    fn decode_empty() {
        assert!(decode_script(&[]).unwrap().is_empty());
    }

    #[test]
    fn decode_multisig_descriptor() {
        // OP_2 <pushdata1 x2> OP_2 OP_CHECKMULTISIG
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let chunks = decode_script(&hex::decode(script_hex).unwrap()).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].op, OP_2);
        assert_eq!(chunks[4].op, OP_CHECKMULTISIG);
    }

    #[test]
    fn decode_op_return_swallows_tail() {
        let bytes = hex::decode("516aabcdef").unwrap();
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].op, OP_RETURN);
        assert_eq!(chunks[1].data.as_deref(), Some(&[0xab, 0xcd, 0xef][..]));
    }

    #[test]
    fn decode_op_return_inside_conditional() {
        // OP_IF OP_RETURN OP_ENDIF stays three chunks.
        let chunks = decode_script(&[OP_IF, OP_RETURN, OP_ENDIF]).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].data.is_none());
    }

    #[test]
    fn truncated_pushes_error() {
        for bad in [
            hex::decode("05000000").unwrap(),
            vec![OP_PUSHDATA1],
            vec![OP_PUSHDATA1, 5, 0, 0],
            vec![OP_PUSHDATA2, 1],
            vec![OP_PUSHDATA4, 1, 0],
        ] {
            assert!(decode_script(&bad).is_err(), "{:02x?}", bad);
        }
    }

    #[test]
    fn pushdata1_valid() {
        let data = b"testing";
        let mut bytes = vec![OP_PUSHDATA1, data.len() as u8];
        bytes.extend_from_slice(data);
        let chunks = decode_script(&bytes).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].op, OP_PUSHDATA1);
        assert_eq!(chunks[0].data.as_deref(), Some(&data[..]));
    }

    #[test]
    fn prefix_boundaries() {
        assert_eq!(push_data_prefix(20).unwrap(), vec![20u8]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![75u8]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).unwrap(), vec![OP_PUSHDATA1, 255]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(push_data_prefix(65535).unwrap(), vec![OP_PUSHDATA2, 0xff, 0xff]);
        assert_eq!(
            push_data_prefix(65536).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn encode_multiple_parts() {
        let parts: Vec<&[u8]> = vec![b"hello", b"world"];
        let encoded = encode_push_datas(&parts).unwrap();
        assert_eq!(hex::encode(encoded), "0568656c6c6f05776f726c64");
    }

    #[test]
    fn asm_rendering() {
        let push = ScriptChunk { op: OP_DATA_20, data: Some(vec![0xab; 20]) };
        assert_eq!(push.to_asm_string(), "ab".repeat(20));
        let op = ScriptChunk { op: OP_DUP, data: None };
        assert_eq!(op.to_asm_string(), "OP_DUP");
    }
}

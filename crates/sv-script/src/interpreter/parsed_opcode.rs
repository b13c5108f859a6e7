//! Parsed instruction form of a script and the script parser.

use super::error::{InterpreterError, InterpreterErrorCode};
use crate::opcodes::*;
use crate::Script;

/// One instruction: an opcode byte plus the data it pushes, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    pub opcode: u8,
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// OP_2MUL and OP_2DIV fail scripts even inside unexecuted branches.
    pub fn is_disabled(&self) -> bool {
        matches!(self.opcode, OP_2MUL | OP_2DIV)
    }

    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(
            self.opcode,
            OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIF | OP_VERNOTIF
        )
    }

    /// Opcodes that cannot run without a transaction context.
    pub fn requires_tx(&self) -> bool {
        matches!(
            self.opcode,
            OP_CHECKSIG | OP_CHECKSIGVERIFY | OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY
        )
    }

    /// Enforce that the payload could not be pushed by a shorter opcode.
    pub fn enforce_minimum_data_push(&self) -> Result<(), InterpreterError> {
        let len = self.data.len();
        let minimal = |msg: String| {
            Err(InterpreterError::new(InterpreterErrorCode::MinimalData, msg))
        };

        if len == 0 && self.opcode != OP_0 {
            return minimal(format!(
                "zero length data pushed with {} instead of OP_0",
                self.name()
            ));
        }
        if len == 1 && (1..=16).contains(&self.data[0]) && self.opcode != OP_1 + self.data[0] - 1 {
            return minimal(format!(
                "value {} pushed with {} instead of OP_{}",
                self.data[0],
                self.name(),
                self.data[0]
            ));
        }
        if len == 1 && self.data[0] == 0x81 && self.opcode != OP_1NEGATE {
            return minimal(format!(
                "value -1 pushed with {} instead of OP_1NEGATE",
                self.name()
            ));
        }
        if len <= 75 {
            if self.opcode as usize != len {
                return minimal(format!(
                    "{} byte push used {} instead of OP_DATA_{}",
                    len,
                    self.name(),
                    len
                ));
            }
        } else if len <= 255 {
            if self.opcode != OP_PUSHDATA1 {
                return minimal(format!(
                    "{} byte push used {} instead of OP_PUSHDATA1",
                    len,
                    self.name()
                ));
            }
        } else if len <= 65535 && self.opcode != OP_PUSHDATA2 {
            return minimal(format!(
                "{} byte push used {} instead of OP_PUSHDATA2",
                len,
                self.name()
            ));
        }
        Ok(())
    }

    /// True when the push already uses the smallest opcode for its payload.
    /// Non-push opcodes are trivially canonical.
    pub fn canonical_push(&self) -> bool {
        let len = self.data.len();
        if self.opcode > OP_16 {
            return true;
        }
        if self.opcode > OP_0 && self.opcode < OP_PUSHDATA1 && len == 1 && self.data[0] <= 16 {
            return false;
        }
        if self.opcode == OP_PUSHDATA1 && len < OP_PUSHDATA1 as usize {
            return false;
        }
        if self.opcode == OP_PUSHDATA2 && len <= 0xff {
            return false;
        }
        if self.opcode == OP_PUSHDATA4 && len <= 0xffff {
            return false;
        }
        true
    }

    /// Reserialize this instruction to script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.opcode];
        match self.opcode {
            OP_PUSHDATA1 => {
                out.push(self.data.len() as u8);
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA2 => {
                out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA4 => {
                out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => {
                out.extend_from_slice(&self.data);
            }
            // OP_RETURN may carry the unparsed remainder of the script.
            OP_RETURN => out.extend_from_slice(&self.data),
            _ => {}
        }
        out
    }
}

/// A script in parsed instruction form.
pub type ParsedScript = Vec<ParsedOpcode>;

/// True when every instruction is a push.
pub fn is_push_only(script: &ParsedScript) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Strip canonical pushes whose payload contains the given data. Applied to
/// signatures in pre-genesis subscripts.
pub fn remove_opcode_by_data(script: &ParsedScript, data: &[u8]) -> ParsedScript {
    // An empty needle matches nothing; it also cannot form a window.
    if data.is_empty() {
        return script.clone();
    }
    script
        .iter()
        .filter(|pop| !pop.canonical_push() || !pop.data.windows(data.len()).any(|w| w == data))
        .cloned()
        .collect()
}

/// Strip every occurrence of the given opcode.
pub fn remove_opcode(script: &ParsedScript, opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

/// Reserialize a parsed script. Decompiling a well-formed program and
/// unparsing it again is the identity.
pub fn unparse(pscript: &ParsedScript) -> Script {
    let mut bytes = Vec::new();
    for pop in pscript {
        bytes.extend_from_slice(&pop.to_bytes());
    }
    Script::from_bytes(&bytes)
}

fn truncated() -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::MalformedPush, "script truncated")
}

/// Parse script bytes into instructions.
///
/// `error_on_checksig` rejects opcodes needing a transaction context, for
/// callers that execute without one. An OP_RETURN at conditional depth zero
/// consumes the remainder of the script as unparsed data.
pub fn parse_script(
    script: &Script,
    error_on_checksig: bool,
) -> Result<ParsedScript, InterpreterError> {
    let scr = script.to_bytes();
    let mut parsed = Vec::new();
    let mut conditional_depth = 0i32;
    let mut i = 0;

    while i < scr.len() {
        let opcode = scr[i];
        let mut pop = ParsedOpcode {
            opcode,
            data: Vec::new(),
        };

        if error_on_checksig && pop.requires_tx() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "a transaction context must be supplied for checksig",
            ));
        }

        match opcode {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => conditional_depth += 1,
            OP_ENDIF => conditional_depth = (conditional_depth - 1).max(0),
            OP_RETURN if conditional_depth == 0 => {
                pop.data = scr[i + 1..].to_vec();
                parsed.push(pop);
                return Ok(parsed);
            }
            _ => {}
        }

        // Number of length-prefix bytes following the opcode, if any.
        let prefix_len = match opcode {
            OP_PUSHDATA1 => 1,
            OP_PUSHDATA2 => 2,
            OP_PUSHDATA4 => 4,
            _ => 0,
        };

        if prefix_len > 0 {
            if i + prefix_len >= scr.len() {
                return Err(truncated());
            }
            let mut data_len = 0usize;
            for k in 0..prefix_len {
                data_len |= (scr[i + 1 + k] as usize) << (8 * k);
            }
            let start = i + 1 + prefix_len;
            if start + data_len > scr.len() {
                return Err(truncated());
            }
            pop.data = scr[start..start + data_len].to_vec();
            i = start + data_len;
        } else if (OP_DATA_1..=OP_DATA_75).contains(&opcode) {
            let data_len = opcode as usize;
            if i + 1 + data_len > scr.len() {
                return Err(truncated());
            }
            pop.data = scr[i + 1..i + 1 + data_len].to_vec();
            i += 1 + data_len;
        } else {
            i += 1;
        }

        parsed.push(pop);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_unparse_is_identity() {
        let cases = [
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac",
            "51",
            "005152",
            "4c020102",
            "4d0200aabb",
        ];
        for hex_str in cases {
            let script = Script::from_hex(hex_str).unwrap();
            let parsed = parse_script(&script, false).unwrap();
            assert_eq!(unparse(&parsed).to_hex(), hex_str);
        }
    }

    #[test]
    fn op_return_consumes_remainder() {
        let script = Script::from_hex("006a0102ff").unwrap();
        let parsed = parse_script(&script, false).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].opcode, OP_RETURN);
        assert_eq!(parsed[1].data, vec![0x01, 0x02, 0xff]);
        assert_eq!(unparse(&parsed).to_hex(), "006a0102ff");
    }

    #[test]
    fn op_return_inside_conditional_is_an_op() {
        // OP_IF OP_RETURN OP_ENDIF parses as three instructions.
        let script = Script::from_bytes(&[OP_IF, OP_RETURN, OP_ENDIF]);
        let parsed = parse_script(&script, false).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[1].data.is_empty());
    }

    #[test]
    fn truncated_pushes_fail() {
        for bytes in [
            vec![0x05, 0x01, 0x02],
            vec![OP_PUSHDATA1],
            vec![OP_PUSHDATA1, 0x04, 0x00],
            vec![OP_PUSHDATA2, 0x02, 0x00, 0xaa],
            vec![OP_PUSHDATA4, 0x01, 0x00, 0x00],
        ] {
            let script = Script::from_bytes(&bytes);
            let err = parse_script(&script, false).unwrap_err();
            assert_eq!(err.code, InterpreterErrorCode::MalformedPush);
        }
    }

    #[test]
    fn checksig_requires_context() {
        let script = Script::from_bytes(&[OP_CHECKSIG]);
        let err = parse_script(&script, true).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::InvalidParams);
        assert!(parse_script(&script, false).is_ok());
    }

    #[test]
    fn remove_by_data_matches_payload_windows() {
        // <aabb> OP_DUP <ccdd>
        let script = Script::from_hex("02aabb7602ccdd").unwrap();
        let parsed = parse_script(&script, false).unwrap();

        let stripped = remove_opcode_by_data(&parsed, &[0xcc, 0xdd]);
        assert_eq!(unparse(&stripped).to_hex(), "02aabb76");

        // A needle absent from every push leaves the script alone, and so
        // does an empty one.
        assert_eq!(remove_opcode_by_data(&parsed, &[0x99]).len(), 3);
        assert_eq!(remove_opcode_by_data(&parsed, &[]).len(), 3);
    }

    #[test]
    fn minimal_push_enforcement() {
        // 0x01 pushed with OP_DATA_1 is minimal.
        let pop = ParsedOpcode { opcode: 0x01, data: vec![0x21] };
        assert!(pop.enforce_minimum_data_push().is_ok());

        // The value 5 must use OP_5.
        let pop = ParsedOpcode { opcode: 0x01, data: vec![0x05] };
        assert!(pop.enforce_minimum_data_push().is_err());

        // A 4-byte payload must use OP_DATA_4, not OP_PUSHDATA1.
        let pop = ParsedOpcode { opcode: OP_PUSHDATA1, data: vec![1, 2, 3, 4] };
        assert!(pop.enforce_minimum_data_push().is_err());
        assert!(!pop.canonical_push());
    }
}

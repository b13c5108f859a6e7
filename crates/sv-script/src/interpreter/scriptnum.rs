//! Script numbers.
//!
//! Numbers on the stack are little-endian sign-magnitude byte strings: the
//! empty string is zero and the high bit of the last byte carries the sign.
//! Arithmetic is performed over arbitrary-precision integers so post-genesis
//! scripts may work with values far beyond 32 bits; the `max_num_length`
//! carried by the caller bounds what may be reinterpreted as a number.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// An arbitrary-precision script number.
#[derive(Debug, Clone)]
pub struct ScriptNumber {
    pub val: BigInt,
    /// Post-genesis rules allow wide serializations.
    pub after_genesis: bool,
}

impl ScriptNumber {
    pub fn new(val: i64, after_genesis: bool) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
            after_genesis,
        }
    }

    /// Decode a byte string into a number.
    ///
    /// Fails with `InvalidNumberRange` when the encoding is wider than
    /// `max_num_length` and with `MinimalData` when `require_minimal` is set
    /// and a shorter encoding exists.
    pub fn from_bytes(
        bytes: &[u8],
        max_num_length: usize,
        require_minimal: bool,
        after_genesis: bool,
    ) -> Result<Self, InterpreterError> {
        if bytes.len() > max_num_length {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!(
                    "numeric value of {} bytes exceeds the max allowed of {}",
                    bytes.len(),
                    max_num_length
                ),
            ));
        }

        if require_minimal {
            check_minimal_data_encoding(bytes)?;
        }

        let Some((&msb, rest)) = bytes.split_last() else {
            return Ok(ScriptNumber {
                val: BigInt::zero(),
                after_genesis,
            });
        };

        let mut val = BigInt::zero();
        for (i, &b) in rest.iter().enumerate() {
            val |= BigInt::from(b) << (8 * i);
        }
        // High bit of the last byte is the sign.
        val |= BigInt::from(msb & 0x7f) << (8 * rest.len());
        if msb & 0x80 != 0 {
            val = -val;
        }

        Ok(ScriptNumber { val, after_genesis })
    }

    /// Serialize to the little-endian sign-magnitude form. Zero is empty.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val.is_zero() {
            return vec![];
        }

        let negative = self.val.is_negative();
        let (_, mut out) = self.val.abs().to_bytes_le();

        // The most significant byte must leave the sign bit free.
        if out.last().is_some_and(|b| b & 0x80 != 0) {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = out.len() - 1;
            out[last] |= 0x80;
        }

        out
    }

    // Mutating arithmetic; each returns self so calls can be chained.

    pub fn add(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val + &other.val;
        self
    }

    pub fn sub(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val - &other.val;
        self
    }

    pub fn mul(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val * &other.val;
        self
    }

    /// Integer division truncating toward zero.
    pub fn div(&mut self, other: &ScriptNumber) -> &mut Self {
        use num_integer::Integer;
        let (q, _) = self.val.div_rem(&other.val);
        self.val = q;
        self
    }

    /// Truncated remainder; the result takes the sign of the dividend.
    pub fn modulo(&mut self, other: &ScriptNumber) -> &mut Self {
        use num_integer::Integer;
        let (_, r) = self.val.div_rem(&other.val);
        self.val = r;
        self
    }

    pub fn incr(&mut self) -> &mut Self {
        self.val = &self.val + BigInt::one();
        self
    }

    pub fn decr(&mut self) -> &mut Self {
        self.val = &self.val - BigInt::one();
        self
    }

    pub fn neg(&mut self) -> &mut Self {
        self.val = -std::mem::take(&mut self.val);
        self
    }

    pub fn abs(&mut self) -> &mut Self {
        if self.val.is_negative() {
            self.neg();
        }
        self
    }

    pub fn set(&mut self, i: i64) -> &mut Self {
        self.val = BigInt::from(i);
        self
    }

    // Comparisons

    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.val < other.val
    }

    pub fn less_than_int(&self, i: i64) -> bool {
        self.val < BigInt::from(i)
    }

    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val <= other.val
    }

    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.val > other.val
    }

    pub fn greater_than_int(&self, i: i64) -> bool {
        self.val > BigInt::from(i)
    }

    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val >= other.val
    }

    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.val == other.val
    }

    pub fn equal_int(&self, i: i64) -> bool {
        self.val == BigInt::from(i)
    }

    // Conversions

    /// Convert to i32, saturating at the bounds.
    pub fn to_i32(&self) -> i32 {
        match self.val.to_i32() {
            Some(v) => v,
            None if self.val.is_negative() => i32::MIN,
            None => i32::MAX,
        }
    }

    /// Convert to i64, saturating at the bounds.
    pub fn to_i64(&self) -> i64 {
        match self.val.to_i64() {
            Some(v) => v,
            None if self.val.is_negative() => i64::MIN,
            None => i64::MAX,
        }
    }

    /// Convert to i64, or 0 when the value does not fit.
    pub fn to_int(&self) -> i64 {
        self.val.to_i64().unwrap_or(0)
    }
}

/// Re-encode a byte string as the shortest number encoding for the same
/// value. Used by OP_BIN2NUM.
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    let Some(&last) = data.last() else {
        return vec![];
    };

    // Already minimal unless the top byte is a bare sign byte.
    if last & 0x7f != 0 {
        return data.to_vec();
    }
    if data.len() == 1 {
        return vec![];
    }
    if data[data.len() - 2] & 0x80 != 0 {
        return data.to_vec();
    }

    let mut data = data.to_vec();
    let mut i = data.len() - 1;
    while i > 0 {
        if data[i - 1] != 0 {
            if data[i - 1] & 0x80 != 0 {
                // The preceding byte needs its high bit free, so keep one
                // extra byte for the sign.
                data[i] = last;
                return data[..=i].to_vec();
            }
            data[i - 1] |= last;
            return data[..i].to_vec();
        }
        i -= 1;
    }

    vec![]
}

/// Reject byte strings that are not the shortest encoding of their value.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    let Some(&last) = v.last() else {
        return Ok(());
    };

    if last & 0x7f == 0 && (v.len() == 1 || v[v.len() - 2] & 0x80 == 0) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!("numeric value {:02x?} is not minimally encoded", v),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn serialization_vectors() {
        let tests: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![]),
            (1, h("01")),
            (-1, h("81")),
            (127, h("7f")),
            (-127, h("ff")),
            (128, h("8000")),
            (-128, h("8080")),
            (129, h("8100")),
            (-129, h("8180")),
            (256, h("0001")),
            (-256, h("0081")),
            (32767, h("ff7f")),
            (-32767, h("ffff")),
            (32768, h("008000")),
            (-32768, h("008080")),
            (65535, h("ffff00")),
            (-65535, h("ffff80")),
            (524288, h("000008")),
            (-524288, h("000088")),
            (7340032, h("000070")),
            (-7340032, h("0000f0")),
            (8388608, h("00008000")),
            (-8388608, h("00008080")),
            (2147483647, h("ffffff7f")),
            (-2147483647, h("ffffffff")),
            // Wider-than-32-bit results remain serializable.
            (2147483648, h("0000008000")),
            (-2147483648, h("0000008080")),
            (4294967295, h("ffffffff00")),
            (-4294967295, h("ffffffff80")),
            (4294967296, h("0000000001")),
            (-4294967296, h("0000000081")),
            (281474976710655, h("ffffffffffff00")),
            (-281474976710655, h("ffffffffffff80")),
            (72057594037927935, h("ffffffffffffff00")),
            (-72057594037927935, h("ffffffffffffff80")),
            (9223372036854775807, h("ffffffffffffff7f")),
            (-9223372036854775807, h("ffffffffffffffff")),
        ];

        for (num, expected) in &tests {
            let got = ScriptNumber::new(*num, true).to_bytes();
            assert_eq!(&got, expected, "serialize {}", num);
            let back = ScriptNumber::from_bytes(expected, 9, true, true).unwrap();
            assert_eq!(back.to_int(), *num, "decode {:02x?}", expected);
        }
    }

    #[test]
    fn negate_sets_sign_bit() {
        let mut n = ScriptNumber::from_bytes(&h("05"), 4, true, false).unwrap();
        n.neg();
        assert_eq!(n.to_bytes(), h("85"));
    }

    #[test]
    fn decode_limits_and_minimality() {
        struct Test {
            serialized: Vec<u8>,
            num: i64,
            num_len: usize,
            minimal: bool,
            expect_err: bool,
        }

        let tests = vec![
            // Negative zero is not minimal
            Test { serialized: h("80"), num: 0, num_len: 4, minimal: true, expect_err: true },
            Test { serialized: vec![], num: 0, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("01"), num: 1, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("81"), num: -1, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("7f"), num: 127, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("ff"), num: -127, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("8000"), num: 128, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("8080"), num: -128, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("0001"), num: 256, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("0081"), num: -256, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("ffffff7f"), num: 2147483647, num_len: 4, minimal: true, expect_err: false },
            Test { serialized: h("ffffffff"), num: -2147483647, num_len: 4, minimal: true, expect_err: false },
            // Five-byte encodings need a five-byte allowance
            Test { serialized: h("ffffffff7f"), num: 549755813887, num_len: 5, minimal: true, expect_err: false },
            Test { serialized: h("ffffffffff"), num: -549755813887, num_len: 5, minimal: true, expect_err: false },
            Test { serialized: h("0000008000"), num: 0, num_len: 4, minimal: true, expect_err: true },
            // Non-minimal encodings
            Test { serialized: h("00"), num: 0, num_len: 4, minimal: true, expect_err: true },
            Test { serialized: h("0100"), num: 0, num_len: 4, minimal: true, expect_err: true },
            Test { serialized: h("00"), num: 0, num_len: 4, minimal: false, expect_err: false },
            Test { serialized: h("0100"), num: 1, num_len: 4, minimal: false, expect_err: false },
        ];

        for t in &tests {
            let result = ScriptNumber::from_bytes(&t.serialized, t.num_len, t.minimal, true);
            match result {
                Ok(sn) => {
                    assert!(!t.expect_err, "{:02x?}: expected error", t.serialized);
                    assert_eq!(sn.to_int(), t.num, "{:02x?}", t.serialized);
                }
                Err(_) => assert!(t.expect_err, "{:02x?}: unexpected error", t.serialized),
            }
        }
    }

    #[test]
    fn truncating_division() {
        let cases: Vec<(i64, i64, i64, i64)> = vec![
            (7, 2, 3, 1),
            (-7, 2, -3, -1),
            (7, -2, -3, 1),
            (-7, -2, 3, -1),
        ];
        for (a, b, q, r) in cases {
            let rhs = ScriptNumber::new(b, true);
            let mut lhs = ScriptNumber::new(a, true);
            lhs.div(&rhs);
            assert_eq!(lhs.to_int(), q, "{} / {}", a, b);
            let mut lhs = ScriptNumber::new(a, true);
            lhs.modulo(&rhs);
            assert_eq!(lhs.to_int(), r, "{} % {}", a, b);
        }
    }

    #[test]
    fn saturating_int32() {
        let tests: Vec<(i64, i32)> = vec![
            (0, 0),
            (1, 1),
            (-1, -1),
            (2147483647, 2147483647),
            (-2147483648, -2147483648),
            (2147483648, 2147483647),
            (-2147483649, -2147483648),
            (9223372036854775807, 2147483647),
            (-9223372036854775808, -2147483648),
        ];
        for (input, want) in &tests {
            assert_eq!(ScriptNumber::new(*input, false).to_i32(), *want);
        }
    }

    #[test]
    fn minimal_reencoding() {
        assert_eq!(minimally_encode(&[]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x7f]), vec![0x7f]);
        assert_eq!(minimally_encode(&[0x00]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x80]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x01, 0x00]), vec![0x01]);
        assert_eq!(minimally_encode(&[0x01, 0x80]), vec![0x81]);
        assert_eq!(minimally_encode(&[0x80, 0x00]), vec![0x80, 0x00]);
        assert_eq!(minimally_encode(&[0x80, 0x00, 0x80]), vec![0x80, 0x80]);
    }
}

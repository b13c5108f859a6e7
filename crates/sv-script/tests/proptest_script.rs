use proptest::prelude::*;

use sv_script::interpreter::{ScriptNumber, Stack, ELEMENT_OVERHEAD};
use sv_script::Script;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_number_encode_decode_roundtrip(val in -0x7fffffffi64..=0x7fffffff) {
        let sn = ScriptNumber::new(val, false);
        let bytes = sn.to_bytes();
        let sn2 = ScriptNumber::from_bytes(&bytes, 4, false, false).unwrap();
        prop_assert_eq!(sn.val, sn2.val);
    }

    #[test]
    fn script_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let script = Script::from_bytes(&data);
        prop_assert_eq!(&data[..], script.to_bytes());
    }

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        let script2 = Script::from_hex(&script.to_hex()).unwrap();
        prop_assert_eq!(script.to_bytes(), script2.to_bytes());
    }

    #[test]
    fn stack_footprint_matches_contents(
        elems in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32),
    ) {
        let mut stack = Stack::new(u64::MAX, 4, false, false);
        for e in &elems {
            stack.push(e.clone()).unwrap();
        }
        let expected: u64 = elems
            .iter()
            .map(|e| e.len() as u64 + ELEMENT_OVERHEAD)
            .sum();
        prop_assert_eq!(stack.combined_size(), expected);
        for _ in 0..elems.len() {
            stack.pop().unwrap();
        }
        prop_assert_eq!(stack.combined_size(), 0);
    }
}

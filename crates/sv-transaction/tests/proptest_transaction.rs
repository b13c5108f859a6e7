use proptest::prelude::*;

use sv_script::Script;
use sv_transaction::{sighash, Transaction, TransactionInput, TransactionOutput};

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    let arb_input = (
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
    )
        .prop_map(|(hash, idx, script_bytes, seq)| {
            let mut input = TransactionInput::new();
            input.source_txid = hash;
            input.source_tx_out_index = idx;
            input.unlocking_script = Some(Script::from_bytes(&script_bytes));
            input.sequence_number = seq;
            input
        });

    let arb_output = (any::<u64>(), prop::collection::vec(any::<u8>(), 0..64)).prop_map(
        |(satoshis, script_bytes)| {
            let mut output = TransactionOutput::new();
            output.satoshis = satoshis;
            output.locking_script = Script::from_bytes(&script_bytes);
            output
        },
    );

    (
        any::<u32>(),
        prop::collection::vec(arb_input, 1..4),
        prop::collection::vec(arb_output, 1..4),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, locktime)| {
            let mut tx = Transaction::new();
            tx.version = version;
            tx.lock_time = locktime;
            for i in inputs {
                tx.add_input(i);
            }
            for o in outputs {
                tx.add_output(o);
            }
            tx
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transaction_serialize_deserialize_roundtrip(tx in arb_transaction()) {
        let bytes = tx.to_bytes();
        let tx2 = Transaction::from_bytes(&bytes).unwrap();
        prop_assert_eq!(bytes, tx2.to_bytes());
    }

    #[test]
    fn transaction_hex_roundtrip(tx in arb_transaction()) {
        let tx2 = Transaction::from_hex(&tx.to_hex()).unwrap();
        prop_assert_eq!(tx.to_hex(), tx2.to_hex());
    }

    #[test]
    fn forkid_digest_is_deterministic(
        tx in arb_transaction(),
        satoshis in any::<u64>(),
        script in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let a = sighash::signature_hash(&tx, 0, &script, sighash::SIGHASH_ALL_FORKID, satoshis).unwrap();
        let b = sighash::signature_hash(&tx, 0, &script, sighash::SIGHASH_ALL_FORKID, satoshis).unwrap();
        prop_assert_eq!(a, b);
    }
}

use proptest::prelude::*;

use sv_primitives::chainhash::Hash;
use sv_primitives::ec::{PrivateKey, PublicKey};
use sv_primitives::hash::sha256;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn private_key_round_trips_through_hex(seed in prop::array::uniform32(any::<u8>())) {
        // Not all 32-byte arrays are valid keys (must be nonzero and below
        // the curve order).
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let pk2 = PrivateKey::from_hex(&pk.to_hex()).unwrap();
            prop_assert_eq!(pk.to_bytes(), pk2.to_bytes());

            let pub_key = pk.pub_key();
            let pub_key2 = PublicKey::from_bytes(&pub_key.to_compressed()).unwrap();
            prop_assert_eq!(pub_key.to_compressed(), pub_key2.to_compressed());
        }
    }

    #[test]
    fn ecdsa_sign_verify_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = pk.sign(&hash).unwrap();
            prop_assert!(pk.pub_key().verify(&hash, &sig));
        }
    }

    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        let hash2 = Hash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(hash.as_bytes(), hash2.as_bytes());
    }
}

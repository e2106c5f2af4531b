//! Cross-module properties of the envelope protocol

use omniverse_core::{
    canonical_bytes_from_blob, keccak256, verify, Fungible, Initiator, KeyPair, OpcodeTable,
    PayloadKind, SecretKey, TransactionEnvelope, UnsignedEnvelope,
};
use proptest::prelude::*;

const PALLET: OpcodeTable = OpcodeTable::new("pallet", Some(0), Some(1), Some(2));

fn kind_strategy() -> impl Strategy<Value = PayloadKind> {
    prop_oneof![
        Just(PayloadKind::Transfer),
        Just(PayloadKind::Mint),
        Just(PayloadKind::Burn),
    ]
}

#[test]
fn test_reference_envelope_is_137_bytes_and_verifies() {
    let kp = KeyPair::generate();
    let unsigned = UnsignedEnvelope::new(
        1,
        1,
        Initiator::token("TKN1"),
        kp.public,
        Fungible::new(PayloadKind::Transfer, vec![0u8; 32], 500),
    );
    let bytes = unsigned.signing_bytes(&PALLET).unwrap();
    assert_eq!(bytes.len(), 137);

    let envelope = unsigned.sign(&kp.secret, &PALLET).unwrap();
    assert_eq!(envelope.hash(), &keccak256(&bytes));
    assert!(verify(&kp.public, envelope.hash(), envelope.signature()).is_ok());
}

#[test]
fn test_blob_holder_reproduces_signed_digest() {
    let kp = KeyPair::generate();
    let envelope = UnsignedEnvelope::new(
        9,
        3,
        Initiator::token("TKN1"),
        kp.public,
        Fungible::new(PayloadKind::Mint, kp.public.to_vec(), 77),
    )
    .sign(&kp.secret, &PALLET)
    .unwrap();

    let blob = envelope.payload_blob(&PALLET).unwrap();
    let bytes = canonical_bytes_from_blob(9, 3, b"TKN1", &kp.public, &blob, &PALLET).unwrap();
    assert_eq!(&keccak256(&bytes), envelope.hash());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_payload_roundtrip(
        kind in kind_strategy(),
        ex_data in proptest::collection::vec(any::<u8>(), 0..300),
        amount in any::<u128>(),
    ) {
        let payload = Fungible::new(kind, ex_data, amount);
        let blob = payload.encode(&PALLET).unwrap();
        let decoded = Fungible::decode(&blob, &PALLET).unwrap();
        prop_assert_eq!(&decoded, &payload);
        prop_assert_eq!(decoded.encode(&PALLET).unwrap(), blob);
    }

    #[test]
    fn prop_signed_envelope_is_deterministic(
        seed in proptest::array::uniform32(1u8..=255u8),
        nonce in any::<u128>(),
        chain_id in any::<u32>(),
        amount in any::<u128>(),
    ) {
        let secret = SecretKey::from_bytes(&seed).unwrap();
        let build = || UnsignedEnvelope::new(
            nonce,
            chain_id,
            Initiator::token("TKN"),
            secret.public_key(),
            Fungible::new(PayloadKind::Transfer, vec![0xab; 32], amount),
        );
        let a = build().sign(&secret, &PALLET).unwrap();
        let b = build().sign(&secret, &PALLET).unwrap();
        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.signature(), b.signature());

        let rebuilt = TransactionEnvelope::from_parts(build(), *a.signature(), &PALLET).unwrap();
        prop_assert_eq!(rebuilt, a);
    }
}

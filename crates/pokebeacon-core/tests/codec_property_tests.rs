//! Property-based tests for the payload codec laws

use pokebeacon_core::{DecodeError, PayloadCodec, PROTOCOL_PREFIX};
use proptest::prelude::*;

/// Names made only of single-byte-representable characters, not all blank
fn arb_single_byte_name() -> impl Strategy<Value = String> {
    prop::collection::vec(0u8..=255u8, 1..24)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect::<String>())
        .prop_filter("must not be blank", |name| !name.trim().is_empty())
}

fn arb_blank_name() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[ \t\r\n]{0,8}").unwrap()
}

proptest! {
    /// Property: decode(encode(N)) == N for single-byte names
    #[test]
    fn round_trip_single_byte_names(name in arb_single_byte_name()) {
        let codec = PayloadCodec::default();
        let bytes = codec.encode(&name).expect("non-blank names encode");
        prop_assert_eq!(codec.decode(&bytes).expect("encoded bytes decode"), name);
    }

    /// Property: blank names never encode
    #[test]
    fn blank_names_are_empty_payloads(name in arb_blank_name()) {
        let codec = PayloadCodec::default();
        prop_assert_eq!(codec.encode(&name), Err(DecodeError::EmptyPayload));
    }

    /// Property: bytes without the prefix never decode
    #[test]
    fn unprefixed_bytes_are_malformed(bytes in prop::collection::vec(any::<u8>(), 0..40)) {
        prop_assume!(!bytes.starts_with(PROTOCOL_PREFIX.as_bytes()));
        let codec = PayloadCodec::default();
        let is_malformed = matches!(
            codec.decode(&bytes),
            Err(DecodeError::MalformedPayload { .. })
        );
        prop_assert!(is_malformed);
    }

    /// Property: both channels of an encoded advertisement carry the same payload
    #[test]
    fn channels_agree(name in arb_single_byte_name()) {
        let codec = PayloadCodec::default().with_company_id(Some(0xFFFF));
        let encoded = codec.encode_advertisement(&name).expect("non-blank names encode");
        let data = encoded.manufacturer_data.expect("company id configured");

        let from_name = codec.decode_local_name(&encoded.local_name).expect("name decodes");
        let from_data = codec.decode_manufacturer_data(&data.data).expect("data decodes");
        prop_assert_eq!(&from_name, &from_data);
        prop_assert_eq!(from_name, name);
    }
}

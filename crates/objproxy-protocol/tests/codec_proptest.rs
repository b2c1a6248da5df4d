use objproxy_protocol::{
    encode_frame, read_frame, CatRequest, MessageType, ProtocolError, Request, MAX_FRAME_LEN,
};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(fut)
}

proptest! {
    #[test]
    fn cat_round_trip_recovers_name(name in "[^\\x00]{0,256}") {
        let bytes = CatRequest::new(name.clone()).encode();
        let frame = block_on(read_frame(&mut bytes.as_slice())).unwrap();

        prop_assert_eq!(frame.message_type(), Some(MessageType::Cat));
        prop_assert_eq!(Request::from_frame(&frame), Request::Cat(CatRequest::new(name)));
    }

    #[test]
    fn any_prefix_of_a_frame_is_truncated(name in "[a-z/]{1,64}", cut in 0usize..1000) {
        let bytes = CatRequest::new(name).encode();
        let cut = cut % bytes.len();
        let result = block_on(read_frame(&mut &bytes[..cut]));

        let is_truncated = matches!(result, Err(ProtocolError::Truncated { .. }));
        prop_assert!(is_truncated);
    }

    #[test]
    fn oversized_length_is_rejected(extra in 1u64..u64::MAX - MAX_FRAME_LEN) {
        let bytes = (MAX_FRAME_LEN + extra).to_be_bytes();
        let result = block_on(read_frame(&mut &bytes[..]));

        let is_too_large = matches!(result, Err(ProtocolError::TooLarge { .. }));
        prop_assert!(is_too_large);
    }

    #[test]
    fn unknown_tags_never_map_to_cat(tag in any::<u8>().prop_filter("not cat", |t| *t != 42)) {
        let bytes = encode_frame(tag, b"x\0");
        let frame = block_on(read_frame(&mut bytes.as_slice())).unwrap();

        prop_assert_eq!(Request::from_frame(&frame), Request::Unsupported(tag));
    }
}

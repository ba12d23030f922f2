// tests/property/frame_test.rs

//! Property-based tests for the frame codec's handling of arbitrary byte splits.

use bytes::BytesMut;
use chatrelay::core::protocol::{FrameCodec, MessageFrame, MessageType};
use proptest::prelude::*;
use strum::IntoEnumIterator;
use tokio_util::codec::{Decoder, Encoder};

fn any_message_type() -> impl Strategy<Value = MessageType> {
    prop::sample::select(MessageType::iter().collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_frames_survive_arbitrary_splits(
        frames in proptest::collection::vec(
            (any_message_type(), proptest::collection::vec(any::<u8>(), 0..256)),
            1..8,
        ),
        split in 1usize..64,
    ) {
        let mut codec = FrameCodec::default();
        let mut wire = BytesMut::new();
        let expected: Vec<MessageFrame> = frames
            .into_iter()
            .map(|(msg_type, payload)| MessageFrame::new(msg_type, payload))
            .collect();
        for frame in &expected {
            codec.encode(frame.clone(), &mut wire).unwrap();
        }

        let mut decoded = Vec::new();
        let mut buf = BytesMut::new();
        for piece in wire.chunks(split) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame);
            }
        }

        prop_assert_eq!(decoded, expected);
        prop_assert!(buf.is_empty());
    }
}

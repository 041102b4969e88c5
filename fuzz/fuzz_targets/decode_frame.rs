//! Fuzz frame decoding.
//!
//! Arbitrary bytes must either decode into frames, ask for more input, or
//! fail with an error. A decoded frame must re-encode to the bytes it was
//! read from.

#![no_main]

use bytes::BytesMut;
use graph_codec::{Frame, HeaderCodec};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    let mut codec = HeaderCodec::new().with_max_frame_size(64 * 1024);
    let mut src = BytesMut::from(data);

    loop {
        let before = src.clone();
        let frame: Frame = match codec.decode(&mut src) {
            Ok(Some(frame)) => frame,
            Ok(None) | Err(_) => break,
        };

        let consumed = before.len() - src.len();
        let mut encoded = BytesMut::new();
        if codec.encode(frame, &mut encoded).is_ok() {
            assert_eq!(&encoded[..], &before[..consumed]);
        }
    }
});

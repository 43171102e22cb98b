//! Length-prefixed wire framing.
//!
//! One frame carries exactly one message: a 4-byte big-endian payload
//! length followed by that many bytes of UTF-8 JSON. Decoding consumes
//! nothing until a complete frame is buffered, so a stream can be fed in
//! arbitrary chunks.

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::Message;
use bytes::{Buf, BufMut, BytesMut};

/// Length of the frame header in bytes.
pub const HEADER_LEN: usize = 4;

/// Maximum allowed payload length for a single frame.
///
/// Snapshots carry a full tracked file set, so the cap is generous;
/// anything above it is treated as stream corruption.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Encodes one message as a frame appended to `dst`.
pub fn encode_frame(message: &Message, dst: &mut BytesMut) -> ProtocolResult<()> {
    let payload = message.encode_payload()?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            length: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    dst.reserve(HEADER_LEN + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(&payload);
    Ok(())
}

/// Decodes zero or one message from the front of `src`.
///
/// Returns `Ok(None)` when `src` does not yet hold a complete frame; the
/// buffer is left untouched for the next attempt. A frame with an
/// unrecognized discriminator or malformed payload is still consumed, so
/// the stream stays synchronized; the caller sees the error and can keep
/// reading. An over-cap length is unrecoverable.
pub fn decode_frame(src: &mut BytesMut) -> ProtocolResult<Option<Message>> {
    if src.len() < HEADER_LEN {
        return Ok(None);
    }

    let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            length,
            max: MAX_FRAME_SIZE,
        });
    }
    if src.len() < HEADER_LEN + length {
        return Ok(None);
    }

    src.advance(HEADER_LEN);
    let payload = src.split_to(length);
    Message::decode_payload(&payload).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ErrorResponse, HistoryRequest, PullRequest, PullResponse};
    use proptest::prelude::*;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::PullRequest(PullRequest::new("main", None)),
            Message::PullRequest(PullRequest::new("main", Some("c1".into()))),
            Message::PullResponse(PullResponse::with_snapshot(
                Some("c2".into()),
                Some(vec![0x50, 0x4b, 0x03, 0x04]),
            )),
            Message::HistoryRequest(HistoryRequest::new("creative", 25)),
            Message::ErrorResponse(ErrorResponse::new("pull failed")),
        ]
    }

    #[test]
    fn frame_roundtrip() {
        for message in sample_messages() {
            let mut buf = BytesMut::new();
            encode_frame(&message, &mut buf).unwrap();
            let decoded = decode_frame(&mut buf).unwrap().unwrap();
            assert_eq!(decoded, message);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn partial_header_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&[0u8, 0][..]);
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn partial_payload_leaves_buffer_untouched() {
        let message = Message::PullRequest(PullRequest::new("main", None));
        let mut full = BytesMut::new();
        encode_frame(&message, &mut full).unwrap();

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        let before = partial.len();
        assert!(decode_frame(&mut partial).unwrap().is_none());
        assert_eq!(partial.len(), before);
    }

    #[test]
    fn two_frames_in_one_buffer() {
        let first = Message::PullRequest(PullRequest::new("main", None));
        let second = Message::HistoryRequest(HistoryRequest::new("main", 5));

        let mut buf = BytesMut::new();
        encode_frame(&first, &mut buf).unwrap();
        encode_frame(&second, &mut buf).unwrap();

        assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), first);
        assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), second);
        assert!(decode_frame(&mut buf).unwrap().is_none());
    }

    #[test]
    fn byte_at_a_time_matches_whole_buffer() {
        let messages = sample_messages();
        let mut whole = BytesMut::new();
        for message in &messages {
            encode_frame(message, &mut whole).unwrap();
        }

        let mut trickle = BytesMut::new();
        let mut decoded = Vec::new();
        for byte in whole.iter() {
            trickle.put_u8(*byte);
            while let Some(message) = decode_frame(&mut trickle).unwrap() {
                decoded.push(message);
            }
        }

        assert_eq!(decoded, messages);
        assert!(trickle.is_empty());
    }

    #[test]
    fn unknown_discriminator_consumes_frame() {
        let payload = br#"{"type":"HANDSHAKE"}"#;
        let mut buf = BytesMut::new();
        buf.put_u32(payload.len() as u32);
        buf.put_slice(payload);
        encode_frame(&Message::PullRequest(PullRequest::new("main", None)), &mut buf).unwrap();

        let err = decode_frame(&mut buf).unwrap_err();
        assert!(err.is_recoverable());
        // The bad frame is gone; the next one decodes normally.
        assert!(matches!(
            decode_frame(&mut buf).unwrap(),
            Some(Message::PullRequest(_))
        ));
    }

    #[test]
    fn oversized_frame_is_unrecoverable() {
        let mut buf = BytesMut::new();
        buf.put_u32(u32::MAX);
        let err = decode_frame(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
        assert!(!err.is_recoverable());
    }

    proptest! {
        #[test]
        fn roundtrip_arbitrary_pull_requests(
            branch in "[a-zA-Z0-9_/-]{1,32}",
            since in proptest::option::of("[a-f0-9-]{1,40}"),
        ) {
            let message = Message::PullRequest(PullRequest::new(branch, since));
            let mut buf = BytesMut::new();
            encode_frame(&message, &mut buf).unwrap();
            prop_assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), message);
        }

        #[test]
        fn roundtrip_arbitrary_snapshots(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let message = Message::PullResponse(PullResponse::with_snapshot(
                Some("head".into()),
                Some(bytes),
            ));
            let mut buf = BytesMut::new();
            encode_frame(&message, &mut buf).unwrap();
            prop_assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), message);
        }

        #[test]
        fn chunked_delivery_never_splits_messages(chunk in 1usize..7) {
            let messages = sample_messages();
            let mut whole = BytesMut::new();
            for message in &messages {
                encode_frame(message, &mut whole).unwrap();
            }

            let mut trickle = BytesMut::new();
            let mut decoded = Vec::new();
            for piece in whole.chunks(chunk) {
                trickle.put_slice(piece);
                while let Some(message) = decode_frame(&mut trickle).unwrap() {
                    decoded.push(message);
                }
            }
            prop_assert_eq!(decoded, messages);
        }
    }
}

//! Framing of engine events on the link between the shell and the EmoEngine.
//!
//! A frame is two sync bytes, a length byte, the payload and a checksum:
//!
//! ```text
//! 0xAA 0xAA <len> <payload: len bytes> <checksum>
//! ```
//!
//! The checksum is `255 - (sum of payload bytes mod 256)`. The payload
//! starts with the event kind as a big-endian `u16`, followed by the
//! EmoState bytes when there are any.
//!
//! # Structs
//!
//! - `FrameDecoder`: accumulates raw bytes and yields complete events.
//!
//! # Example
//!
//! ```rust
//! use emotiv_servos::comm::{FrameDecoder, encode_event};
//! use emotiv_servos::engine::{EngineEvent, EventKind};
//!
//! let event = EngineEvent { kind: EventKind::EmoStateUpdated, payload: vec![42] };
//! let bytes = encode_event(&event).unwrap();
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.push(&bytes[..3]);
//! assert!(decoder.next_event().is_none());
//! decoder.push(&bytes[3..]);
//! assert_eq!(decoder.next_event(), Some(event));
//! ```
//!
//! Corrupted frames are dropped with a warning and decoding resumes at the
//! next pair of sync bytes.
//!
//! This framing belongs to this crate. It is not the wire protocol of the
//! vendor's EmoEngine, so the link only talks to a peer that speaks it, such
//! as a local relay or the loopback servers used in the tests.

use tracing::warn;

use crate::engine::{EngineEvent, EventKind};

/// Sync byte opening every frame.
pub const SYNC: u8 = 0xAA;

/// Largest payload a frame can carry. A length byte equal to [`SYNC`] is
/// read as another sync byte, anything above restarts the sync hunt.
pub const MAX_PAYLOAD: usize = SYNC as usize - 1;

/// Bytes taken by the event kind at the start of every payload.
const KIND_LEN: usize = 2;

fn checksum(payload: &[u8]) -> u8 {
    255 - payload.iter().fold(0u8, |acc, &x| acc.wrapping_add(x))
}

/// Encodes an event as one frame. Returns `None` when the payload does not
/// fit in a frame.
pub fn encode_event(event: &EngineEvent) -> Option<Vec<u8>> {
    let len = KIND_LEN + event.payload.len();
    if len > MAX_PAYLOAD {
        return None;
    }
    let mut payload = Vec::with_capacity(len);
    payload.extend_from_slice(&u16::from(event.kind).to_be_bytes());
    payload.extend_from_slice(&event.payload);

    let mut frame = Vec::with_capacity(len + 4);
    frame.extend_from_slice(&[SYNC, SYNC, u8::try_from(len).ok()?]);
    frame.extend_from_slice(&payload);
    frame.push(checksum(&payload));
    Some(frame)
}

/// Incremental decoder over the bytes received from the engine.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed by a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete event, or `None` if more bytes are needed.
    pub fn next_event(&mut self) -> Option<EngineEvent> {
        loop {
            // Sync until two sync bytes are found, keeping a trailing one
            let Some(start) = self.buf.windows(2).position(|w| w == [SYNC, SYNC]) else {
                let keep = usize::from(self.buf.last() == Some(&SYNC));
                let drop = self.buf.len() - keep;
                self.buf.drain(..drop);
                return None;
            };
            self.buf.drain(..start);

            // Extra sync bytes may precede the length
            let mut len_at = 2;
            while self.buf.get(len_at) == Some(&SYNC) {
                len_at += 1;
            }
            let len = usize::from(*self.buf.get(len_at)?);
            if len > MAX_PAYLOAD {
                // Start over past the invalid length
                self.buf.drain(..=len_at);
                continue;
            }

            let checksum_at = len_at + 1 + len;
            let received = *self.buf.get(checksum_at)?;
            let payload: Vec<u8> = self
                .buf
                .drain(..=checksum_at)
                .skip(len_at + 1)
                .take(len)
                .collect();

            let expected = checksum(&payload);
            if expected != received {
                warn!(
                    "checksum mismatch: 0b{:08b} (expected) != 0b{:08b} (got)",
                    expected, received
                );
                continue;
            }
            if payload.len() < KIND_LEN {
                warn!(len = payload.len(), "frame too short to carry an event kind");
                continue;
            }

            let kind = u16::from_be_bytes([payload[0], payload[1]]);
            return Some(EngineEvent {
                kind: EventKind::from(kind),
                payload: payload[KIND_LEN..].to_vec(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emo_state(bytes: &[u8]) -> EngineEvent {
        EngineEvent {
            kind: EventKind::EmoStateUpdated,
            payload: bytes.to_vec(),
        }
    }

    #[test]
    fn decodes_a_single_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[SYNC, SYNC, 3, 0x00, 0x40, 9, 255 - (0x40 + 9)]);
        assert_eq!(decoder.next_event(), Some(emo_state(&[9])));
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.next_event(), None);
    }

    #[test]
    fn skips_garbage_before_sync() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x01, 0x02, SYNC, 0x03]);
        decoder.push(&encode_event(&emo_state(&[1, 2])).unwrap());
        assert_eq!(decoder.next_event(), Some(emo_state(&[1, 2])));
    }

    #[test]
    fn extra_sync_before_length_is_ignored() {
        let frame = encode_event(&emo_state(&[5])).unwrap();
        let mut bytes = vec![SYNC];
        bytes.extend_from_slice(&frame);
        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);
        assert_eq!(decoder.next_event(), Some(emo_state(&[5])));
    }

    #[test]
    fn drops_corrupted_frame_and_recovers() {
        let mut bad = encode_event(&emo_state(&[1, 2, 3])).unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        let good = encode_event(&EngineEvent {
            kind: EventKind::UserAdded,
            payload: vec![],
        })
        .unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&bad);
        decoder.push(&good);
        let event = decoder.next_event().unwrap();
        assert_eq!(event.kind, EventKind::UserAdded);
        assert!(event.payload.is_empty());
    }

    #[test]
    fn oversized_length_restarts_sync() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[SYNC, SYNC, 0xF0]);
        decoder.push(&encode_event(&emo_state(&[7])).unwrap());
        assert_eq!(decoder.next_event(), Some(emo_state(&[7])));
    }

    #[test]
    fn waits_for_split_frame() {
        let frame = encode_event(&emo_state(&[10, 20, 30])).unwrap();
        let mut decoder = FrameDecoder::new();
        for byte in &frame[..frame.len() - 1] {
            decoder.push(&[*byte]);
            assert_eq!(decoder.next_event(), None);
        }
        decoder.push(&frame[frame.len() - 1..]);
        assert_eq!(decoder.next_event(), Some(emo_state(&[10, 20, 30])));
    }

    #[test]
    fn refuses_to_encode_oversized_payload() {
        assert!(encode_event(&emo_state(&[0; MAX_PAYLOAD])).is_none());
        assert!(encode_event(&emo_state(&[0; MAX_PAYLOAD - KIND_LEN])).is_some());
    }
}

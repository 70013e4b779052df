use crate::codec::{decode_packet, encode_packet};
use crate::types::VadPacket;
use std::collections::VecDeque;
use vocalis_foundation::ProtoError;

pub const LENGTH_PREFIX_BYTES: usize = 4;
/// A conservative ceiling on a single frame's declared payload length.
/// 16 MiB comfortably covers multi-second audio chunks while still
/// rejecting corrupt/garbage length prefixes early.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Length-prefix-encodes a packet for streaming transport.
pub fn frame_packet(packet: &VadPacket) -> Vec<u8> {
    let payload = encode_packet(packet);
    let mut out = Vec::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Stateful decoder: feed it arbitrarily-chunked bytes from a socket, get
/// back any complete `VadPacket`s. Tolerant to partial reads; `reset()`
/// clears pending state on client disconnect.
pub struct Framer {
    buffer: VecDeque<u8>,
    max_frame_len: u32,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Framer {
    pub fn new(max_frame_len: u32) -> Self {
        Self {
            buffer: VecDeque::new(),
            max_frame_len,
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Feeds raw bytes, returning any complete packets now decodable.
    /// Malformed individual packets are logged and skipped; framing
    /// desync (bad length prefix) is reported and the caller should drop
    /// the connection since there's no way to resynchronize.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<VadPacket>, ProtoError> {
        self.buffer.extend(data.iter().copied());
        let mut packets = Vec::new();

        loop {
            if self.buffer.len() < LENGTH_PREFIX_BYTES {
                break;
            }
            let len_bytes: [u8; 4] = [
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ];
            let declared = u32::from_be_bytes(len_bytes);
            if declared > self.max_frame_len {
                return Err(ProtoError::FrameTooLarge {
                    declared,
                    ceiling: self.max_frame_len,
                });
            }
            let total = LENGTH_PREFIX_BYTES + declared as usize;
            if self.buffer.len() < total {
                break;
            }

            self.buffer.drain(0..LENGTH_PREFIX_BYTES);
            let payload: Vec<u8> = self.buffer.drain(0..declared as usize).collect();

            match decode_packet(&payload) {
                Ok(packet) => packets.push(packet),
                Err(err) => {
                    tracing::warn!("discarding malformed VadPacket: {err}");
                }
            }
        }

        Ok(packets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VadStatus;

    fn sample_packets() -> Vec<VadPacket> {
        vec![
            VadPacket::status(0, VadStatus::Silence),
            VadPacket::audio(10, 16000, 1, 1, vec![1, 2, 3]),
            VadPacket::audio(20, 16000, 1, 2, vec![4, 5, 6]),
            VadPacket::status(30, VadStatus::SpeechDetected),
        ]
    }

    #[test]
    fn round_trips_regardless_of_chunking() {
        let packets = sample_packets();
        let mut framed = Vec::new();
        for p in &packets {
            framed.extend(frame_packet(p));
        }

        for chunk_size in [1usize, 2, 3, 7, 64, framed.len()] {
            let mut framer = Framer::default();
            let mut decoded = Vec::new();
            for chunk in framed.chunks(chunk_size) {
                decoded.extend(framer.decode(chunk).unwrap());
            }
            assert_eq!(decoded, packets, "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn tolerates_partial_reads_across_calls() {
        let packets = sample_packets();
        let framed = frame_packet(&packets[0]);
        let mut framer = Framer::default();

        assert!(framer.decode(&framed[..2]).unwrap().is_empty());
        let decoded = framer.decode(&framed[2..]).unwrap();
        assert_eq!(decoded, vec![packets[0].clone()]);
    }

    #[test]
    fn reset_clears_pending_buffer() {
        let packets = sample_packets();
        let framed = frame_packet(&packets[0]);
        let mut framer = Framer::default();
        framer.decode(&framed[..2]).unwrap();
        framer.reset();
        assert!(framer.buffer.is_empty());
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut framer = Framer::new(8);
        let mut bad = (100u32).to_be_bytes().to_vec();
        bad.extend_from_slice(&[0u8; 8]);
        let err = framer.decode(&bad).unwrap_err();
        assert!(matches!(err, ProtoError::FrameTooLarge { declared: 100, ceiling: 8 }));
    }
}

//! Tag/varint encoding for `VadPacket`, following the protobuf wire-format
//! conventions (varint for field 1, length-delimited for field 2, varint
//! enum for field 3) without depending on `prost`/`protoc`.

use crate::types::{AudioPayload, Payload, VadPacket, VadStatus};
use vocalis_foundation::ProtoError;

const WIRE_VARINT: u8 = 0;
const WIRE_LEN_DELIM: u8 = 2;

fn tag(field: u32, wire_type: u8) -> u64 {
    ((field as u64) << 3) | wire_type as u64
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        } else {
            out.push(byte | 0x80);
        }
    }
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, ProtoError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos).ok_or_else(|| {
            ProtoError::Malformed("truncated varint".to_string())
        })?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(ProtoError::Malformed("varint too long".to_string()));
        }
    }
}

fn write_bytes_field(out: &mut Vec<u8>, field: u32, data: &[u8]) {
    write_varint(out, tag(field, WIRE_LEN_DELIM));
    write_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

fn write_varint_field(out: &mut Vec<u8>, field: u32, value: u64) {
    write_varint(out, tag(field, WIRE_VARINT));
    write_varint(out, value);
}

fn encode_audio(audio: &AudioPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(audio.data.len() + 16);
    write_varint_field(&mut out, 1, audio.sample_rate as u64);
    write_varint_field(&mut out, 2, audio.channels as u64);
    write_varint_field(&mut out, 3, audio.sequence);
    write_bytes_field(&mut out, 4, &audio.data);
    out
}

fn decode_audio(buf: &[u8]) -> Result<AudioPayload, ProtoError> {
    let mut pos = 0;
    let mut sample_rate = 0u32;
    let mut channels = 0u32;
    let mut sequence = 0u64;
    let mut data = Vec::new();

    while pos < buf.len() {
        let key = read_varint(buf, &mut pos)?;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;
        match (field, wire_type) {
            (1, WIRE_VARINT) => sample_rate = read_varint(buf, &mut pos)? as u32,
            (2, WIRE_VARINT) => channels = read_varint(buf, &mut pos)? as u32,
            (3, WIRE_VARINT) => sequence = read_varint(buf, &mut pos)?,
            (4, WIRE_LEN_DELIM) => {
                let len = read_varint(buf, &mut pos)? as usize;
                let end = pos
                    .checked_add(len)
                    .filter(|&e| e <= buf.len())
                    .ok_or_else(|| ProtoError::Malformed("audio.data out of bounds".to_string()))?;
                data = buf[pos..end].to_vec();
                pos = end;
            }
            _ => skip_unknown_field(buf, &mut pos, wire_type)?,
        }
    }

    Ok(AudioPayload {
        sample_rate,
        channels,
        sequence,
        data,
    })
}

fn skip_unknown_field(buf: &[u8], pos: &mut usize, wire_type: u8) -> Result<(), ProtoError> {
    match wire_type {
        WIRE_VARINT => {
            read_varint(buf, pos)?;
            Ok(())
        }
        WIRE_LEN_DELIM => {
            let len = read_varint(buf, pos)? as usize;
            let end = pos
                .checked_add(len)
                .filter(|&e| e <= buf.len())
                .ok_or_else(|| ProtoError::Malformed("unknown field out of bounds".to_string()))?;
            *pos = end;
            Ok(())
        }
        other => Err(ProtoError::Malformed(format!("unsupported wire type {other}"))),
    }
}

/// Serializes a `VadPacket` to its wire representation (no length prefix).
pub fn encode_packet(packet: &VadPacket) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    write_varint_field(&mut out, 1, packet.timestamp_ms);
    match &packet.payload {
        Payload::Audio(audio) => {
            let encoded = encode_audio(audio);
            write_bytes_field(&mut out, 2, &encoded);
        }
        Payload::Status(status) => {
            write_varint_field(&mut out, 3, *status as u64);
        }
    }
    out
}

/// Parses a single `VadPacket` from an already length-delimited payload.
pub fn decode_packet(buf: &[u8]) -> Result<VadPacket, ProtoError> {
    let mut pos = 0;
    let mut timestamp_ms = 0u64;
    let mut payload: Option<Payload> = None;

    while pos < buf.len() {
        let key = read_varint(buf, &mut pos)?;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;
        match (field, wire_type) {
            (1, WIRE_VARINT) => timestamp_ms = read_varint(buf, &mut pos)?,
            (2, WIRE_LEN_DELIM) => {
                let len = read_varint(buf, &mut pos)? as usize;
                let end = pos
                    .checked_add(len)
                    .filter(|&e| e <= buf.len())
                    .ok_or_else(|| ProtoError::Malformed("audio submessage out of bounds".to_string()))?;
                let audio = decode_audio(&buf[pos..end])?;
                payload = Some(Payload::Audio(audio));
                pos = end;
            }
            (3, WIRE_VARINT) => {
                let raw = read_varint(buf, &mut pos)? as i32;
                let status = VadStatus::from_i32(raw).ok_or(ProtoError::UnknownStatus(raw))?;
                payload = Some(Payload::Status(status));
            }
            _ => skip_unknown_field(buf, &mut pos, wire_type)?,
        }
    }

    let payload = payload.ok_or_else(|| ProtoError::Malformed("missing oneof payload".to_string()))?;
    Ok(VadPacket { timestamp_ms, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_audio_packet() {
        let packet = VadPacket::audio(12345, 16000, 1, 7, vec![1, 2, 3, 4, 5]);
        let bytes = encode_packet(&packet);
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn round_trips_status_packet() {
        for status in [
            VadStatus::Unknown,
            VadStatus::Silence,
            VadStatus::SpeechDetected,
            VadStatus::SpeechHangover,
        ] {
            let packet = VadPacket::status(42, status);
            let bytes = encode_packet(&packet);
            let decoded = decode_packet(&bytes).unwrap();
            assert_eq!(packet, decoded);
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let mut out = Vec::new();
        write_varint_field(&mut out, 1, 1);
        write_varint_field(&mut out, 3, 99);
        let err = decode_packet(&out).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownStatus(99)));
    }

    proptest! {
        #[test]
        fn audio_round_trip_arbitrary(
            ts in 0u64..u64::MAX,
            rate in 0u32..200_000,
            channels in 0u32..8,
            seq in 0u64..1_000_000,
            data in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let packet = VadPacket::audio(ts, rate, channels, seq, data);
            let bytes = encode_packet(&packet);
            let decoded = decode_packet(&bytes).unwrap();
            prop_assert_eq!(packet, decoded);
        }
    }
}

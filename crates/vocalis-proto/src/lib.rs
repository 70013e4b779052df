//! Wire format for `VadPacket`: a small, hand-rolled protobuf-style
//! tag/varint encoding (see DESIGN.md for why this project does not pull
//! in `prost` + `protoc` codegen for a three-field message), prefixed by a
//! 4-byte big-endian length for streaming transport.

pub mod codec;
pub mod framer;
pub mod types;

pub use codec::{decode_packet, encode_packet};
pub use framer::{frame_packet, Framer, DEFAULT_MAX_FRAME_LEN, LENGTH_PREFIX_BYTES};
pub use types::{AudioPayload, Payload, VadPacket, VadStatus};

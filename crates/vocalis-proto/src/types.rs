/// A single frame of the VAD-gated audio stream: either a chunk of audio
/// data or a status transition, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VadPacket {
    pub timestamp_ms: u64,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Audio(AudioPayload),
    Status(VadStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub sample_rate: u32,
    pub channels: u32,
    pub sequence: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadStatus {
    Unknown = 0,
    Silence = 1,
    SpeechDetected = 2,
    SpeechHangover = 3,
}

impl VadStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(VadStatus::Unknown),
            1 => Some(VadStatus::Silence),
            2 => Some(VadStatus::SpeechDetected),
            3 => Some(VadStatus::SpeechHangover),
            _ => None,
        }
    }
}

impl VadPacket {
    pub fn audio(timestamp_ms: u64, sample_rate: u32, channels: u32, sequence: u64, data: Vec<u8>) -> Self {
        Self {
            timestamp_ms,
            payload: Payload::Audio(AudioPayload {
                sample_rate,
                channels,
                sequence,
                data,
            }),
        }
    }

    pub fn status(timestamp_ms: u64, status: VadStatus) -> Self {
        Self {
            timestamp_ms,
            payload: Payload::Status(status),
        }
    }

    pub fn is_status(&self, status: VadStatus) -> bool {
        matches!(&self.payload, Payload::Status(s) if *s == status)
    }
}

pub mod buffer;
pub mod engine;
pub mod segmenter;
pub mod worker;

pub use buffer::UtteranceBuffer;
pub use engine::{AsrEngine, MockAsrEngine};
pub use segmenter::{SegmenterCommand, SpeechSegmenter};
pub use worker::TranscriptionSlot;

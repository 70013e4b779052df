pub mod capture;
pub mod device;
pub mod output;
pub mod reformatter;
pub mod resampler;

pub use capture::{AudioFrame, CaptureConfig, spawn_capture};
pub use device::DeviceManager;
pub use output::{spawn_output, OutputConfig, OutputSink};
pub use reformatter::{Reformatter, SampleWidth};
pub use resampler::LinearResampler;

pub mod classifier;
pub mod config;
pub mod gate;

pub use classifier::{EnergyThresholdClassifier, VadClassifier};
pub use config::HangoverConfig;
pub use gate::{GateOutput, HangoverGate};

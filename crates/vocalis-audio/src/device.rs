use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use vocalis_foundation::AudioError;

/// Thin wrapper over a `cpal::Host`, trimmed to what the pipeline
/// actually needs: opening an input or output device by name, falling
/// back to the host default when none is configured.
pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn open_input(&self, name: Option<&str>) -> Result<Device, AudioError> {
        if let Some(name) = name {
            return self
                .find_input_by_name(name)
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: Some(name.to_string()),
                });
        }
        self.host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None })
    }

    pub fn open_output(&self, name: Option<&str>) -> Result<Device, AudioError> {
        if let Some(name) = name {
            return self
                .find_output_by_name(name)
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: Some(name.to_string()),
                });
        }
        self.host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound { name: None })
    }

    fn find_input_by_name(&self, name: &str) -> Option<Device> {
        self.host
            .input_devices()
            .ok()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
    }

    fn find_output_by_name(&self, name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Acquisition configuration

use std::env;
use std::path::PathBuf;

/// Device node used when nothing else is configured
pub const DEFAULT_DEVICE: &str = "/dev/fb0";

/// Depth requested from the device unless configured otherwise
pub const DEFAULT_BITS_PER_PIXEL: u32 = 32;

/// Environment variable naming the framebuffer device, as used by
/// other Linux framebuffer programs
pub const DEVICE_ENV_VAR: &str = "FRAMEBUFFER";

/// Framebuffer acquisition configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FbConfig {
    /// Path of the framebuffer device node
    pub device_path: PathBuf,
    /// Depth to request during mode negotiation
    pub bits_per_pixel: u32,
}

impl FbConfig {
    /// Defaults, with the device path taken from `$FRAMEBUFFER` when set
    pub fn from_env() -> Self {
        Self::default().with_env_device(env::var_os(DEVICE_ENV_VAR))
    }

    fn with_env_device(mut self, device: Option<std::ffi::OsString>) -> Self {
        if let Some(path) = device.filter(|p| !p.is_empty()) {
            self.device_path = PathBuf::from(path);
        }
        self
    }

    /// Sets the device path
    pub fn with_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_path = path.into();
        self
    }

    /// Sets the depth to request
    pub fn with_bits_per_pixel(mut self, bits_per_pixel: u32) -> Self {
        self.bits_per_pixel = bits_per_pixel;
        self
    }
}

impl Default for FbConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE),
            bits_per_pixel: DEFAULT_BITS_PER_PIXEL,
        }
    }
}

//! Device backend traits
//!
//! Acquisition talks to the device only through these traits, so the same
//! negotiation logic runs against `/dev/fb*` and against the simulated display.

use crate::screeninfo::{FixScreenInfo, VarScreenInfo};
use std::io;
use std::ops::DerefMut;
use std::path::Path;

/// Opens framebuffer devices
pub trait FbBackend {
    /// Device produced by [`FbBackend::open`]
    type Device: FbDevice;

    /// Opens the device node at `path` for reading and writing
    fn open(&self, path: &Path) -> io::Result<Self::Device>;
}

/// An open framebuffer device
///
/// Dropping the device releases its descriptor.
pub trait FbDevice {
    /// Mapped device memory; unmapped when dropped
    type Mapping: DerefMut<Target = [u8]>;

    /// Fetches fixed screen information
    fn fix_screeninfo(&self) -> io::Result<FixScreenInfo>;

    /// Fetches variable screen information
    fn var_screeninfo(&self) -> io::Result<VarScreenInfo>;

    /// Requests a mode change
    ///
    /// On success `var` holds the mode the driver actually applied, which may
    /// differ from the request.
    fn put_var_screeninfo(&mut self, var: &mut VarScreenInfo) -> io::Result<()>;

    /// Maps `len` bytes of device memory, shared and writable
    fn map(&mut self, len: usize) -> io::Result<Self::Mapping>;
}

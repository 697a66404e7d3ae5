//! Framebuffer acquisition errors

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring a framebuffer
#[derive(Debug, Error)]
pub enum FbError {
    /// The device node could not be opened
    #[error("Failed to open framebuffer device {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A screeninfo control request failed
    #[error("{request} failed: {source}")]
    Query {
        request: &'static str,
        #[source]
        source: io::Error,
    },

    /// Active depth cannot be addressed as whole bytes of a 32-bit pixel
    #[error("Unsupported bit depth: {bits_per_pixel} bits per pixel")]
    UnsupportedDepth { bits_per_pixel: u32 },

    /// Byte stride is not a whole number of pixels
    #[error("Line length of {line_length} bytes is not a multiple of {bytes_per_pixel}-byte pixels")]
    MisalignedStride {
        line_length: u32,
        bytes_per_pixel: u32,
    },

    /// Device reports no framebuffer memory
    #[error("Framebuffer device reports zero bytes of memory")]
    EmptyMemory,

    /// Device memory could not be mapped
    #[error("Failed to map {len} bytes of framebuffer memory: {source}")]
    Map {
        len: usize,
        #[source]
        source: io::Error,
    },
}

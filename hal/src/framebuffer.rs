//! # Framebuffer HAL
//!
//! This module defines hardware abstraction traits for framebuffer devices.
//!
//! ## Philosophy
//!
//! The framebuffer HAL describes a linear pixel buffer exactly as the device
//! reports it: resolution, stride, visible offset and per-channel bit layout.
//! Nothing here assumes a fixed channel order.
//!
//! ## Design Principles
//!
//! 1. **Minimal and explicit**: Geometry is plain data, no hidden state
//! 2. **Bounds-checked access**: Devices do not check bounds, so this layer does
//! 3. **Testable**: Can be mocked with a simple buffer for testing

use thiserror::Error;

/// Errors from pixel access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PixelError {
    /// Coordinates outside the visible resolution
    #[error("pixel ({x}, {y}) outside visible area {width}x{height}")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// Computed byte offset runs past the mapped buffer
    #[error("pixel at byte offset {offset} runs past buffer of {len} bytes")]
    BeyondBuffer { offset: usize, len: usize },
}

/// Position and width of one colour channel inside a packed pixel
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Bit offset from the least significant bit
    pub offset: u32,
    /// Number of bits
    pub length: u32,
}

impl Channel {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Places an 8-bit intensity into this channel, keeping its top `length` bits
    pub fn place(&self, value: u8) -> u32 {
        if self.length == 0 || self.offset >= 32 {
            return 0;
        }
        let length = self.length.min(8);
        let scaled = u32::from(value) >> (8 - length);
        scaled.checked_shl(self.offset).unwrap_or(0)
    }
}

/// Bit layout of a pixel as reported by the driver
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ChannelLayout {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    /// Transparency channel (length 0 when absent)
    pub transp: Channel,
}

impl ChannelLayout {
    /// 0x00RRGGBB, the usual layout of 32-bit Linux framebuffers
    pub const RGB32: Self = Self {
        red: Channel::new(16, 8),
        green: Channel::new(8, 8),
        blue: Channel::new(0, 8),
        transp: Channel::new(0, 0),
    };

    /// 0x00BBGGRR
    pub const BGR32: Self = Self {
        red: Channel::new(0, 8),
        green: Channel::new(8, 8),
        blue: Channel::new(16, 8),
        transp: Channel::new(0, 0),
    };

    /// 16-bit RGB565
    pub const RGB565: Self = Self {
        red: Channel::new(11, 5),
        green: Channel::new(5, 6),
        blue: Channel::new(0, 5),
        transp: Channel::new(0, 0),
    };
}

/// Pixel format for the framebuffer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit RGB (0xXXRRGGBB) - most common format
    Rgb32,
    /// 32-bit BGR (0xXXBBGGRR)
    Bgr32,
    /// Anything else the driver reports
    Other,
}

impl PixelFormat {
    /// Classifies a device-reported layout
    pub fn classify(bytes_per_pixel: usize, layout: &ChannelLayout) -> Self {
        let rgb = |l: &ChannelLayout| (l.red, l.green, l.blue);
        if bytes_per_pixel != 4 {
            PixelFormat::Other
        } else if rgb(layout) == rgb(&ChannelLayout::RGB32) {
            PixelFormat::Rgb32
        } else if rgb(layout) == rgb(&ChannelLayout::BGR32) {
            PixelFormat::Bgr32
        } else {
            PixelFormat::Other
        }
    }
}

/// A colour as 0xRRGGBBAA
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Colour(pub u32);

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0, 0, 0);
    pub const WHITE: Colour = Colour::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self((r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | 0xFF)
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn blue(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn alpha(self) -> u8 {
        self.0 as u8
    }

    /// Packs the colour into a raw pixel value for the given layout
    pub fn pack(self, layout: &ChannelLayout) -> u32 {
        layout.red.place(self.red())
            | layout.green.place(self.green())
            | layout.blue.place(self.blue())
            | layout.transp.place(self.alpha())
    }
}

/// Framebuffer information
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramebufferInfo {
    /// Visible width in pixels
    pub width: usize,
    /// Visible height in pixels
    pub height: usize,
    /// Stride in pixels (may be larger than width for alignment)
    pub stride_pixels: usize,
    /// Horizontal offset of the visible area inside the virtual buffer
    pub x_offset: usize,
    /// Vertical offset of the visible area inside the virtual buffer
    pub y_offset: usize,
    pub bytes_per_pixel: usize,
    /// Channel bit layout
    pub layout: ChannelLayout,
    /// Length of the mapped buffer in bytes
    pub buffer_len: usize,
}

impl FramebufferInfo {
    /// Calculate the byte offset for a visible pixel at (x, y)
    ///
    /// No bounds checking; see [`FramebufferInfo::pixel_offset`].
    pub const fn offset(&self, x: usize, y: usize) -> usize {
        ((y + self.y_offset) * self.stride_pixels + x + self.x_offset) * self.bytes_per_pixel
    }

    /// Byte offset for (x, y), checked against resolution and buffer length
    pub fn pixel_offset(&self, x: usize, y: usize) -> Result<usize, PixelError> {
        if x >= self.width || y >= self.height {
            return Err(PixelError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }

        let beyond = |offset| PixelError::BeyondBuffer {
            offset,
            len: self.buffer_len,
        };
        // Overflow means the pixel cannot lie inside any buffer
        let offset = self
            .checked_offset(x, y)
            .ok_or_else(|| beyond(usize::MAX))?;
        match offset.checked_add(self.bytes_per_pixel) {
            Some(end) if end <= self.buffer_len => Ok(offset),
            _ => Err(beyond(offset)),
        }
    }

    fn checked_offset(&self, x: usize, y: usize) -> Option<usize> {
        y.checked_add(self.y_offset)?
            .checked_mul(self.stride_pixels)?
            .checked_add(x)?
            .checked_add(self.x_offset)?
            .checked_mul(self.bytes_per_pixel)
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::classify(self.bytes_per_pixel, &self.layout)
    }
}

/// Framebuffer trait for pixel-based output
///
/// Implementations handle platform-specific memory mapping. The provided
/// pixel methods store values little-endian, `bytes_per_pixel` bytes wide.
pub trait Framebuffer {
    /// Returns framebuffer information
    fn info(&self) -> FramebufferInfo;

    /// Returns the framebuffer pixel data
    fn buffer(&self) -> &[u8];

    /// Returns a mutable slice to the framebuffer pixel data
    ///
    /// # Notes
    ///
    /// The slice may be backed by device memory (e.g., video RAM).
    /// Writes are visible on screen immediately.
    fn buffer_mut(&mut self) -> &mut [u8];

    /// Writes a raw pixel value at (x, y)
    fn write_pixel(&mut self, x: usize, y: usize, value: u32) -> Result<(), PixelError> {
        let info = self.info();
        let offset = info.pixel_offset(x, y)?;
        let bytes = value.to_le_bytes();
        let bpp = info.bytes_per_pixel.min(bytes.len());
        let buffer = self.buffer_mut();
        let len = buffer.len();
        let dest = buffer
            .get_mut(offset..offset + bpp)
            .ok_or(PixelError::BeyondBuffer { offset, len })?;
        dest.copy_from_slice(&bytes[..bpp]);
        Ok(())
    }

    /// Reads the raw pixel value at (x, y)
    fn read_pixel(&self, x: usize, y: usize) -> Result<u32, PixelError> {
        let info = self.info();
        let offset = info.pixel_offset(x, y)?;
        let bpp = info.bytes_per_pixel.min(4);
        let buffer = self.buffer();
        let src = buffer
            .get(offset..offset + bpp)
            .ok_or(PixelError::BeyondBuffer {
                offset,
                len: buffer.len(),
            })?;
        let mut bytes = [0u8; 4];
        bytes[..bpp].copy_from_slice(src);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Packs `colour` for this framebuffer's layout and writes it at (x, y)
    fn set_colour(&mut self, x: usize, y: usize, colour: Colour) -> Result<(), PixelError> {
        let value = colour.pack(&self.info().layout);
        self.write_pixel(x, y, value)
    }
}

/// Heap-backed framebuffer, for tests and offscreen rendering
#[derive(Debug, Clone)]
pub struct MemoryFramebuffer {
    info: FramebufferInfo,
    pixels: Vec<u8>,
}

impl MemoryFramebuffer {
    /// Creates a zeroed framebuffer sized to `info.buffer_len`
    pub fn new(info: FramebufferInfo) -> Self {
        Self {
            info,
            pixels: vec![0; info.buffer_len],
        }
    }
}

impl Framebuffer for MemoryFramebuffer {
    fn info(&self) -> FramebufferInfo {
        self.info
    }

    fn buffer(&self) -> &[u8] {
        &self.pixels
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

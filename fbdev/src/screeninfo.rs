//! `#[repr(C)]` mirrors of the `<linux/fb.h>` screeninfo structures

use libc::{c_char, c_ulong};

/// Get variable screen information
pub const FBIOGET_VSCREENINFO: c_ulong = 0x4600;
/// Put variable screen information
pub const FBIOPUT_VSCREENINFO: c_ulong = 0x4601;
/// Get fixed screen information
pub const FBIOGET_FSCREENINFO: c_ulong = 0x4602;

/// Position of one colour field inside a pixel (`struct fb_bitfield`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Bitfield {
    pub offset: u32,
    pub length: u32,
    /// Non-zero when the most significant bit is on the right
    pub msb_right: u32,
}

impl Bitfield {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            msb_right: 0,
        }
    }
}

/// Device geometry that mode changes do not affect (`struct fb_fix_screeninfo`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct FixScreenInfo {
    /// Identification string, e.g. "EFI VGA"
    pub id: [c_char; 16],
    /// Physical start of framebuffer memory
    pub smem_start: c_ulong,
    /// Length of framebuffer memory in bytes
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    /// Length of a line in bytes
    pub line_length: u32,
    pub mmio_start: c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

impl FixScreenInfo {
    /// Driver identification, up to the first NUL
    pub fn id(&self) -> String {
        let bytes: Vec<u8> = self
            .id
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Negotiable display mode (`struct fb_var_screeninfo`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct VarScreenInfo {
    /// Visible resolution
    pub xres: u32,
    pub yres: u32,
    /// Virtual resolution
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    /// Offset from virtual to visible
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    /// 0 = colour, 1 = grayscale, >1 = FOURCC
    pub grayscale: u32,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    pub transp: Bitfield,
    pub nonstd: u32,
    pub activate: u32,
    /// Height of picture in mm
    pub height: u32,
    /// Width of picture in mm
    pub width: u32,
    pub accel_flags: u32,
    /// Pixel clock in ps
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

//! Framebuffer acquisition and release

use crate::backend::{FbBackend, FbDevice};
use crate::config::FbConfig;
use crate::error::FbError;
use crate::linux::{LinuxBackend, LinuxFbDevice};
use crate::screeninfo::{Bitfield, FixScreenInfo, VarScreenInfo};
use hal::{Channel, ChannelLayout, Framebuffer, FramebufferInfo};
use log::{debug, warn};

/// Outcome of the mode-change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The driver applied the request (possibly adjusting it)
    Accepted,
    /// The driver refused; the previously active mode is in use
    Rejected,
}

/// Format negotiated with the device during acquisition
///
/// The device mode is shared by every user of the device node, so callers
/// should check this rather than assume the requested depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub requested_bits_per_pixel: u32,
    pub active_bits_per_pixel: u32,
    pub outcome: NegotiationOutcome,
}

impl NegotiatedFormat {
    /// True when the active depth is the one requested
    pub fn is_honored(&self) -> bool {
        self.outcome == NegotiationOutcome::Accepted
            && self.active_bits_per_pixel == self.requested_bits_per_pixel
    }
}

/// Ownership of a mapped framebuffer device
///
/// Holds the open device and its memory mapping. [`FramebufferHandle::release`]
/// or dropping the handle unmaps the memory, then closes the device.
pub struct FramebufferHandle<D: FbDevice = LinuxFbDevice> {
    // Declared before `device` so it is unmapped before the descriptor closes
    mapping: D::Mapping,
    device: D,
    info: FramebufferInfo,
    negotiated: NegotiatedFormat,
    driver_id: String,
}

impl FramebufferHandle<LinuxFbDevice> {
    /// Acquires the device named by `$FRAMEBUFFER`, or `/dev/fb0`
    pub fn acquire() -> Result<Self, FbError> {
        Self::acquire_with(&FbConfig::from_env())
    }

    /// Acquires a real framebuffer device
    pub fn acquire_with(config: &FbConfig) -> Result<Self, FbError> {
        Self::acquire_from(&LinuxBackend, config)
    }
}

impl<D: FbDevice> FramebufferHandle<D> {
    /// Opens `config.device_path` through `backend` and acquires it
    pub fn acquire_from<B>(backend: &B, config: &FbConfig) -> Result<Self, FbError>
    where
        B: FbBackend<Device = D>,
    {
        debug!("opening framebuffer {}", config.device_path.display());
        let device = backend
            .open(&config.device_path)
            .map_err(|source| FbError::Open {
                path: config.device_path.clone(),
                source,
            })?;
        Self::from_device(device, config)
    }

    /// Negotiates the mode of an already open device and maps its memory
    ///
    /// On error the device is dropped, closing it.
    pub fn from_device(mut device: D, config: &FbConfig) -> Result<Self, FbError> {
        let mut fix = device.fix_screeninfo().map_err(query("FBIOGET_FSCREENINFO"))?;
        let mut var = device.var_screeninfo().map_err(query("FBIOGET_VSCREENINFO"))?;
        debug!(
            "current mode {}x{} at {} bpp, line length {} bytes",
            var.xres, var.yres, var.bits_per_pixel, fix.line_length
        );

        let negotiated = negotiate(&mut device, &mut var, config.bits_per_pixel)?;
        if negotiated.outcome == NegotiationOutcome::Accepted {
            // Stride follows the depth
            fix = device.fix_screeninfo().map_err(query("FBIOGET_FSCREENINFO"))?;
        }

        let info = describe(&fix, &var)?;
        debug!(
            "mapping {} bytes, stride {} pixels",
            info.buffer_len, info.stride_pixels
        );
        let mapping = device.map(info.buffer_len).map_err(|source| FbError::Map {
            len: info.buffer_len,
            source,
        })?;

        Ok(Self {
            mapping,
            device,
            info,
            negotiated,
            driver_id: fix.id(),
        })
    }

    /// Unmaps the framebuffer and closes the device
    pub fn release(self) {
        debug!("releasing framebuffer ({} bytes)", self.info.buffer_len);
        drop(self);
    }

    /// The format negotiation result
    pub fn negotiated(&self) -> NegotiatedFormat {
        self.negotiated
    }

    /// Driver identification from the fixed screeninfo
    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    /// Length of the mapped region in bytes
    pub fn buffer_len(&self) -> usize {
        self.info.buffer_len
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.info.bytes_per_pixel
    }

    /// Pixels per scanline
    pub fn line_length(&self) -> usize {
        self.info.stride_pixels
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.info.width, self.info.height)
    }

    /// The underlying device, for further screeninfo queries
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: FbDevice> Framebuffer for FramebufferHandle<D> {
    fn info(&self) -> FramebufferInfo {
        self.info
    }

    fn buffer(&self) -> &[u8] {
        &self.mapping
    }

    fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.mapping
    }
}

impl<D: FbDevice> std::fmt::Debug for FramebufferHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramebufferHandle")
            .field("info", &self.info)
            .field("negotiated", &self.negotiated)
            .field("driver_id", &self.driver_id)
            .finish_non_exhaustive()
    }
}

fn query(request: &'static str) -> impl FnOnce(std::io::Error) -> FbError {
    move |source| FbError::Query { request, source }
}

/// Requests `bits_per_pixel` colour mode, falling back to the active mode
fn negotiate<D: FbDevice>(
    device: &mut D,
    var: &mut VarScreenInfo,
    bits_per_pixel: u32,
) -> Result<NegotiatedFormat, FbError> {
    let mut request = *var;
    request.bits_per_pixel = bits_per_pixel;
    request.grayscale = 0;

    let outcome = match device.put_var_screeninfo(&mut request) {
        Ok(()) => {
            *var = request;
            NegotiationOutcome::Accepted
        }
        Err(err) => {
            warn!(
                "device refused {} bpp colour mode ({}), keeping active mode",
                bits_per_pixel, err
            );
            *var = device
                .var_screeninfo()
                .map_err(query("FBIOGET_VSCREENINFO"))?;
            NegotiationOutcome::Rejected
        }
    };

    let negotiated = NegotiatedFormat {
        requested_bits_per_pixel: bits_per_pixel,
        active_bits_per_pixel: var.bits_per_pixel,
        outcome,
    };
    if outcome == NegotiationOutcome::Accepted && !negotiated.is_honored() {
        warn!(
            "device adjusted requested {} bpp to {} bpp",
            bits_per_pixel, var.bits_per_pixel
        );
    }
    Ok(negotiated)
}

/// Derives the buffer descriptor from device-reported screeninfo
pub(crate) fn describe(
    fix: &FixScreenInfo,
    var: &VarScreenInfo,
) -> Result<FramebufferInfo, FbError> {
    let bits_per_pixel = var.bits_per_pixel;
    if bits_per_pixel == 0 || bits_per_pixel % 8 != 0 || bits_per_pixel > 32 {
        return Err(FbError::UnsupportedDepth { bits_per_pixel });
    }
    let bytes_per_pixel = bits_per_pixel / 8;

    if fix.line_length % bytes_per_pixel != 0 {
        return Err(FbError::MisalignedStride {
            line_length: fix.line_length,
            bytes_per_pixel,
        });
    }
    if fix.smem_len == 0 {
        return Err(FbError::EmptyMemory);
    }

    let channel = |field: &Bitfield| Channel::new(field.offset, field.length);
    Ok(FramebufferInfo {
        width: var.xres as usize,
        height: var.yres as usize,
        stride_pixels: (fix.line_length / bytes_per_pixel) as usize,
        x_offset: var.xoffset as usize,
        y_offset: var.yoffset as usize,
        bytes_per_pixel: bytes_per_pixel as usize,
        layout: ChannelLayout {
            red: channel(&var.red),
            green: channel(&var.green),
            blue: channel(&var.blue),
            transp: channel(&var.transp),
        },
        buffer_len: fix.smem_len as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screeninfo(bits_per_pixel: u32, line_length: u32) -> (FixScreenInfo, VarScreenInfo) {
        let fix = FixScreenInfo {
            line_length,
            smem_len: line_length * 768,
            ..FixScreenInfo::default()
        };
        let var = VarScreenInfo {
            xres: 1024,
            yres: 768,
            xres_virtual: 1024,
            yres_virtual: 768,
            xoffset: 2,
            yoffset: 1,
            bits_per_pixel,
            red: Bitfield::new(16, 8),
            green: Bitfield::new(8, 8),
            blue: Bitfield::new(0, 8),
            ..VarScreenInfo::default()
        };
        (fix, var)
    }

    #[test]
    fn test_describe_32bpp() {
        let (fix, var) = screeninfo(32, 4096);
        let info = describe(&fix, &var).unwrap();
        assert_eq!(info.bytes_per_pixel, 4);
        assert_eq!(info.stride_pixels, 1024);
        assert_eq!((info.width, info.height), (1024, 768));
        assert_eq!((info.x_offset, info.y_offset), (2, 1));
        assert_eq!(info.layout, ChannelLayout::RGB32);
        assert_eq!(info.buffer_len, 4096 * 768);
    }

    #[test]
    fn test_describe_stride_uses_pixel_size() {
        let (fix, var) = screeninfo(16, 2080);
        let info = describe(&fix, &var).unwrap();
        assert_eq!(info.bytes_per_pixel, 2);
        assert_eq!(info.stride_pixels, 1040);
    }

    #[test]
    fn test_describe_rejects_misaligned_stride() {
        let (fix, var) = screeninfo(32, 4098);
        assert!(matches!(
            describe(&fix, &var),
            Err(FbError::MisalignedStride {
                line_length: 4098,
                bytes_per_pixel: 4
            })
        ));
    }

    #[test]
    fn test_describe_rejects_unsupported_depth() {
        for bits in [0, 12, 48] {
            let (fix, var) = screeninfo(bits, 4096);
            assert!(matches!(
                describe(&fix, &var),
                Err(FbError::UnsupportedDepth { bits_per_pixel }) if bits_per_pixel == bits
            ));
        }
    }

    #[test]
    fn test_describe_rejects_empty_memory() {
        let (mut fix, var) = screeninfo(32, 4096);
        fix.smem_len = 0;
        assert!(matches!(describe(&fix, &var), Err(FbError::EmptyMemory)));
    }

    #[test]
    fn test_negotiated_format_honored() {
        let honored = NegotiatedFormat {
            requested_bits_per_pixel: 32,
            active_bits_per_pixel: 32,
            outcome: NegotiationOutcome::Accepted,
        };
        assert!(honored.is_honored());

        let adjusted = NegotiatedFormat {
            active_bits_per_pixel: 24,
            ..honored
        };
        assert!(!adjusted.is_honored());

        let rejected = NegotiatedFormat {
            outcome: NegotiationOutcome::Rejected,
            ..honored
        };
        assert!(!rejected.is_honored());
    }
}

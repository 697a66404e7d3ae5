//! # Host Runtime
//!
//! Acquires the framebuffer, optionally paints a test pattern, reports the
//! negotiated geometry and releases the device.

use fbdev::sim::SimDisplay;
use fbdev::{FbConfig, FbDevice, FbError, FramebufferHandle, NegotiationOutcome};
use hal::{Channel, Colour, Framebuffer, PixelError};
use log::{info, LevelFilter};
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

/// Simulated display geometry for `--sim`
const SIM_WIDTH: u32 = 640;
const SIM_HEIGHT: u32 = 480;
const SIM_BITS_PER_PIXEL: u32 = 16;

#[derive(Debug, Error)]
pub enum FbctlError {
    #[error("Framebuffer error: {0}")]
    Framebuffer(#[from] FbError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] PixelError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Which device to acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Real `/dev/fb*` device
    Device,
    /// Simulated display (deterministic, no hardware needed)
    Sim,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct FbctlConfig {
    /// Host mode
    pub mode: HostMode,
    /// Device acquisition settings
    pub fb: FbConfig,
    /// Paint a colour-bar test pattern before reporting
    pub pattern: bool,
    pub output: OutputFormat,
    pub log_level: LevelFilter,
}

impl Default for FbctlConfig {
    fn default() -> Self {
        Self {
            mode: HostMode::Device,
            fb: FbConfig::from_env(),
            pattern: false,
            output: OutputFormat::Text,
            log_level: LevelFilter::Warn,
        }
    }
}

/// Bit position and width of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    pub offset: u32,
    pub length: u32,
}

impl From<Channel> for ChannelReport {
    fn from(channel: Channel) -> Self {
        Self {
            offset: channel.offset,
            length: channel.length,
        }
    }
}

/// What was acquired
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub device: String,
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub stride_pixels: usize,
    pub x_offset: usize,
    pub y_offset: usize,
    pub bytes_per_pixel: usize,
    pub buffer_len: usize,
    pub format: String,
    pub red: ChannelReport,
    pub green: ChannelReport,
    pub blue: ChannelReport,
    pub transp: ChannelReport,
    pub requested_bits_per_pixel: u32,
    pub active_bits_per_pixel: u32,
    pub negotiation: String,
    /// Pixels painted by the test pattern, if one was drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_pixels: Option<usize>,
}

impl Report {
    fn new<D: FbDevice>(
        config: &FbConfig,
        fb: &FramebufferHandle<D>,
        pattern_pixels: Option<usize>,
    ) -> Self {
        let info = fb.info();
        let negotiated = fb.negotiated();
        let negotiation = match negotiated.outcome {
            NegotiationOutcome::Accepted if negotiated.is_honored() => "honored",
            NegotiationOutcome::Accepted => "adjusted",
            NegotiationOutcome::Rejected => "rejected",
        };

        Self {
            device: config.device_path.display().to_string(),
            driver: fb.driver_id().to_string(),
            width: info.width,
            height: info.height,
            stride_pixels: info.stride_pixels,
            x_offset: info.x_offset,
            y_offset: info.y_offset,
            bytes_per_pixel: info.bytes_per_pixel,
            buffer_len: info.buffer_len,
            format: format!("{:?}", info.format()),
            red: info.layout.red.into(),
            green: info.layout.green.into(),
            blue: info.layout.blue.into(),
            transp: info.layout.transp.into(),
            requested_bits_per_pixel: negotiated.requested_bits_per_pixel,
            active_bits_per_pixel: negotiated.active_bits_per_pixel,
            negotiation: negotiation.to_string(),
            pattern_pixels,
        }
    }

    /// Renders the report in the configured format
    pub fn render(&self, output: OutputFormat) -> Result<String, FbctlError> {
        match output {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let channel = |c: &ChannelReport| format!("{}/{}", c.offset, c.length);
        // Writing to a String cannot fail
        let _ = writeln!(out, "device:      {} ({})", self.device, self.driver);
        let _ = writeln!(out, "resolution:  {}x{}", self.width, self.height);
        let _ = writeln!(out, "offset:      {},{}", self.x_offset, self.y_offset);
        let _ = writeln!(out, "stride:      {} pixels", self.stride_pixels);
        let _ = writeln!(
            out,
            "depth:       {} bpp (requested {}, {})",
            self.active_bits_per_pixel, self.requested_bits_per_pixel, self.negotiation
        );
        let _ = writeln!(
            out,
            "format:      {} r={} g={} b={} a={}",
            self.format,
            channel(&self.red),
            channel(&self.green),
            channel(&self.blue),
            channel(&self.transp)
        );
        let _ = writeln!(out, "memory:      {} bytes", self.buffer_len);
        if let Some(pixels) = self.pattern_pixels {
            let _ = writeln!(out, "pattern:     {} pixels", pixels);
        }
        out
    }
}

/// Runs one acquire/report/release cycle
pub fn run(config: &FbctlConfig) -> Result<Report, FbctlError> {
    match config.mode {
        HostMode::Device => {
            let fb = FramebufferHandle::acquire_with(&config.fb)?;
            inspect(fb, config)
        }
        HostMode::Sim => {
            let display = SimDisplay::builder(SIM_WIDTH, SIM_HEIGHT)
                .bits_per_pixel(SIM_BITS_PER_PIXEL)
                .build();
            let fb = FramebufferHandle::acquire_from(&display, &config.fb)?;
            inspect(fb, config)
        }
    }
}

fn inspect<D: FbDevice>(
    mut fb: FramebufferHandle<D>,
    config: &FbctlConfig,
) -> Result<Report, FbctlError> {
    let painted = if config.pattern {
        Some(paint_pattern(&mut fb)?)
    } else {
        None
    };
    let report = Report::new(&config.fb, &fb, painted);
    fb.release();
    Ok(report)
}

/// Paints red, green and blue vertical bars over the visible area
///
/// Returns the number of pixels written.
pub fn paint_pattern<F: Framebuffer>(fb: &mut F) -> Result<usize, PixelError> {
    let info = fb.info();
    let bars = [
        Colour::rgb(0xFF, 0, 0),
        Colour::rgb(0, 0xFF, 0),
        Colour::rgb(0, 0, 0xFF),
    ];
    let values = bars.map(|colour| colour.pack(&info.layout));
    let band = info.width.div_ceil(bars.len()).max(1);

    for y in 0..info.height {
        for x in 0..info.width {
            fb.write_pixel(x, y, values[x / band])?;
        }
    }
    info!(
        "painted test pattern over {}x{} pixels",
        info.width, info.height
    );
    Ok(info.width * info.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::{ChannelLayout, FramebufferInfo, MemoryFramebuffer};

    fn sim_config() -> FbctlConfig {
        FbctlConfig {
            mode: HostMode::Sim,
            fb: FbConfig::default(),
            ..FbctlConfig::default()
        }
    }

    #[test]
    fn test_sim_run_reports_negotiated_mode() {
        let report = run(&sim_config()).unwrap();
        assert_eq!((report.width, report.height), (640, 480));
        assert_eq!(report.bytes_per_pixel, 4);
        assert_eq!(report.stride_pixels, 640);
        assert_eq!(report.active_bits_per_pixel, 32);
        assert_eq!(report.negotiation, "honored");
        assert_eq!(report.format, "Rgb32");
        assert_eq!(report.driver, "simfb");
        assert_eq!(report.pattern_pixels, None);
    }

    #[test]
    fn test_sim_run_with_pattern() {
        let config = FbctlConfig {
            pattern: true,
            ..sim_config()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.pattern_pixels, Some(640 * 480));
    }

    #[test]
    fn test_sim_run_with_requested_depth() {
        let config = FbctlConfig {
            fb: FbConfig::default().with_bits_per_pixel(12),
            ..sim_config()
        };
        // Simulated driver refuses 12 bpp and keeps its 16 bpp mode
        let report = run(&config).unwrap();
        assert_eq!(report.active_bits_per_pixel, 16);
        assert_eq!(report.negotiation, "rejected");
        assert_eq!(report.bytes_per_pixel, 2);
    }

    #[test]
    fn test_device_run_reports_open_failure() {
        let config = FbctlConfig {
            mode: HostMode::Device,
            fb: FbConfig::default().with_device("/nonexistent/fb0"),
            ..FbctlConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(matches!(err, FbctlError::Framebuffer(FbError::Open { .. })));
    }

    #[test]
    fn test_paint_pattern_bands() {
        let mut fb = MemoryFramebuffer::new(FramebufferInfo {
            width: 6,
            height: 2,
            stride_pixels: 8,
            x_offset: 0,
            y_offset: 0,
            bytes_per_pixel: 4,
            layout: ChannelLayout::RGB32,
            buffer_len: 8 * 2 * 4,
        });

        assert_eq!(paint_pattern(&mut fb), Ok(12));
        assert_eq!(fb.read_pixel(0, 0), Ok(0x00FF_0000));
        assert_eq!(fb.read_pixel(2, 1), Ok(0x0000_FF00));
        assert_eq!(fb.read_pixel(5, 1), Ok(0x0000_00FF));
        // Stride padding stays untouched
        assert_eq!(&fb.buffer()[24..32], &[0u8; 8]);
    }

    #[test]
    fn test_render_json() {
        let report = run(&sim_config()).unwrap();
        let json = report.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["width"], 640);
        assert_eq!(value["red"]["offset"], 16);
        assert!(value.get("pattern_pixels").is_none());
    }

    #[test]
    fn test_render_text() {
        let report = run(&sim_config()).unwrap();
        let text = report.render(OutputFormat::Text).unwrap();
        assert!(text.contains("resolution:  640x480"));
        assert!(text.contains("32 bpp (requested 32, honored)"));
    }
}

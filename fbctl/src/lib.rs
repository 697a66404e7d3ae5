//! # Framebuffer Host Tool
//!
//! Acquires a Linux framebuffer and reports what the device negotiated.
//!
//! ## Responsibilities
//!
//! - Acquire the configured device (or a simulated display)
//! - Optionally paint a colour-bar test pattern
//! - Report geometry, channel layout and negotiation outcome
//! - Release the device before exiting
//!
//! ## Non-Responsibilities
//!
//! The host does NOT:
//! - Keep the device open or run an event loop
//! - Restore the previous display mode

pub mod logger;
pub mod runtime;

pub use runtime::{
    paint_pattern, run, FbctlConfig, FbctlError, HostMode, OutputFormat, Report,
};

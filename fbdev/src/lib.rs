//! # Linux Framebuffer Device
//!
//! This crate acquires a Linux framebuffer device (`/dev/fb*`): it negotiates
//! a 32-bit colour mode, maps the pixel memory and describes its geometry.
//!
//! ## Philosophy
//!
//! - **The handle owns everything it acquires**: descriptor and mapping alike
//! - **Failures are typed**: open, query and map errors are distinct
//! - **Negotiation is observable**: the device mode is shared with every
//!   other user of the node, so the handle reports what was actually applied
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A drawing library (see [`hal::Framebuffer`] for bounds-checked pixels)
//! - Double buffering or damage tracking
//! - Multi-display management
//!
//! ## Example
//!
//! ```no_run
//! use fbdev::{FbConfig, FramebufferHandle};
//! use hal::{Colour, Framebuffer};
//!
//! let mut fb = FramebufferHandle::acquire_with(&FbConfig::default())?;
//! fb.set_colour(10, 10, Colour::rgb(0xFF, 0, 0))?;
//! fb.release();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
pub mod linux;
pub mod screeninfo;
pub mod sim;

pub use backend::{FbBackend, FbDevice};
pub use config::FbConfig;
pub use error::FbError;
pub use handle::{FramebufferHandle, NegotiatedFormat, NegotiationOutcome};
pub use linux::{LinuxBackend, LinuxFbDevice};

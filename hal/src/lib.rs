//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the display-side hardware abstraction used by the
//! framebuffer device crates.
//!
//! ## Philosophy
//!
//! **Geometry is reported, never assumed.**
//!
//! Resolution, stride, visible offsets and channel layout come from the
//! device. Drawing code reads them from [`FramebufferInfo`] and goes through
//! bounds-checked pixel access.
//!
//! ## Design Principles
//!
//! 1. **No device-specific assumptions**: Any linear framebuffer fits
//! 2. **Trait-based**: Pixel access goes through [`Framebuffer`]
//! 3. **Testable**: [`MemoryFramebuffer`] stands in for device memory

pub mod framebuffer;

pub use framebuffer::{
    Channel, ChannelLayout, Colour, Framebuffer, FramebufferInfo, MemoryFramebuffer, PixelError,
    PixelFormat,
};

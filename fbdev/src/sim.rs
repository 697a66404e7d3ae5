//! Simulated framebuffer device
//!
//! A deterministic stand-in for `/dev/fb*` used by tests and by `fbctl --sim`.
//!
//! ## Design
//!
//! - **Device-wide mode**: every open of one [`SimDisplay`] shares a single
//!   variable screeninfo, like a real device node shared between processes
//! - **Fault plan**: failures are injected explicitly, never at random
//! - **Observable**: [`SimStats`] counts opens, closes, maps and unmaps
//!
//! Each mapping gets its own zeroed backing store, so two handles never alias.
//!
//! ## Example
//!
//! ```
//! use fbdev::sim::{SimDisplay, SimFault};
//!
//! let display = SimDisplay::builder(640, 480)
//!     .bits_per_pixel(16)
//!     .with_fault(SimFault::RejectModeChange)
//!     .build();
//! assert_eq!(display.current_mode().bits_per_pixel, 16);
//! ```

use crate::backend::{FbBackend, FbDevice};
use crate::screeninfo::{Bitfield, FixScreenInfo, VarScreenInfo};
use std::cell::{Cell, RefCell};
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::rc::Rc;

/// A fault to inject into the simulated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// Opening the device fails with `ENOENT`
    OpenFails,
    /// Fixed screeninfo query fails
    FixQueryFails,
    /// Variable screeninfo query fails
    VarQueryFails,
    /// Mode changes are refused with `EINVAL`, the active mode stays
    RejectModeChange,
    /// Mode changes succeed but the driver applies this depth instead
    ForceDepth(u32),
    /// Mapping fails with `ENOMEM`
    MapFails,
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct SimFaultPlan {
    faults: Vec<SimFault>,
}

impl SimFaultPlan {
    pub fn new() -> Self {
        Self { faults: Vec::new() }
    }

    /// Adds a fault to the plan
    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn contains(&self, fault: SimFault) -> bool {
        self.faults.contains(&fault)
    }

    fn forced_depth(&self) -> Option<u32> {
        self.faults.iter().find_map(|fault| match fault {
            SimFault::ForceDepth(bits) => Some(*bits),
            _ => None,
        })
    }
}

/// Counters of device operations
#[derive(Debug, Default)]
pub struct SimStats {
    opens: Cell<usize>,
    closes: Cell<usize>,
    maps: Cell<usize>,
    unmaps: Cell<usize>,
    mode_changes: Cell<usize>,
}

impl SimStats {
    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    pub fn closes(&self) -> usize {
        self.closes.get()
    }

    /// Successful mappings
    pub fn maps(&self) -> usize {
        self.maps.get()
    }

    pub fn unmaps(&self) -> usize {
        self.unmaps.get()
    }

    /// Accepted mode changes
    pub fn mode_changes(&self) -> usize {
        self.mode_changes.get()
    }

    /// Devices currently open
    pub fn open_devices(&self) -> usize {
        self.opens() - self.closes()
    }

    /// Mappings currently live
    pub fn live_mappings(&self) -> usize {
        self.maps() - self.unmaps()
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

#[derive(Debug)]
struct SimShared {
    fix: RefCell<FixScreenInfo>,
    var: RefCell<VarScreenInfo>,
    stride_padding: u32,
    faults: SimFaultPlan,
    stats: SimStats,
}

/// Builder for [`SimDisplay`]
#[derive(Debug, Clone)]
pub struct SimDisplayBuilder {
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    stride_padding: u32,
    line_length: Option<u32>,
    smem_len: Option<u32>,
    faults: SimFaultPlan,
}

impl SimDisplayBuilder {
    /// Initial depth (default 32)
    pub fn bits_per_pixel(mut self, bits_per_pixel: u32) -> Self {
        self.bits_per_pixel = bits_per_pixel;
        self
    }

    /// Extra bytes at the end of every scanline
    pub fn stride_padding(mut self, bytes: u32) -> Self {
        self.stride_padding = bytes;
        self
    }

    /// Reports this byte stride regardless of depth
    pub fn line_length(mut self, bytes: u32) -> Self {
        self.line_length = Some(bytes);
        self
    }

    /// Reports this much framebuffer memory
    pub fn memory_len(mut self, bytes: u32) -> Self {
        self.smem_len = Some(bytes);
        self
    }

    /// Adds a fault to the display's plan
    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.faults = self.faults.with_fault(fault);
        self
    }

    pub fn with_fault_plan(mut self, faults: SimFaultPlan) -> Self {
        self.faults = faults;
        self
    }

    pub fn build(self) -> SimDisplay {
        let mut var = VarScreenInfo {
            xres: self.width,
            yres: self.height,
            xres_virtual: self.width,
            yres_virtual: self.height,
            ..VarScreenInfo::default()
        };
        apply_depth(&mut var, self.bits_per_pixel);

        let line_length = self
            .line_length
            .unwrap_or_else(|| stride_for(self.width, self.bits_per_pixel, self.stride_padding));
        // Room for 32 bpp so depth upgrades fit
        let smem_len = self
            .smem_len
            .unwrap_or_else(|| stride_for(self.width, 32, self.stride_padding) * self.height);

        let mut fix = FixScreenInfo {
            smem_len,
            line_length,
            ..FixScreenInfo::default()
        };
        for (dst, src) in fix.id.iter_mut().zip(b"simfb") {
            *dst = *src as libc::c_char;
        }

        SimDisplay {
            shared: Rc::new(SimShared {
                fix: RefCell::new(fix),
                var: RefCell::new(var),
                stride_padding: self.stride_padding,
                faults: self.faults,
                stats: SimStats::default(),
            }),
        }
    }
}

/// A simulated display; acts as the [`FbBackend`] for its devices
#[derive(Debug, Clone)]
pub struct SimDisplay {
    shared: Rc<SimShared>,
}

impl SimDisplay {
    pub fn builder(width: u32, height: u32) -> SimDisplayBuilder {
        SimDisplayBuilder {
            width,
            height,
            bits_per_pixel: 32,
            stride_padding: 0,
            line_length: None,
            smem_len: None,
            faults: SimFaultPlan::new(),
        }
    }

    pub fn stats(&self) -> &SimStats {
        &self.shared.stats
    }

    /// The device-wide mode as it currently stands
    pub fn current_mode(&self) -> VarScreenInfo {
        *self.shared.var.borrow()
    }

    pub fn fixed_info(&self) -> FixScreenInfo {
        *self.shared.fix.borrow()
    }
}

impl FbBackend for SimDisplay {
    type Device = SimDevice;

    fn open(&self, path: &Path) -> io::Result<SimDevice> {
        if self.shared.faults.contains(SimFault::OpenFails) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: no such simulated device", path.display()),
            ));
        }
        SimStats::bump(&self.shared.stats.opens);
        Ok(SimDevice {
            shared: Rc::clone(&self.shared),
        })
    }
}

/// An open simulated device
#[derive(Debug)]
pub struct SimDevice {
    shared: Rc<SimShared>,
}

impl FbDevice for SimDevice {
    type Mapping = SimMapping;

    fn fix_screeninfo(&self) -> io::Result<FixScreenInfo> {
        if self.shared.faults.contains(SimFault::FixQueryFails) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(*self.shared.fix.borrow())
    }

    fn var_screeninfo(&self) -> io::Result<VarScreenInfo> {
        if self.shared.faults.contains(SimFault::VarQueryFails) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(*self.shared.var.borrow())
    }

    fn put_var_screeninfo(&mut self, var: &mut VarScreenInfo) -> io::Result<()> {
        let shared = &self.shared;
        if shared.faults.contains(SimFault::RejectModeChange) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        let bits = shared.faults.forced_depth().unwrap_or(var.bits_per_pixel);
        if !matches!(bits, 8 | 16 | 24 | 32) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let line_length = stride_for(var.xres_virtual, bits, shared.stride_padding);
        let needed = u64::from(line_length) * u64::from(var.yres_virtual);
        if needed > u64::from(shared.fix.borrow().smem_len) {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        let mut applied = *var;
        apply_depth(&mut applied, bits);
        *shared.var.borrow_mut() = applied;
        shared.fix.borrow_mut().line_length = line_length;
        SimStats::bump(&shared.stats.mode_changes);

        *var = applied;
        Ok(())
    }

    fn map(&mut self, len: usize) -> io::Result<SimMapping> {
        if self.shared.faults.contains(SimFault::MapFails) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        if len == 0 || len > self.shared.fix.borrow().smem_len as usize {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        SimStats::bump(&self.shared.stats.maps);
        Ok(SimMapping {
            bytes: vec![0; len],
            shared: Rc::clone(&self.shared),
        })
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        SimStats::bump(&self.shared.stats.closes);
    }
}

/// Backing store standing in for mapped device memory
#[derive(Debug)]
pub struct SimMapping {
    bytes: Vec<u8>,
    shared: Rc<SimShared>,
}

impl Deref for SimMapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for SimMapping {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for SimMapping {
    fn drop(&mut self) {
        SimStats::bump(&self.shared.stats.unmaps);
    }
}

fn stride_for(width: u32, bits_per_pixel: u32, padding: u32) -> u32 {
    width * bits_per_pixel.div_ceil(8) + padding
}

/// Sets depth and the channel layout a typical driver reports for it
fn apply_depth(var: &mut VarScreenInfo, bits_per_pixel: u32) {
    var.bits_per_pixel = bits_per_pixel;
    let (red, green, blue) = match bits_per_pixel {
        16 => (Bitfield::new(11, 5), Bitfield::new(5, 6), Bitfield::new(0, 5)),
        24 | 32 => (Bitfield::new(16, 8), Bitfield::new(8, 8), Bitfield::new(0, 8)),
        _ => (Bitfield::new(0, 8), Bitfield::new(0, 8), Bitfield::new(0, 8)),
    };
    var.red = red;
    var.green = green;
    var.blue = blue;
    var.transp = Bitfield::default();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let display = SimDisplay::builder(640, 480).build();
        let var = display.current_mode();
        let fix = display.fixed_info();
        assert_eq!((var.xres, var.yres), (640, 480));
        assert_eq!(var.bits_per_pixel, 32);
        assert_eq!(fix.line_length, 640 * 4);
        assert_eq!(fix.smem_len, 640 * 4 * 480);
        assert_eq!(fix.id(), "simfb");
    }

    #[test]
    fn test_mode_change_updates_stride() {
        let display = SimDisplay::builder(100, 10).bits_per_pixel(16).build();
        assert_eq!(display.fixed_info().line_length, 200);

        let mut device = display.open(Path::new("/dev/fb0")).unwrap();
        let mut var = device.var_screeninfo().unwrap();
        var.bits_per_pixel = 32;
        device.put_var_screeninfo(&mut var).unwrap();

        assert_eq!(display.fixed_info().line_length, 400);
        assert_eq!(display.current_mode().red, Bitfield::new(16, 8));
        assert_eq!(display.stats().mode_changes(), 1);
    }

    #[test]
    fn test_mode_change_that_does_not_fit_is_refused() {
        let display = SimDisplay::builder(100, 10).memory_len(100 * 2 * 10).build();
        let mut device = display.open(Path::new("/dev/fb0")).unwrap();
        let mut var = device.var_screeninfo().unwrap();
        var.bits_per_pixel = 32;
        let err = device.put_var_screeninfo(&mut var).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_mode_is_shared_between_opens() {
        let display = SimDisplay::builder(64, 64).bits_per_pixel(16).build();
        let mut first = display.open(Path::new("/dev/fb0")).unwrap();
        let second = display.open(Path::new("/dev/fb0")).unwrap();

        let mut var = first.var_screeninfo().unwrap();
        var.bits_per_pixel = 32;
        first.put_var_screeninfo(&mut var).unwrap();

        assert_eq!(second.var_screeninfo().unwrap().bits_per_pixel, 32);
    }

    #[test]
    fn test_forced_depth() {
        let display = SimDisplay::builder(64, 64)
            .with_fault(SimFault::ForceDepth(24))
            .build();
        let mut device = display.open(Path::new("/dev/fb0")).unwrap();
        let mut var = device.var_screeninfo().unwrap();
        var.bits_per_pixel = 32;
        device.put_var_screeninfo(&mut var).unwrap();
        assert_eq!(var.bits_per_pixel, 24);
    }

    #[test]
    fn test_stats_track_open_and_map() {
        let display = SimDisplay::builder(8, 8).build();
        {
            let mut device = display.open(Path::new("/dev/fb0")).unwrap();
            let mapping = device.map(8 * 8 * 4).unwrap();
            assert_eq!(mapping.len(), 256);
            assert_eq!(display.stats().live_mappings(), 1);
            assert_eq!(display.stats().open_devices(), 1);
        }
        assert_eq!(display.stats().live_mappings(), 0);
        assert_eq!(display.stats().open_devices(), 0);
    }

    #[test]
    fn test_map_larger_than_memory_fails() {
        let display = SimDisplay::builder(8, 8).build();
        let mut device = display.open(Path::new("/dev/fb0")).unwrap();
        assert!(device.map(8 * 8 * 4 + 1).is_err());
        assert_eq!(display.stats().maps(), 0);
    }
}

//! Linux fbdev backend (`/dev/fb*` via ioctl and mmap)

use crate::backend::{FbBackend, FbDevice};
use crate::screeninfo::{
    FixScreenInfo, VarScreenInfo, FBIOGET_FSCREENINFO, FBIOGET_VSCREENINFO, FBIOPUT_VSCREENINFO,
};
use libc::{c_ulong, c_void};
use std::fs::{File, OpenOptions};
use std::io;
use std::ops::{Deref, DerefMut};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::{self, NonNull};

/// Opens real framebuffer device nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBackend;

impl FbBackend for LinuxBackend {
    type Device = LinuxFbDevice;

    fn open(&self, path: &Path) -> io::Result<LinuxFbDevice> {
        LinuxFbDevice::open(path)
    }
}

/// An open `/dev/fb*` node
///
/// The descriptor is closed when the device is dropped.
#[derive(Debug)]
pub struct LinuxFbDevice {
    file: File,
}

impl LinuxFbDevice {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Issues `request` with `arg` as the in/out structure
    fn ioctl<T>(&self, request: c_ulong, arg: &mut T) -> io::Result<()> {
        // SAFETY: `arg` is a live, exclusively borrowed #[repr(C)] structure
        // of the type the request expects.
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg as *mut T) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl FbDevice for LinuxFbDevice {
    type Mapping = MmapRegion;

    fn fix_screeninfo(&self) -> io::Result<FixScreenInfo> {
        let mut fix = FixScreenInfo::default();
        self.ioctl(FBIOGET_FSCREENINFO, &mut fix)?;
        Ok(fix)
    }

    fn var_screeninfo(&self) -> io::Result<VarScreenInfo> {
        let mut var = VarScreenInfo::default();
        self.ioctl(FBIOGET_VSCREENINFO, &mut var)?;
        Ok(var)
    }

    fn put_var_screeninfo(&mut self, var: &mut VarScreenInfo) -> io::Result<()> {
        self.ioctl(FBIOPUT_VSCREENINFO, var)
    }

    fn map(&mut self, len: usize) -> io::Result<MmapRegion> {
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot map zero bytes",
            ));
        }

        // SAFETY: a fresh shared mapping of our own descriptor; the kernel
        // validates `len` against the device.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                self.file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;
        Ok(MmapRegion { ptr, len })
    }
}

/// A shared, writable mapping of framebuffer memory
///
/// Unmapped when dropped.
#[derive(Debug)]
pub struct MmapRegion {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the region is exclusively owned; access goes through &self/&mut self.
unsafe impl Send for MmapRegion {}

impl Deref for MmapRegion {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr..ptr+len was mapped readable and stays mapped until drop.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for MmapRegion {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, mapped writable and borrowed exclusively.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MmapRegion {
    fn drop(&mut self) {
        // SAFETY: unmaps exactly the range returned by mmap, once.
        let ret = unsafe { libc::munmap(self.ptr.as_ptr().cast::<c_void>(), self.len) };
        if ret < 0 {
            log::warn!(
                "munmap of {} framebuffer bytes failed: {}",
                self.len,
                io::Error::last_os_error()
            );
        }
    }
}

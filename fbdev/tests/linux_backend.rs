//! Linux Backend Tests
//!
//! Exercises the real ioctl/mmap backend against files that are not
//! framebuffer devices, which must fail cleanly at the right step.

use fbdev::{FbBackend, FbConfig, FbDevice, FbError, FramebufferHandle, LinuxBackend};
use std::io::Write;

#[test]
fn test_missing_device_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fb9");
    let config = FbConfig::default().with_device(&path);

    let result = FramebufferHandle::acquire_with(&config);

    match result {
        Err(FbError::Open { path: reported, source }) => {
            assert_eq!(reported, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected open error, got {:?}", other),
    }
}

#[test]
fn test_regular_file_fails_screeninfo_query() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0u8; 4096]).unwrap();
    let config = FbConfig::default().with_device(file.path());

    let result = FramebufferHandle::acquire_with(&config);

    // Regular files reject framebuffer ioctls (usually ENOTTY)
    match result {
        Err(FbError::Query { request, source }) => {
            assert_eq!(request, "FBIOGET_FSCREENINFO");
            assert!(source.raw_os_error().is_some());
        }
        other => panic!("expected query error, got {:?}", other),
    }
}

#[test]
fn test_regular_file_can_be_mapped_shared() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0u8; 4096]).unwrap();
    file.flush().unwrap();

    let mut device = LinuxBackend.open(file.path()).unwrap();
    {
        let mut mapping = device.map(4096).unwrap();
        assert_eq!(mapping.len(), 4096);
        mapping[10] = 0x5A;
    }

    // MAP_SHARED writes reach the underlying file
    let contents = std::fs::read(file.path()).unwrap();
    assert_eq!(contents[10], 0x5A);
}

#[test]
fn test_zero_length_map_is_refused() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut device = LinuxBackend.open(file.path()).unwrap();
    let err = device.map(0).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

//! Environment Device Tests
//!
//! `FramebufferHandle::acquire` reads `$FRAMEBUFFER`. Kept in its own test
//! binary so the environment is not shared with other tests.

use fbdev::config::DEVICE_ENV_VAR;
use fbdev::{FbError, FramebufferHandle};

#[test]
fn test_acquire_uses_framebuffer_env_var() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fb7");
    std::env::set_var(DEVICE_ENV_VAR, &path);

    let result = FramebufferHandle::acquire();

    std::env::remove_var(DEVICE_ENV_VAR);
    match result {
        Err(FbError::Open {
            path: reported,
            source,
        }) => {
            assert_eq!(reported, path);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected open error, got {:?}", other),
    }
}

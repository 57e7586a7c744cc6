use crate::error::{CameraError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::SystemTime;
use tracing::{debug, info};

/// Pixel layout of live frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
        }
    }
}

/// One live frame from an open camera.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub timestamp: SystemTime,
}

impl CameraFrame {
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    pub fn is_valid_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }
}

/// A camera device behind the platform's permission gate.
///
/// Exactly one holder drives a camera at a time: the scan session owns
/// its source exclusively and releases it the moment a still is frozen
/// or the session ends. `close` is idempotent and must not fail the
/// workflow, so it does not return a result.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Acquire the device and begin the live stream.
    async fn open(&mut self) -> Result<()>;

    /// The latest live frame. Only valid while open.
    async fn grab_frame(&mut self) -> Result<CameraFrame>;

    /// Release the device.
    async fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Camera that renders a synthetic pattern, used when no device exists.
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    open: bool,
    frame_counter: u64,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            open: false,
            frame_counter: 0,
        }
    }
}

#[async_trait]
impl CameraSource for TestPatternCamera {
    async fn open(&mut self) -> Result<()> {
        info!(
            "Opening {}x{} test pattern camera",
            self.width, self.height
        );
        self.open = true;
        Ok(())
    }

    async fn grab_frame(&mut self) -> Result<CameraFrame> {
        if !self.open {
            return Err(CameraError::NotActive.into());
        }

        self.frame_counter += 1;
        let phase = (self.frame_counter % 256) as u32;

        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x * 255) / self.width.max(1)) as u8);
                data.push(((y * 255) / self.height.max(1)) as u8);
                data.push(((x + y + phase) % 256) as u8);
            }
        }

        Ok(CameraFrame {
            data: Bytes::from(data),
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgb24,
            timestamp: SystemTime::now(),
        })
    }

    async fn close(&mut self) {
        if self.open {
            debug!("Test pattern camera released");
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Camera whose permission gate always refuses, for exercising the
/// denied path.
pub struct DeniedCamera;

#[async_trait]
impl CameraSource for DeniedCamera {
    async fn open(&mut self) -> Result<()> {
        Err(CameraError::AccessDenied.into())
    }

    async fn grab_frame(&mut self) -> Result<CameraFrame> {
        Err(CameraError::NotActive.into())
    }

    async fn close(&mut self) {}

    fn is_open(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pattern_camera_produces_full_frames() {
        let mut camera = TestPatternCamera::new(32, 16);
        camera.open().await.unwrap();

        let frame = camera.grab_frame().await.unwrap();
        assert_eq!(frame.width, 32);
        assert_eq!(frame.height, 16);
        assert!(frame.is_valid_size());

        camera.close().await;
        assert!(!camera.is_open());
        assert!(camera.grab_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_denied_camera_refuses_open() {
        let mut camera = DeniedCamera;
        let err = camera.open().await.unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }
}

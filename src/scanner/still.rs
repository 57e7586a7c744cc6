use crate::error::{CameraError, Result};
use crate::scanner::camera::{CameraFrame, PixelFormat};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use std::time::SystemTime;
use tracing::debug;

/// A frozen, JPEG-compressed capture of one live frame.
///
/// This is what survives after the camera is released: the preview, the
/// upload payload, and the backdrop of the result phase all come from
/// the same still.
#[derive(Debug, Clone)]
pub struct StillImage {
    pub jpeg: Bytes,
    pub width: u32,
    pub height: u32,
    pub captured_at: SystemTime,
}

impl StillImage {
    /// Freeze a live frame into a compressed still.
    pub fn from_frame(frame: &CameraFrame, quality: u8) -> Result<Self> {
        if !frame.is_valid_size() {
            return Err(CameraError::Encoding {
                details: format!(
                    "frame data is {} bytes, expected {}",
                    frame.data.len(),
                    frame.expected_size()
                ),
            }
            .into());
        }

        let color_type = match frame.format {
            PixelFormat::Rgb24 => image::ColorType::Rgb8,
        };

        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
        encoder
            .encode(&frame.data, frame.width, frame.height, color_type)
            .map_err(|e| CameraError::Encoding {
                details: e.to_string(),
            })?;

        debug!(
            "Encoded {}x{} frame into {} byte still",
            frame.width,
            frame.height,
            jpeg.len()
        );

        Ok(Self {
            jpeg: Bytes::from(jpeg),
            width: frame.width,
            height: frame.height,
            captured_at: frame.timestamp,
        })
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::camera::{CameraSource, TestPatternCamera};

    #[tokio::test]
    async fn test_still_encodes_jpeg() {
        let mut camera = TestPatternCamera::new(64, 48);
        camera.open().await.unwrap();
        let frame = camera.grab_frame().await.unwrap();

        let still = StillImage::from_frame(&frame, 90).unwrap();

        assert!(!still.is_empty());
        assert_eq!(still.width, 64);
        assert_eq!(still.height, 48);
        // JPEG SOI marker
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame {
            data: Bytes::from_static(&[0u8; 10]),
            width: 64,
            height: 48,
            format: PixelFormat::Rgb24,
            timestamp: SystemTime::now(),
        };

        assert!(StillImage::from_frame(&frame, 90).is_err());
    }
}

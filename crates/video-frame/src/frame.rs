//! Video frame types and processing

use image::RgbImage;

use crate::FrameError;

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        let frame = Self {
            data,
            width,
            height,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Create a frame where every pixel has the same color
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Wrap an `image` RGB buffer
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }

    /// Copy into an `image` RGB buffer
    pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        self.validate()?;
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::BufferSize {
                expected: self.expected_len(),
                actual: self.data.len(),
            },
        )
    }

    /// Check that dimensions are non-zero and match the buffer length
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.expected_len();
        if self.data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let pixel = self.data.get(idx..idx + 3)?;
        Some([pixel[0], pixel[1], pixel[2]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> Vec<u8> {
        let mut gray = Vec::with_capacity(self.data.len() / 3);
        for pixel in self.data.chunks_exact(3) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = (pixel[0] as f32 * 0.299
                   + pixel[1] as f32 * 0.587
                   + pixel[2] as f32 * 0.114)
                .round() as u8;
            gray.push(y);
        }
        gray
    }

    /// Mean luminance over all pixels (0-255)
    pub fn mean_brightness(&self) -> f64 {
        let gray = self.to_grayscale();
        if gray.is_empty() {
            return 0.0;
        }
        let sum: u64 = gray.iter().map(|&v| v as u64).sum();
        sum as f64 / gray.len() as f64
    }
}

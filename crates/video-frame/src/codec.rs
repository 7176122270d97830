//! JPEG encoding and image decoding for snapshot and calibration payloads

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::{FrameError, VideoFrame};

/// Encode a frame as JPEG
pub fn encode_jpeg(frame: &VideoFrame, quality: u8) -> Result<Vec<u8>, FrameError> {
    frame.validate()?;
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| FrameError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Encode a frame as JPEG and wrap it in standard base64
pub fn encode_base64_jpeg(frame: &VideoFrame, quality: u8) -> Result<String, FrameError> {
    let jpeg = encode_jpeg(frame, quality)?;
    Ok(STANDARD.encode(jpeg))
}

/// Decode any image format `image` understands into an RGB frame
pub fn decode_image(bytes: &[u8]) -> Result<VideoFrame, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    let decoded = image::load_from_memory(bytes).map_err(|e| FrameError::Decode(e.to_string()))?;
    let frame = VideoFrame::from_rgb_image(decoded.to_rgb8());
    frame.validate()?;
    Ok(frame)
}

/// Decode a base64 image payload.
///
/// Accepts bare base64 or a data URL (`data:image/jpeg;base64,...`); everything
/// up to the first comma is treated as the URL header.
pub fn decode_base64_image(payload: &str) -> Result<VideoFrame, FrameError> {
    let body = match payload.split_once(',') {
        Some((_, body)) => body,
        None => payload,
    };
    let body = body.trim();
    if body.is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    let bytes = STANDARD
        .decode(body)
        .map_err(|e| FrameError::Base64(e.to_string()))?;
    debug!("Decoded {} byte image payload", bytes.len());
    decode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128]);
            }
        }
        VideoFrame::new(data, width, height).unwrap()
    }

    #[test]
    fn test_jpeg_payload_decodes_to_same_dimensions() {
        let frame = gradient_frame(48, 32);
        let payload = encode_base64_jpeg(&frame, 95).unwrap();
        let decoded = decode_base64_image(&payload).unwrap();
        assert_eq!((decoded.width, decoded.height), (48, 32));
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let frame = gradient_frame(16, 16);
        let payload = format!("data:image/jpeg;base64,{}", encode_base64_jpeg(&frame, 90).unwrap());
        let decoded = decode_base64_image(&payload).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 16));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(decode_base64_image(""), Err(FrameError::EmptyPayload));
        assert_eq!(decode_base64_image("data:image/png;base64,"), Err(FrameError::EmptyPayload));
        assert_eq!(decode_image(&[]), Err(FrameError::EmptyPayload));
    }

    #[test]
    fn test_garbage_payload() {
        assert!(matches!(decode_base64_image("not base64!!"), Err(FrameError::Base64(_))));
        let not_an_image = STANDARD.encode(b"plain text, not pixels");
        assert!(matches!(decode_base64_image(&not_an_image), Err(FrameError::Decode(_))));
    }

    #[test]
    fn test_encode_rejects_invalid_frame() {
        let frame = VideoFrame {
            data: vec![0; 5],
            width: 2,
            height: 2,
        };
        assert!(matches!(encode_jpeg(&frame, 90), Err(FrameError::BufferSize { .. })));
    }
}

//! Video Frame Library for Exam Proctoring
//!
//! Frame plumbing shared by the proctoring engine:
//! - Decoded RGB frames with luminance helpers
//! - JPEG encoding and image/base64 decoding for evidence snapshots
//! - Bounding box, label and banner overlays for annotated snapshots

pub mod codec;
pub mod frame;
pub mod overlay;
pub mod text;

pub use codec::{decode_base64_image, decode_image, encode_base64_jpeg, encode_jpeg};
pub use frame::VideoFrame;
pub use overlay::{draw_overlays, BoxOverlay};
pub use text::{draw_text_mut, text_height, text_width, TextOverlay};

use thiserror::Error;

/// Frame error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Empty image payload")]
    EmptyPayload,

    #[error("Base64 decoding failed: {0}")]
    Base64(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),
}

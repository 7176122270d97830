//! Box, label and banner overlays for annotated snapshots

use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use image::Rgb;

use crate::text::{draw_text_mut, text_height, TextOverlay};
use crate::{FrameError, VideoFrame};

/// Glyph scale for box labels
const LABEL_SCALE: u32 = 2;

/// Box to draw, in pixel coordinates (x1, y1) top-left to (x2, y2) bottom-right
#[derive(Debug, Clone, PartialEq)]
pub struct BoxOverlay {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: [u8; 3],
    /// Drawn above the box in the box color, or inside it at the top edge
    pub label: Option<String>,
}

/// Draw hollow boxes with their labels, then free text, on a copy of the frame.
///
/// Boxes are clipped to the frame; boxes with no visible area are skipped.
pub fn draw_overlays(
    frame: &VideoFrame,
    boxes: &[BoxOverlay],
    texts: &[TextOverlay],
    thickness: u32,
) -> Result<VideoFrame, FrameError> {
    let mut canvas = frame.to_rgb_image()?;
    let max_x = frame.width as f32;
    let max_y = frame.height as f32;

    for overlay in boxes {
        let x1 = overlay.x1.min(overlay.x2).clamp(0.0, max_x) as i64;
        let y1 = overlay.y1.min(overlay.y2).clamp(0.0, max_y) as i64;
        let x2 = overlay.x1.max(overlay.x2).clamp(0.0, max_x) as i64;
        let y2 = overlay.y1.max(overlay.y2).clamp(0.0, max_y) as i64;

        for inset in 0..thickness.max(1) as i64 {
            let width = x2 - x1 - 2 * inset;
            let height = y2 - y1 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at((x1 + inset) as i32, (y1 + inset) as i32).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut canvas, rect, Rgb(overlay.color));
        }

        if let Some(label) = &overlay.label {
            let gap = (2 * LABEL_SCALE) as i64;
            let above = y1 - gap - text_height(LABEL_SCALE) as i64;
            let y = if above >= 0 { above } else { y1 + thickness as i64 + gap };
            draw_text_mut(
                &mut canvas,
                &TextOverlay {
                    x: x1 as i32,
                    y: y as i32,
                    text: label.clone(),
                    color: overlay.color,
                    scale: LABEL_SCALE,
                },
            );
        }
    }

    for text in texts {
        draw_text_mut(&mut canvas, text);
    }

    Ok(VideoFrame::from_rgb_image(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    fn plain(x1: f32, y1: f32, x2: f32, y2: f32) -> BoxOverlay {
        BoxOverlay { x1, y1, x2, y2, color: RED, label: None }
    }

    fn count(frame: &VideoFrame, color: [u8; 3], rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..frame.width).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y) == Some(color))
            .count()
    }

    #[test]
    fn test_box_edges_are_drawn() {
        let frame = VideoFrame::filled(20, 20, [0, 0, 0]);
        let boxes = [plain(5.0, 5.0, 15.0, 15.0)];
        let annotated = draw_overlays(&frame, &boxes, &[], 1).unwrap();

        assert_eq!(annotated.get_pixel(5, 5), Some(RED));
        assert_eq!(annotated.get_pixel(14, 10), Some(RED));
        assert_eq!(annotated.get_pixel(10, 10), Some([0, 0, 0]));
        // Source frame untouched
        assert_eq!(frame.get_pixel(5, 5), Some([0, 0, 0]));
    }

    #[test]
    fn test_thickness_draws_inner_rings() {
        let frame = VideoFrame::filled(20, 20, [0, 0, 0]);
        let boxes = [plain(2.0, 2.0, 18.0, 18.0)];
        let annotated = draw_overlays(&frame, &boxes, &[], 3).unwrap();

        assert_eq!(annotated.get_pixel(4, 10), Some(RED));
        assert_eq!(annotated.get_pixel(5, 10), Some([0, 0, 0]));
    }

    #[test]
    fn test_out_of_frame_boxes_are_clipped() {
        let frame = VideoFrame::filled(10, 10, [0, 0, 0]);
        let boxes = [plain(-50.0, -50.0, 500.0, 500.0), plain(30.0, 30.0, 40.0, 40.0)];
        let annotated = draw_overlays(&frame, &boxes, &[], 2).unwrap();
        assert_eq!(annotated.get_pixel(0, 0), Some(RED));
        assert_eq!((annotated.width, annotated.height), (10, 10));
    }

    #[test]
    fn test_label_above_box() {
        let frame = VideoFrame::filled(100, 100, [0, 0, 0]);
        let boxes = [BoxOverlay {
            label: Some("PHONE 0.87".into()),
            ..plain(10.0, 40.0, 80.0, 90.0)
        }];
        let annotated = draw_overlays(&frame, &boxes, &[], 1).unwrap();

        // Label rows sit between y=26 and y=36, clear of the box edge at y=40
        assert!(count(&annotated, RED, 26..36) > 20);
        assert_eq!(count(&frame, RED, 0..100), 0);
    }

    #[test]
    fn test_label_moves_inside_box_at_top_edge() {
        let frame = VideoFrame::filled(100, 100, [0, 0, 0]);
        let boxes = [BoxOverlay {
            label: Some("BOOK".into()),
            ..plain(10.0, 0.0, 80.0, 90.0)
        }];
        let annotated = draw_overlays(&frame, &boxes, &[], 1).unwrap();
        let bare = draw_overlays(&frame, &[plain(10.0, 0.0, 80.0, 90.0)], &[], 1).unwrap();
        assert!(count(&annotated, RED, 5..15) > count(&bare, RED, 5..15) + 10);
    }

    #[test]
    fn test_free_text_is_drawn() {
        let frame = VideoFrame::filled(120, 40, [0, 0, 0]);
        let banner = TextOverlay {
            x: 4,
            y: 4,
            text: "NO PERSON DETECTED!".into(),
            color: RED,
            scale: 1,
        };
        let annotated = draw_overlays(&frame, &[], &[banner], 3).unwrap();
        assert!(count(&annotated, RED, 4..9) > 30);
        assert_eq!(count(&annotated, RED, 9..40), 0);
    }
}

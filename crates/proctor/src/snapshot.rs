//! Evidence snapshot annotation

use video_frame::{draw_overlays, text_height, FrameError, TextOverlay, VideoFrame};

use crate::analysis::{Violation, ViolationType};
use crate::objects::ObjectFindings;

const BOX_THICKNESS: u32 = 3;
const BANNER_COLOR: [u8; 3] = [255, 0, 0];

/// Banner text and line for a violation; objects are labeled on their boxes instead
fn banner(violation: &Violation) -> Option<(usize, String)> {
    match violation.kind {
        ViolationType::NoPerson => Some((0, "NO PERSON DETECTED!".to_string())),
        ViolationType::MultipleFaces => Some((1, "MULTIPLE PEOPLE DETECTED!".to_string())),
        ViolationType::LookingAway => Some((
            2,
            format!("LOOKING AWAY! ({:.2})", violation.confidence.unwrap_or_default()),
        )),
        ViolationType::PhoneDetected | ViolationType::BookDetected => None,
    }
}

/// Glyph scale for banners, grows with frame width
fn banner_scale(width: u32) -> u32 {
    (width / 200).clamp(1, 4)
}

/// Copy of the frame with labeled object boxes and a banner per
/// presence or gaze violation
pub fn annotate_snapshot(
    frame: &VideoFrame,
    findings: &ObjectFindings,
    violations: &[Violation],
) -> Result<VideoFrame, FrameError> {
    let scale = banner_scale(frame.width);
    let margin = 4 * scale;
    let line = text_height(scale) + 3 * scale;

    let banners: Vec<TextOverlay> = violations
        .iter()
        .filter_map(banner)
        .map(|(row, text)| TextOverlay {
            x: margin as i32,
            y: (margin + row as u32 * line) as i32,
            text,
            color: BANNER_COLOR,
            scale,
        })
        .collect();

    draw_overlays(frame, &findings.overlays(), &banners, BOX_THICKNESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;
    use crate::objects::ObjectViolationMapper;
    use crate::testing::object;

    fn red_pixels(frame: &VideoFrame, rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..frame.width).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y) == Some(BANNER_COLOR))
            .count()
    }

    #[test]
    fn test_no_person_banner() {
        let frame = VideoFrame::filled(640, 480, [0, 0, 0]);
        let violations = [Violation::new(ViolationType::NoPerson, Severity::High, "No person detected in frame")];
        let annotated = annotate_snapshot(&frame, &ObjectFindings::default(), &violations).unwrap();

        // scale 3: first line spans y=12..27, the second line is empty
        assert!(red_pixels(&annotated, 12..27) > 100);
        assert_eq!(red_pixels(&annotated, 27..480), 0);
    }

    #[test]
    fn test_banners_use_separate_lines() {
        let frame = VideoFrame::filled(640, 480, [0, 0, 0]);
        let violations = [
            Violation::new(ViolationType::MultipleFaces, Severity::High, "2 people detected in frame"),
            Violation::new(ViolationType::LookingAway, Severity::High, "looking away").with_confidence(0.94),
        ];
        let annotated = annotate_snapshot(&frame, &ObjectFindings::default(), &violations).unwrap();

        assert_eq!(red_pixels(&annotated, 12..27), 0);
        assert!(red_pixels(&annotated, 36..51) > 100);
        assert!(red_pixels(&annotated, 60..75) > 100);
    }

    #[test]
    fn test_object_boxes_are_labeled() {
        let frame = VideoFrame::filled(200, 200, [0, 0, 0]);
        let findings = ObjectViolationMapper::default().map(&[object("book", 0.9)]);
        let violations = findings.violations();
        let annotated = annotate_snapshot(&frame, &findings, &violations).unwrap();

        let blue = [0, 0, 255];
        assert_eq!(annotated.get_pixel(40, 100), Some(blue));
        // "BOOK 0.90" sits above the box top edge at y=40
        let label = (26..36)
            .flat_map(|y| (40..120).map(move |x| (x, y)))
            .filter(|&(x, y)| annotated.get_pixel(x, y) == Some(blue))
            .count();
        assert!(label > 20);
        assert_eq!(red_pixels(&annotated, 0..200), 0);
    }

    #[test]
    fn test_clean_frame_is_unchanged() {
        let frame = VideoFrame::filled(64, 48, [90, 90, 90]);
        let annotated = annotate_snapshot(&frame, &ObjectFindings::default(), &[]).unwrap();
        assert_eq!(annotated, frame);
    }
}

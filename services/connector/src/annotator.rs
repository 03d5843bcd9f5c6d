//! Frame annotation: JPEG codec adapter plus the geometry renderer that
//! draws detections onto a frame before it is uploaded.

use crate::config::{AnnotationConfig, AnnotationStyle};
use crate::sae::{Detection, VideoFrame};
use ab_glyph::FontVec;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, warn};

/// JPEG quality used when re-encoding annotated frames.
pub const JPEG_QUALITY: u8 = 90;

/// Annotation color (red, matching the original BGR (0,0,255)).
const ANNOTATION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Radius of the filled circles drawn by the center-point style.
const CENTER_POINT_RADIUS: i32 = 20;

/// Approximate pixel height of a glyph at font scale 1.0.
const LABEL_FONT_BASE_PX: f32 = 22.0;

/// Vertical gap between a box and its label.
const LABEL_OFFSET_PX: i32 = 10;

/// Errors from decoding or re-encoding frame image data
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode frame image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode annotated image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode an encoded (JPEG) byte buffer into an RGB raster image
pub fn decode_jpeg(bytes: &[u8]) -> Result<RgbImage, CodecError> {
    let img = image::load_from_memory(bytes).map_err(CodecError::Decode)?;
    Ok(img.to_rgb8())
}

/// Re-encode a raster image as JPEG at [`JPEG_QUALITY`]
pub fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(img)
        .map_err(CodecError::Encode)?;
    Ok(out)
}

/// Convert one normalized coordinate to a pixel coordinate.
///
/// Values outside [0, 1] map proportionally outside the image; callers draw
/// them as-is (intentional passthrough, not clamped).
pub fn to_pixel(norm: f32, dim: u32) -> i32 {
    (norm * dim as f32).round() as i32
}

/// Outline width for a frame of the given dimensions
pub fn line_width(width: u32, height: u32) -> i32 {
    let w = ((width + height) as f32 / 2.0 * 0.002).round() as i32;
    w.max(2)
}

/// Label text for a detection: `ID xxxx - class - conf` when an object
/// identifier is present, `class - conf` otherwise.
pub fn build_label(detection: &Detection) -> String {
    match detection.object_id.as_deref() {
        Some(id) if !id.is_empty() => {
            let hex: String = id.iter().take(2).map(|b| format!("{b:02x}")).collect();
            format!(
                "ID {} - {} - {:.2}",
                hex, detection.class_id, detection.confidence
            )
        }
        _ => format!("{} - {:.2}", detection.class_id, detection.confidence),
    }
}

/// Renders detections onto decoded frames
pub struct Annotator {
    style: AnnotationStyle,
    font: Option<FontVec>,
}

impl Annotator {
    /// Create an annotator, loading the label font eagerly
    pub fn new(config: &AnnotationConfig) -> Self {
        let font = load_font(config);
        if font.is_none() {
            warn!("No label font available, boxes will be drawn without labels");
        }
        Self {
            style: config.style,
            font,
        }
    }

    /// Decode the frame image, draw its detections and re-encode as JPEG
    pub fn render(
        &self,
        frame: &VideoFrame,
        detections: &[Detection],
    ) -> Result<Vec<u8>, CodecError> {
        let mut img = decode_jpeg(&frame.frame_data_jpeg)?;

        match self.style {
            AnnotationStyle::Boxes => self.draw_boxes(&mut img, detections),
            AnnotationStyle::CenterPoints => {
                self.draw_center_points(&mut img, detections, frame.timestamp_utc_ms)
            }
        }

        encode_jpeg(&img)
    }

    /// Draw a labelled rectangle for every detection, in message order
    fn draw_boxes(&self, img: &mut RgbImage, detections: &[Detection]) {
        let (w, h) = (img.width(), img.height());
        let thickness = line_width(w, h);

        for detection in detections {
            let Some(bbox) = detection.bounding_box else {
                continue;
            };

            let x1 = to_pixel(bbox.min_x, w);
            let y1 = to_pixel(bbox.min_y, h);
            let x2 = to_pixel(bbox.max_x, w);
            let y2 = to_pixel(bbox.max_y, h);

            let (lo_x, hi_x) = (x1.min(x2), x1.max(x2));
            let (lo_y, hi_y) = (y1.min(y2), y1.max(y2));
            let rect_w = (hi_x - lo_x) as u32 + 1;
            let rect_h = (hi_y - lo_y) as u32 + 1;

            for t in 0..thickness {
                let rect = Rect::at(lo_x - t, lo_y - t)
                    .of_size(rect_w + (2 * t) as u32, rect_h + (2 * t) as u32);
                draw_hollow_rect_mut(img, rect, ANNOTATION_COLOR);
            }

            if let Some(ref font) = self.font {
                let label = build_label(detection);
                let scale = thickness as f32 / 4.0 * LABEL_FONT_BASE_PX;
                let stroke = ((thickness as f32 / 3.0).round() as i32).max(1);
                let label_y = lo_y - LABEL_OFFSET_PX - scale.round() as i32;

                // Horizontal 1px re-draws stand in for stroke thickness.
                for dx in 0..stroke {
                    draw_text_mut(img, ANNOTATION_COLOR, lo_x + dx, label_y, scale, font, &label);
                }
            }
        }
    }

    /// Draw filled circles at the centers of detections whose timestamp
    /// matches the frame's
    fn draw_center_points(&self, img: &mut RgbImage, detections: &[Detection], frame_ts: u64) {
        let (w, h) = (img.width(), img.height());

        for detection in detections {
            if detection.timestamp_utc_ms != frame_ts {
                continue;
            }
            let Some(bbox) = detection.bounding_box else {
                continue;
            };

            let cx = to_pixel((bbox.min_x + bbox.max_x) / 2.0, w);
            let cy = to_pixel((bbox.min_y + bbox.max_y) / 2.0, h);
            draw_filled_circle_mut(img, (cx, cy), CENTER_POINT_RADIUS, ANNOTATION_COLOR);
        }
    }
}

/// Load the label font from the configured path, falling back to well-known
/// system font locations.
fn load_font(config: &AnnotationConfig) -> Option<FontVec> {
    if let Some(ref path) = config.font_path {
        match std::fs::read(path).ok().and_then(|data| FontVec::try_from_vec(data).ok()) {
            Some(font) => return Some(font),
            None => warn!(path = %path.display(), "Failed to load configured font"),
        }
    }

    let fallback_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
    ];

    for path in &fallback_paths {
        if let Some(font) = std::fs::read(path)
            .ok()
            .and_then(|data| FontVec::try_from_vec(data).ok())
        {
            debug!(path, "Loaded label font");
            return Some(font);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sae::BoundingBox;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn detection(bbox: [f32; 4], class_id: i32, confidence: f32) -> Detection {
        Detection {
            bounding_box: Some(BoundingBox {
                min_x: bbox[0],
                min_y: bbox[1],
                max_x: bbox[2],
                max_y: bbox[3],
            }),
            confidence,
            class_id,
            object_id: None,
            timestamp_utc_ms: 0,
        }
    }

    fn annotator(style: AnnotationStyle) -> Annotator {
        // Built directly so tests never depend on system fonts being present.
        Annotator { style, font: None }
    }

    #[test]
    fn test_to_pixel_inside_bounds() {
        assert_eq!(to_pixel(0.0, 100), 0);
        assert_eq!(to_pixel(0.1, 100), 10);
        assert_eq!(to_pixel(0.5, 100), 50);
        assert_eq!(to_pixel(1.0, 100), 100);
    }

    #[test]
    fn test_to_pixel_outside_bounds_is_proportional() {
        assert_eq!(to_pixel(1.5, 100), 150);
        assert_eq!(to_pixel(-0.25, 100), -25);
    }

    #[test]
    fn test_line_width_has_floor_of_two() {
        assert_eq!(line_width(100, 100), 2);
        assert_eq!(line_width(640, 480), 2);
    }

    #[test]
    fn test_line_width_scales_with_resolution() {
        // (1920 + 1080) / 2 * 0.002 = 3
        assert_eq!(line_width(1920, 1080), 3);
        // (4000 + 2000) / 2 * 0.002 = 6
        assert_eq!(line_width(4000, 2000), 6);
    }

    #[test]
    fn test_label_without_object_id() {
        let det = detection([0.1, 0.1, 0.5, 0.5], 3, 0.8734);
        assert_eq!(build_label(&det), "3 - 0.87");
    }

    #[test]
    fn test_label_with_object_id() {
        let mut det = detection([0.1, 0.1, 0.5, 0.5], 7, 0.5);
        det.object_id = Some(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(build_label(&det), "ID dead - 7 - 0.50");
    }

    #[test]
    fn test_empty_object_id_treated_as_absent() {
        let mut det = detection([0.0, 0.0, 1.0, 1.0], 1, 0.999);
        det.object_id = Some(vec![]);
        assert_eq!(build_label(&det), "1 - 1.00");
    }

    #[test]
    fn test_boxes_drawn_at_expected_pixels() {
        let mut img = RgbImage::new(100, 100);
        let dets = vec![detection([0.1, 0.1, 0.5, 0.5], 3, 0.8734)];

        annotator(AnnotationStyle::Boxes).draw_boxes(&mut img, &dets);

        // Rectangle outline at (10,10)-(50,50).
        assert_eq!(*img.get_pixel(10, 10), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(50, 50), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(30, 10), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(50, 30), ANNOTATION_COLOR);
        // Second thickness ring.
        assert_eq!(*img.get_pixel(9, 9), ANNOTATION_COLOR);
        // Interior and far exterior untouched.
        assert_eq!(*img.get_pixel(30, 30), BLACK);
        assert_eq!(*img.get_pixel(80, 80), BLACK);
    }

    #[test]
    fn test_out_of_bounds_box_drawn_without_clamping() {
        let mut img = RgbImage::new(100, 100);
        let dets = vec![detection([0.8, 0.8, 1.5, 1.5], 0, 0.9)];

        // Box maps to (80,80)-(150,150); only the in-image part is visible.
        annotator(AnnotationStyle::Boxes).draw_boxes(&mut img, &dets);

        assert_eq!(*img.get_pixel(99, 80), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(80, 99), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(50, 50), BLACK);
    }

    #[test]
    fn test_center_points_only_draws_matching_timestamps() {
        let mut img = RgbImage::new(100, 100);
        let mut matching = detection([0.1, 0.1, 0.5, 0.5], 0, 0.9);
        matching.timestamp_utc_ms = 42;
        let mut stale = detection([0.6, 0.6, 0.8, 0.8], 0, 0.9);
        stale.timestamp_utc_ms = 41;

        let frame = VideoFrame {
            source_id: String::new(),
            timestamp_utc_ms: 42,
            shape: None,
            frame_data_jpeg: vec![],
            camera_location: None,
        };
        annotator(AnnotationStyle::CenterPoints).draw_center_points(
            &mut img,
            &[matching, stale],
            frame.timestamp_utc_ms,
        );

        // Center of the matching box (30,30) is filled, the stale one (70,70) is not.
        assert_eq!(*img.get_pixel(30, 30), ANNOTATION_COLOR);
        assert_eq!(*img.get_pixel(70, 70), BLACK);
    }

    #[test]
    fn test_jpeg_round_trip_preserves_dimensions() {
        let img = RgbImage::new(64, 48);
        let encoded = encode_jpeg(&img).unwrap();
        let decoded = decode_jpeg(&encoded).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_jpeg(&[0x00, 0x01, 0x02]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_render_full_pass() {
        let img = RgbImage::new(100, 100);
        let frame = VideoFrame {
            source_id: "cam".to_string(),
            timestamp_utc_ms: 1,
            shape: None,
            frame_data_jpeg: encode_jpeg(&img).unwrap(),
            camera_location: None,
        };
        let dets = vec![detection([0.1, 0.1, 0.5, 0.5], 3, 0.8734)];

        let artifact = annotator(AnnotationStyle::Boxes).render(&frame, &dets).unwrap();

        let annotated = decode_jpeg(&artifact).unwrap();
        assert_eq!(annotated.dimensions(), (100, 100));
        // JPEG compression shifts exact values; the outline must still be
        // strongly red against the black background.
        let p = annotated.get_pixel(30, 10);
        assert!(p[0] > 150 && p[1] < 100 && p[2] < 100, "expected red outline, got {p:?}");
    }
}

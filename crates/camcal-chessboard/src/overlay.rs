//! Detection overlay drawn onto the inspected frame.

use crate::detector::ChessboardDetection;
use camcal_core::Corner;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

const CIRCLE_RADIUS: i32 = 4;

/// Per-row colors, cycled for boards with more rows.
const ROW_COLORS: [[u8; 3]; 7] = [
    [255, 0, 0],
    [255, 128, 0],
    [200, 200, 0],
    [0, 255, 0],
    [0, 200, 200],
    [0, 0, 255],
    [255, 0, 255],
];

const MISS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

fn row_color(row: usize) -> Rgb<u8> {
    Rgb(ROW_COLORS[row % ROW_COLORS.len()])
}

#[inline]
fn center(x: f32, y: f32) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

/// Draw a found board: one colored circle per corner, connected in
/// row-major order, each row in its own color.
pub fn draw_detection(image: &mut RgbImage, detection: &ChessboardDetection) {
    let width = detection.pattern_width as usize;
    let mut previous: Option<(f32, f32)> = None;

    for (k, corner) in detection.corners.iter().enumerate() {
        let color = row_color(k / width.max(1));
        let p = (corner.position.x, corner.position.y);
        if let Some(prev) = previous {
            draw_line_segment_mut(image, prev, p, color);
        }
        draw_hollow_circle_mut(image, center(p.0, p.1), CIRCLE_RADIUS, color);
        previous = Some(p);
    }
}

/// Draw raw candidates of a board that was not found.
pub fn draw_candidates(image: &mut RgbImage, candidates: &[Corner]) {
    for c in candidates {
        draw_hollow_circle_mut(
            image,
            center(c.position.x, c.position.y),
            CIRCLE_RADIUS,
            MISS_COLOR,
        );
    }
}

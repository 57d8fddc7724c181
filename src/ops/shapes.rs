use rayon::prelude::*;

use crate::canvas::{Pixel, PixelBuffer};

/// Outline shapes drawn from a fixed anchor to the current pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Square,
    Circle,
    Triangle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Square => "square",
            ShapeKind::Circle => "circle",
            ShapeKind::Triangle => "triangle",
        }
    }
}

/// Color and line width of the selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Pixel,
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: image::Rgba([0, 0, 0, 255]),
            width: 5.0,
        }
    }
}

/// What a rasterized mask does to the pixels it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ink {
    /// Source-over with this color.
    Paint(Pixel),
    /// Subtract: covered pixels become fully transparent.
    Erase,
}

// ============================================================================
// Coverage mask
// ============================================================================

/// Binary coverage over a canvas-clamped bounding box.
#[derive(Clone, Debug, Default)]
pub struct Coverage {
    /// `width * height` bytes, 255 = covered.
    pub mask: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Coverage {
    pub fn is_empty(&self) -> bool {
        self.mask.iter().all(|&m| m == 0)
    }

    /// Canvas coordinates of every covered pixel.
    pub fn covered(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width.max(1) as usize;
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, m)| **m != 0)
            .map(move |(i, _)| {
                (
                    self.offset_x + (i % w) as u32,
                    self.offset_y + (i / w) as u32,
                )
            })
    }
}

// ============================================================================
// Outline geometry: distance functions
// ============================================================================

/// Geometry whose outline (or, for `Disc`, interior) gets rasterized.
#[derive(Clone, Debug, PartialEq)]
pub enum Outline {
    /// Axis-aligned box centred at (cx, cy) with half-extents (hx, hy).
    Box { cx: f32, cy: f32, hx: f32, hy: f32 },
    /// Circle outline.
    Ring { cx: f32, cy: f32, r: f32 },
    /// Filled disc; distance is signed (negative inside).
    Disc { cx: f32, cy: f32, r: f32 },
    /// Open chain of segments.
    Polyline(Vec<(f32, f32)>),
    /// Closed chain: the last vertex connects back to the first.
    Polygon(Vec<(f32, f32)>),
}

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// Distance to a line segment. Zero-length segments degrade to a point.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 <= f32::EPSILON {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

fn chain_distance(points: &[(f32, f32)], closed: bool, px: f32, py: f32) -> f32 {
    match points {
        [] => f32::INFINITY,
        [(x, y)] => ((px - x) * (px - x) + (py - y) * (py - y)).sqrt(),
        _ => {
            let mut d = points
                .windows(2)
                .map(|w| sdf_line_segment(px, py, w[0].0, w[0].1, w[1].0, w[1].1))
                .fold(f32::INFINITY, f32::min);
            if closed && let (Some(first), Some(last)) = (points.first(), points.last()) {
                d = d.min(sdf_line_segment(px, py, last.0, last.1, first.0, first.1));
            }
            d
        }
    }
}

impl Outline {
    /// Distance from (px, py) to the painted geometry. Pixels with a distance
    /// `<= half_width` are covered.
    pub fn distance(&self, px: f32, py: f32) -> f32 {
        match self {
            Outline::Box { cx, cy, hx, hy } => sdf_box(px - cx, py - cy, *hx, *hy).abs(),
            Outline::Ring { cx, cy, r } => {
                let len = ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt();
                (len - r).abs()
            }
            Outline::Disc { cx, cy, r } => {
                ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt() - r
            }
            Outline::Polyline(points) => chain_distance(points, false, px, py),
            Outline::Polygon(points) => chain_distance(points, true, px, py),
        }
    }

    /// Geometry bounding box as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        match self {
            Outline::Box { cx, cy, hx, hy } => (cx - hx, cy - hy, cx + hx, cy + hy),
            Outline::Ring { cx, cy, r } | Outline::Disc { cx, cy, r } => {
                (cx - r, cy - r, cx + r, cy + r)
            }
            Outline::Polyline(points) | Outline::Polygon(points) => points.iter().fold(
                (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
                |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            ),
        }
    }
}

/// Outline for a shape tool, recomputed from the gesture anchor and the
/// current pointer on every move.
pub fn shape_outline(kind: ShapeKind, anchor: (f32, f32), current: (f32, f32)) -> Outline {
    let (ax, ay) = anchor;
    let (x, y) = current;
    match kind {
        ShapeKind::Rectangle => {
            let (w, h) = ((x - ax).abs(), (y - ay).abs());
            let (left, top) = (ax.min(x), ay.min(y));
            Outline::Box {
                cx: left + w * 0.5,
                cy: top + h * 0.5,
                hx: w * 0.5,
                hy: h * 0.5,
            }
        }
        ShapeKind::Square => {
            let side = (x - ax).abs().max((y - ay).abs());
            let left = if x > ax { ax } else { ax - side };
            let top = if y > ay { ay } else { ay - side };
            Outline::Box {
                cx: left + side * 0.5,
                cy: top + side * 0.5,
                hx: side * 0.5,
                hy: side * 0.5,
            }
        }
        ShapeKind::Circle => {
            let r = ((x - ax) * (x - ax) + (y - ay) * (y - ay)).sqrt();
            Outline::Ring { cx: ax, cy: ay, r }
        }
        // Apex at the anchor, base runs from the pointer to its mirror
        // image across the anchor's vertical axis.
        ShapeKind::Triangle => Outline::Polygon(vec![(ax, ay), (x, y), (ax - (x - ax), y)]),
    }
}

/// Sample a quadratic Bézier into a polyline fine enough for pixel strokes.
pub fn quad_curve_points(p0: (f32, f32), p1: (f32, f32), p2: (f32, f32)) -> Vec<(f32, f32)> {
    let hull = |a: (f32, f32), b: (f32, f32)| ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
    let approx_len = hull(p0, p1) + hull(p1, p2);
    let steps = ((approx_len / 4.0).ceil() as usize).clamp(8, 256);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let mt = 1.0 - t;
            (
                mt * mt * p0.0 + 2.0 * mt * t * p1.0 + t * t * p2.0,
                mt * mt * p0.1 + 2.0 * mt * t * p1.1 + t * t * p2.1,
            )
        })
        .collect()
}

// ============================================================================
// Rasterization
// ============================================================================

/// Rasterize pixels whose centre lies within `half_width` of the outline.
/// The mask is clamped to the canvas; rows are evaluated in parallel.
pub fn rasterize(outline: &Outline, half_width: f32, canvas_w: u32, canvas_h: u32) -> Coverage {
    let (min_x, min_y, max_x, max_y) = outline.bounds();
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return Coverage::default();
    }
    let pad = half_width.max(0.0) + 1.0;
    let x0 = ((min_x - pad).floor() as i64).max(0);
    let y0 = ((min_y - pad).floor() as i64).max(0);
    let x1 = ((max_x + pad).ceil() as i64).min(canvas_w as i64);
    let y1 = ((max_y + pad).ceil() as i64).min(canvas_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return Coverage::default();
    }
    let buf_w = (x1 - x0) as u32;
    let buf_h = (y1 - y0) as u32;
    let mut mask = vec![0u8; buf_w as usize * buf_h as usize];

    mask.par_chunks_mut(buf_w as usize)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 + row as i64) as f32 + 0.5;
            for (col, m) in row_buf.iter_mut().enumerate() {
                let px = (x0 + col as i64) as f32 + 0.5;
                if outline.distance(px, py) <= half_width {
                    *m = 255;
                }
            }
        });

    Coverage {
        mask,
        width: buf_w,
        height: buf_h,
        offset_x: x0 as u32,
        offset_y: y0 as u32,
    }
}

/// Stroke one freehand segment with round caps.
pub fn stroke_segment(buffer: &mut PixelBuffer, from: (f32, f32), to: (f32, f32), width: f32, ink: Ink) {
    let outline = Outline::Polyline(vec![from, to]);
    let coverage = rasterize(&outline, width * 0.5, buffer.width(), buffer.height());
    buffer.apply_coverage(&coverage, ink);
}

/// Stroke a shape outline (never filled).
pub fn stroke_shape(
    buffer: &mut PixelBuffer,
    kind: ShapeKind,
    anchor: (f32, f32),
    current: (f32, f32),
    style: StrokeStyle,
) {
    let outline = shape_outline(kind, anchor, current);
    let coverage = rasterize(&outline, style.width * 0.5, buffer.width(), buffer.height());
    buffer.apply_coverage(&coverage, Ink::Paint(style.color));
}

/// Stroke the quadratic curve p0 → p2 with control point p1.
pub fn stroke_quad_curve(buffer: &mut PixelBuffer, points: [(f32, f32); 3], width: f32, ink: Ink) {
    let [p0, p1, p2] = points;
    let outline = Outline::Polyline(quad_curve_points(p0, p1, p2));
    let coverage = rasterize(&outline, width * 0.5, buffer.width(), buffer.height());
    buffer.apply_coverage(&coverage, ink);
}

pub fn fill_disc(buffer: &mut PixelBuffer, center: (f32, f32), radius: f32, color: Pixel) {
    let outline = Outline::Disc {
        cx: center.0,
        cy: center.1,
        r: radius,
    };
    let coverage = rasterize(&outline, 0.0, buffer.width(), buffer.height());
    buffer.apply_coverage(&coverage, Ink::Paint(color));
}

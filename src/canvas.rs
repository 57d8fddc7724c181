use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::components::curves::CurveStore;
use crate::ops::shapes::{self, Coverage, Ink, StrokeStyle};

/// One RGBA sample. Equality is exact per channel.
pub type Pixel = Rgba<u8>;

/// A pixel with zero alpha, returned for out-of-range reads.
pub const TRANSPARENT: Pixel = Rgba([0, 0, 0, 0]);

/// Control-point handles are drawn as red discs of this radius.
pub const HANDLE_RADIUS: f32 = 5.0;
pub const HANDLE_COLOR: Pixel = Rgba([255, 0, 0, 255]);

// ============================================================================
// PIXEL BUFFER – dense row-major RGBA grid
// ============================================================================

/// Dense `width × height` RGBA grid, row-major, `index = y * width + x`.
///
/// Every write is bounds-checked: out-of-range coordinates are silently
/// dropped so rasterizers and the flood fill can never write outside the
/// buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn new_filled(width: u32, height: u32, color: Pixel) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Flat RGBA bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }

    // ---- pixel access -------------------------------------------------------

    /// Read a pixel (returns `TRANSPARENT` outside the grid).
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if !self.in_bounds(x, y) {
            return TRANSPARENT;
        }
        *self.image.get_pixel(x, y)
    }

    /// Write a pixel; out-of-range writes are dropped.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if !self.in_bounds(x, y) {
            return;
        }
        self.image.put_pixel(x, y, pixel);
    }

    /// Fill the entire grid with `color`.
    pub fn fill(&mut self, color: Pixel) {
        for p in self.image.pixels_mut() {
            *p = color;
        }
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    /// Overwrite this buffer with `src` verbatim. Mismatched sizes copy the
    /// overlapping top-left region only.
    pub fn copy_from(&mut self, src: &PixelBuffer) {
        if src.width() == self.width() && src.height() == self.height() {
            let dst: &mut [u8] = &mut self.image;
            dst.copy_from_slice(src.as_raw());
            return;
        }
        let w = self.width().min(src.width());
        let h = self.height().min(src.height());
        for y in 0..h {
            for x in 0..w {
                self.image.put_pixel(x, y, src.get_pixel(x, y));
            }
        }
    }

    /// Source-over composite `top` onto this buffer (same dimensions).
    /// Rows are blended in parallel.
    pub fn draw_over(&mut self, top: &PixelBuffer) {
        if top.width() != self.width() || top.height() != self.height() {
            crate::log_warn!(
                "draw_over: size mismatch {}×{} onto {}×{}, skipped",
                top.width(),
                top.height(),
                self.width(),
                self.height()
            );
            return;
        }
        let row_bytes = self.width() as usize * 4;
        if row_bytes == 0 {
            return;
        }
        let dst: &mut [u8] = &mut self.image;
        dst.par_chunks_mut(row_bytes)
            .zip(top.as_raw().par_chunks(row_bytes))
            .for_each(|(dst_row, top_row)| {
                for (d, t) in dst_row.chunks_exact_mut(4).zip(top_row.chunks_exact(4)) {
                    let out = blend_over([d[0], d[1], d[2], d[3]], [t[0], t[1], t[2], t[3]]);
                    d.copy_from_slice(&out);
                }
            });
    }

    /// Apply `ink` to every covered pixel of a rasterized mask.
    pub fn apply_coverage(&mut self, coverage: &Coverage, ink: Ink) {
        for (x, y) in coverage.covered() {
            match ink {
                Ink::Paint(color) => {
                    let base = self.get_pixel(x, y);
                    self.put_pixel(x, y, Rgba(blend_over(base.0, color.0)));
                }
                // "destination-out" at full coverage: the pixel becomes
                // transparent so lower layers show through.
                Ink::Erase => self.put_pixel(x, y, TRANSPARENT),
            }
        }
    }
}

/// Unpremultiplied source-over for one pixel.
#[inline]
pub fn blend_over(base: [u8; 4], top: [u8; 4]) -> [u8; 4] {
    if top[3] == 0 {
        return base;
    }
    if top[3] == 255 || base[3] == 0 {
        return top;
    }
    let ta = top[3] as f32 / 255.0;
    let ba = base[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    let ch = |t: u8, b: u8| -> u8 {
        ((t as f32 * ta + b as f32 * ba * (1.0 - ta)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    [
        ch(top[0], base[0]),
        ch(top[1], base[1]),
        ch(top[2], base[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

// ============================================================================
// CANVAS STATE – layer stack, composite frame and preview snapshot
// ============================================================================

/// Owns every layer of one drawing and produces the visible frame.
///
/// Z-order, back to front: background image, stroke layer, shape scratch
/// layer, curve overlay (curves then control-point handles). The optional
/// `snapshot` is a saved copy of the visible frame used to make fill-mode
/// and curve-mode previews reversible.
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    frame: PixelBuffer,
    background: Option<PixelBuffer>,
    stroke_layer: PixelBuffer,
    /// Shape previews are drawn here and merged into the stroke layer when
    /// the gesture ends.
    scratch_layer: Option<PixelBuffer>,
    snapshot: Option<PixelBuffer>,
    pub curves: CurveStore,
    /// Live selector style; curves are always stroked with it.
    pub curve_style: StrokeStyle,
    pub show_curve_handles: bool,
    /// Monotonically increasing counter, bumped whenever the frame changes
    pub dirty_generation: u64,
}

impl CanvasState {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = {
            let total = (width as u64) * (height as u64);
            if total > 256_000_000 || width == 0 || height == 0 {
                crate::log_warn!(
                    "CanvasState::new: invalid dimensions {}×{}, clamped to 1×1",
                    width,
                    height
                );
                (1, 1)
            } else {
                (width, height)
            }
        };
        Self {
            width,
            height,
            frame: PixelBuffer::new(width, height),
            background: None,
            stroke_layer: PixelBuffer::new(width, height),
            scratch_layer: None,
            snapshot: None,
            curves: CurveStore::default(),
            curve_style: StrokeStyle::default(),
            show_curve_handles: false,
            dirty_generation: 0,
        }
    }

    // ---- accessors ----------------------------------------------------------

    /// The visible composited frame.
    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    pub fn background(&self) -> Option<&PixelBuffer> {
        self.background.as_ref()
    }

    pub fn stroke_layer(&self) -> &PixelBuffer {
        &self.stroke_layer
    }

    /// Direct access for freehand strokes and the eraser. Call `compose()`
    /// afterwards to make the change visible.
    pub fn stroke_layer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.stroke_layer
    }

    pub fn scratch_layer(&self) -> Option<&PixelBuffer> {
        self.scratch_layer.as_ref()
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    fn mark_dirty(&mut self) {
        self.dirty_generation = self.dirty_generation.wrapping_add(1);
    }

    // ---- composition --------------------------------------------------------

    /// Rebuild the visible frame from the layer stack.
    pub fn compose(&mut self) {
        match &self.background {
            Some(bg) => self.frame.copy_from(bg),
            None => self.frame.clear(),
        }
        self.frame.draw_over(&self.stroke_layer);
        if let Some(ref scratch) = self.scratch_layer {
            self.frame.draw_over(scratch);
        }
        self.draw_curves();
        self.mark_dirty();
    }

    /// Capture the current frame so a modal preview can be reverted.
    pub fn enter_preview_mode(&mut self) {
        self.snapshot = Some(self.frame.clone());
    }

    /// Put the captured frame back pixel-for-pixel and drop the snapshot.
    /// Without a snapshot the frame is left as is.
    pub fn exit_preview_mode(&mut self) {
        if let Some(saved) = self.snapshot.take() {
            self.frame = saved;
            self.mark_dirty();
        }
    }

    /// Live redraw while a control point is dragged: snapshot (or a cleared
    /// frame), then the stroke layer, then every curve.
    pub fn redraw_with_snapshot(&mut self) {
        match &self.snapshot {
            Some(saved) => self.frame.copy_from(saved),
            None => self.frame.clear(),
        }
        self.frame.draw_over(&self.stroke_layer);
        self.draw_curves();
        self.mark_dirty();
    }

    fn draw_curves(&mut self) {
        let style = self.curve_style;
        for curve in self.curves.curves() {
            let [p0, p1, p2] = curve.points;
            shapes::stroke_quad_curve(
                &mut self.frame,
                [(p0.x, p0.y), (p1.x, p1.y), (p2.x, p2.y)],
                style.width,
                Ink::Paint(style.color),
            );
        }
        if self.show_curve_handles {
            for curve in self.curves.curves() {
                for p in curve.points {
                    shapes::fill_disc(&mut self.frame, (p.x, p.y), HANDLE_RADIUS, HANDLE_COLOR);
                }
            }
        }
    }

    // ---- scratch layer ------------------------------------------------------

    /// Cleared scratch layer for redrawing a shape preview from scratch.
    pub fn begin_scratch(&mut self) -> &mut PixelBuffer {
        let (w, h) = (self.width, self.height);
        let scratch = self
            .scratch_layer
            .get_or_insert_with(|| PixelBuffer::new(w, h));
        scratch.clear();
        scratch
    }

    /// Merge the scratch layer into the stroke layer. Returns false when
    /// there was nothing to merge.
    pub fn commit_scratch(&mut self) -> bool {
        match self.scratch_layer.take() {
            Some(scratch) => {
                self.stroke_layer.draw_over(&scratch);
                true
            }
            None => false,
        }
    }

    pub fn discard_scratch(&mut self) {
        self.scratch_layer = None;
    }

    // ---- layer edits --------------------------------------------------------

    /// Flood fill the stroke layer at `seed`, recomposite, and re-capture the
    /// snapshot so leaving fill mode keeps the result. Returns the number of
    /// pixels written.
    pub fn fill_at(&mut self, seed: (u32, u32), color: Pixel) -> usize {
        if !self.stroke_layer.in_bounds(seed.0, seed.1) {
            crate::log_warn!("Fill seed ({}, {}) outside canvas, ignored", seed.0, seed.1);
            return 0;
        }
        let filled = crate::ops::fill::flood_fill(&mut self.stroke_layer, seed, color);
        if filled > 0 {
            self.compose();
            self.enter_preview_mode();
        }
        filled
    }

    /// Install a decoded image as the background. Stroke and scratch layers
    /// and all curves are cleared; an active snapshot is retaken so leaving
    /// the current preview mode does not revert the import.
    pub fn replace_background(&mut self, decoded: PixelBuffer) {
        let decoded = if decoded.width() != self.width || decoded.height() != self.height {
            let resized = image::imageops::resize(
                decoded.as_rgba_image(),
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            PixelBuffer::from_rgba_image(resized)
        } else {
            decoded
        };
        self.background = Some(decoded);
        self.stroke_layer.clear();
        self.scratch_layer = None;
        self.curves.clear();
        self.compose();
        if self.snapshot.is_some() {
            self.enter_preview_mode();
        }
    }

    /// Reset background, stroke layer, snapshot and curves.
    pub fn clear_all(&mut self) {
        self.background = None;
        self.stroke_layer.clear();
        self.scratch_layer = None;
        self.snapshot = None;
        self.curves.clear();
        self.compose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Pixel = Rgba([255, 255, 255, 255]);
    const RED: Pixel = Rgba([255, 0, 0, 255]);

    #[test]
    fn out_of_range_access_is_guarded() {
        let mut buf = PixelBuffer::new_filled(3, 2, WHITE);
        buf.put_pixel(3, 0, RED);
        buf.put_pixel(0, 2, RED);
        assert_eq!(buf.get_pixel(5, 5), TRANSPARENT);
        assert!(buf.as_raw().chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn blend_over_respects_alpha_extremes() {
        assert_eq!(blend_over([1, 2, 3, 255], [9, 9, 9, 0]), [1, 2, 3, 255]);
        assert_eq!(blend_over([1, 2, 3, 255], [9, 8, 7, 255]), [9, 8, 7, 255]);
        assert_eq!(blend_over([0, 0, 0, 0], [9, 8, 7, 100]), [9, 8, 7, 100]);
        let half = blend_over([0, 0, 0, 255], [255, 255, 255, 128]);
        assert_eq!(half[3], 255);
        assert!(half[0] > 120 && half[0] < 135);
    }

    #[test]
    fn compose_orders_background_under_strokes() {
        let mut canvas = CanvasState::new(4, 4);
        canvas.replace_background(PixelBuffer::new_filled(4, 4, WHITE));
        canvas.stroke_layer_mut().put_pixel(1, 1, RED);
        canvas.compose();
        assert_eq!(canvas.frame().get_pixel(1, 1), RED);
        assert_eq!(canvas.frame().get_pixel(0, 0), WHITE);
    }

    #[test]
    fn background_is_resized_to_canvas() {
        let mut canvas = CanvasState::new(8, 6);
        canvas.replace_background(PixelBuffer::new_filled(2, 2, WHITE));
        let bg = canvas.background().map(|b| (b.width(), b.height()));
        assert_eq!(bg, Some((8, 6)));
    }

    #[test]
    fn preview_round_trip_is_bit_identical() {
        let mut canvas = CanvasState::new(6, 6);
        canvas.stroke_layer_mut().put_pixel(2, 3, RED);
        canvas.compose();
        let before = canvas.frame().clone();
        canvas.enter_preview_mode();
        canvas.exit_preview_mode();
        assert!(canvas.frame() == &before);
        assert!(!canvas.has_snapshot());
    }

    #[test]
    fn exit_preview_discards_transient_rendering() {
        let mut canvas = CanvasState::new(6, 6);
        canvas.compose();
        let before = canvas.frame().clone();
        canvas.enter_preview_mode();
        canvas.stroke_layer_mut().put_pixel(0, 0, RED);
        canvas.redraw_with_snapshot();
        assert_eq!(canvas.frame().get_pixel(0, 0), RED);
        canvas.exit_preview_mode();
        assert!(canvas.frame() == &before);
    }

    #[test]
    fn redraw_without_snapshot_starts_from_cleared_frame() {
        let mut canvas = CanvasState::new(20, 20);
        canvas.replace_background(PixelBuffer::new_filled(20, 20, WHITE));
        assert!(!canvas.has_snapshot());
        canvas.stroke_layer_mut().put_pixel(19, 0, RED);
        canvas.curve_style = StrokeStyle {
            color: RED,
            width: 2.0,
        };
        canvas.curves.add_control_point(2.0, 16.0);
        canvas.curves.add_control_point(10.0, 0.0);
        canvas.curves.add_control_point(18.0, 16.0);

        canvas.redraw_with_snapshot();
        assert_eq!(canvas.frame().get_pixel(0, 0), TRANSPARENT);
        assert_eq!(canvas.frame().get_pixel(10, 19), TRANSPARENT);
        assert_eq!(canvas.frame().get_pixel(19, 0), RED);
        assert_eq!(canvas.frame().get_pixel(10, 8), RED);

        // A full compose brings the background back.
        canvas.compose();
        assert_eq!(canvas.frame().get_pixel(0, 0), WHITE);
        assert_eq!(canvas.frame().get_pixel(10, 8), RED);
    }

    #[test]
    fn fill_survives_leaving_preview() {
        let mut canvas = CanvasState::new(5, 5);
        canvas.compose();
        canvas.enter_preview_mode();
        let filled = canvas.fill_at((0, 0), RED);
        assert_eq!(filled, 25);
        canvas.exit_preview_mode();
        assert_eq!(canvas.frame().get_pixel(4, 4), RED);
    }

    #[test]
    fn scratch_merges_into_stroke_layer() {
        let mut canvas = CanvasState::new(4, 4);
        canvas.begin_scratch().put_pixel(3, 3, RED);
        canvas.compose();
        assert_eq!(canvas.frame().get_pixel(3, 3), RED);
        assert_eq!(canvas.stroke_layer().get_pixel(3, 3), TRANSPARENT);
        assert!(canvas.commit_scratch());
        assert_eq!(canvas.stroke_layer().get_pixel(3, 3), RED);
        assert!(!canvas.commit_scratch());
    }

    #[test]
    fn clear_all_resets_every_layer() {
        let mut canvas = CanvasState::new(4, 4);
        canvas.replace_background(PixelBuffer::new_filled(4, 4, WHITE));
        canvas.stroke_layer_mut().put_pixel(0, 0, RED);
        canvas.curves.add_control_point(0.0, 0.0);
        canvas.enter_preview_mode();
        canvas.clear_all();
        assert!(canvas.background().is_none());
        assert!(!canvas.has_snapshot());
        assert!(canvas.curves.pending().is_empty());
        assert!(canvas.frame().as_raw().iter().all(|&b| b == 0));
    }
}

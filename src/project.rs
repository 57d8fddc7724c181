use std::path::{Path, PathBuf};

use crate::canvas::{CanvasState, PixelBuffer};
use crate::components::colors::parse_hex_color;
use crate::components::tools::{DrawTool, ToolMode, ToolState};
use crate::error::CanvasError;
use crate::io::{self, ImageLoader, ImportSource, IoResult};
use crate::ops::shapes::StrokeStyle;
use crate::settings::CanvasSettings;
use crate::{log_err, log_info, log_warn};

/// Single open drawing. Owns every piece of mutable state; front-ends feed
/// it the input stream and read `frame()` back.
pub struct Session {
    pub canvas: CanvasState,
    tools: ToolState,
    loader: ImageLoader,
    max_stroke_width: f32,
    /// Where the drawing was last saved, if anywhere.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::from_settings(&CanvasSettings::default())
    }
}

impl Session {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_settings(&CanvasSettings {
            canvas_width: width,
            canvas_height: height,
            ..CanvasSettings::default()
        })
    }

    pub fn from_settings(settings: &CanvasSettings) -> Self {
        let color = parse_hex_color(&settings.default_color).unwrap_or_else(|e| {
            log_warn!("{}; using black", e);
            StrokeStyle::default().color
        });
        let style = StrokeStyle {
            color,
            width: settings
                .default_stroke_width
                .clamp(1.0, settings.max_stroke_width.max(1.0)),
        };
        let mut canvas = CanvasState::new(settings.canvas_width, settings.canvas_height);
        canvas.curve_style = style;
        canvas.compose();
        Self {
            canvas,
            tools: ToolState::new(style),
            loader: ImageLoader::new(),
            max_stroke_width: settings.max_stroke_width.max(1.0),
            path: None,
            is_dirty: false,
        }
    }

    pub fn frame(&self) -> &PixelBuffer {
        self.canvas.frame()
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn mode(&self) -> ToolMode {
        self.tools.mode()
    }

    pub fn max_stroke_width(&self) -> f32 {
        self.max_stroke_width
    }

    fn touched(&mut self) {
        self.is_dirty = true;
    }

    // ---- pointer stream -----------------------------------------------------

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.tools.pointer_down(&mut self.canvas, x, y);
        self.touched();
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.tools.pointer_move(&mut self.canvas, x, y);
    }

    pub fn pointer_up(&mut self) {
        self.tools.pointer_up(&mut self.canvas);
    }

    pub fn pointer_enter(&mut self, x: f32, y: f32, button_down: bool) {
        self.tools.pointer_enter(&mut self.canvas, x, y, button_down);
    }

    pub fn pointer_leave(&mut self) {
        self.tools.pointer_leave(&mut self.canvas);
    }

    /// Returns the number of pixels filled (0 outside fill mode).
    pub fn click(&mut self, x: f32, y: f32) -> usize {
        let filled = self.tools.click(&mut self.canvas, x, y);
        if filled > 0 {
            self.touched();
        }
        filled
    }

    // ---- selectors ----------------------------------------------------------

    pub fn tool_changed(&mut self, name: &str) -> Result<(), CanvasError> {
        self.tools
            .tool_changed(&mut self.canvas, name)
            .inspect_err(|e| log_warn!("{}", e))
    }

    pub fn set_draw_tool(&mut self, tool: DrawTool) {
        self.tools.set_draw_tool(&mut self.canvas, tool);
    }

    pub fn color_changed(&mut self, hex: &str) -> Result<(), CanvasError> {
        self.tools
            .color_changed(&mut self.canvas, hex)
            .inspect_err(|e| log_warn!("{}", e))
    }

    pub fn set_color(&mut self, color: crate::canvas::Pixel) {
        self.tools.set_color(&mut self.canvas, color);
    }

    /// Clamped to `[1, max_stroke_width]`.
    pub fn width_changed(&mut self, width: f32) {
        let width = if width.is_finite() { width.min(self.max_stroke_width) } else { width };
        self.tools.width_changed(&mut self.canvas, width);
    }

    pub fn toggle_eraser(&mut self) {
        self.tools.toggle_eraser(&mut self.canvas);
    }

    pub fn toggle_fill_mode(&mut self) {
        self.tools.toggle_fill_mode(&mut self.canvas);
    }

    pub fn toggle_curve_mode(&mut self) {
        self.tools.toggle_curve_mode(&mut self.canvas);
    }

    pub fn eraser_label(&self) -> &'static str {
        self.tools.eraser_label()
    }

    pub fn fill_label(&self) -> &'static str {
        self.tools.fill_label()
    }

    pub fn curve_label(&self) -> &'static str {
        self.tools.curve_label()
    }

    // ---- whole-canvas operations --------------------------------------------

    /// Wipe background, strokes, curves and any saved snapshot.
    pub fn clear_all(&mut self) {
        self.tools.cancel_gesture(&mut self.canvas);
        self.canvas.clear_all();
        self.touched();
        log_info!("Canvas cleared");
    }

    /// PNG bytes of the visible frame.
    pub fn export_frame(&self) -> Result<Vec<u8>, CanvasError> {
        io::encode_png(self.canvas.frame()).inspect_err(|e| log_err!("Export failed: {}", e))
    }

    /// Decode `bytes` and make the result the background. On failure nothing
    /// changes.
    pub fn import_frame(&mut self, bytes: &[u8]) -> Result<(), CanvasError> {
        let decoded = io::decode_image(bytes).inspect_err(|e| log_err!("Import failed: {}", e))?;
        self.apply_import(decoded);
        Ok(())
    }

    fn apply_import(&mut self, decoded: PixelBuffer) {
        log_info!(
            "Importing {}x{} image onto {}x{} canvas",
            decoded.width(),
            decoded.height(),
            self.canvas.width,
            self.canvas.height
        );
        self.tools.cancel_gesture(&mut self.canvas);
        self.canvas.replace_background(decoded);
        self.touched();
    }

    /// Queue a background decode; the result is applied by `poll_imports`.
    pub fn request_import(&mut self, bytes: Vec<u8>) -> u64 {
        self.loader.request(ImportSource::Bytes(bytes))
    }

    pub fn request_import_file(&mut self, path: PathBuf) -> u64 {
        self.loader.request(ImportSource::File(path))
    }

    pub fn pending_imports(&self) -> usize {
        self.loader.pending()
    }

    /// Apply every finished import in completion order; the last one to
    /// finish wins. Each success yields the ticket that was applied.
    /// Failures leave the canvas untouched and are returned.
    pub fn poll_imports(&mut self) -> Vec<Result<u64, CanvasError>> {
        let mut outcomes = Vec::new();
        while let Some(result) = self.loader.try_next() {
            outcomes.push(self.apply_io_result(result));
        }
        outcomes
    }

    /// Block until every queued import has been applied.
    pub fn finish_imports(&mut self) -> Vec<Result<u64, CanvasError>> {
        let mut outcomes = Vec::new();
        while let Some(result) = self.loader.wait_next() {
            outcomes.push(self.apply_io_result(result));
        }
        outcomes
    }

    fn apply_io_result(&mut self, result: IoResult) -> Result<u64, CanvasError> {
        let ticket = result.ticket();
        match result {
            IoResult::ImageLoaded { image, .. } => {
                self.apply_import(image);
                log_info!("Import #{} applied", ticket);
                Ok(ticket)
            }
            IoResult::LoadFailed { error, .. } => {
                log_err!("Import #{} failed: {}", ticket, error);
                Err(error)
            }
        }
    }

    // ---- files --------------------------------------------------------------

    pub fn save_png(&mut self, path: &Path) -> Result<(), CanvasError> {
        io::save_png(self.canvas.frame(), path)
            .inspect_err(|e| log_err!("Saving {} failed: {}", path.display(), e))?;
        log_info!("Saved {}", path.display());
        self.path = Some(path.to_path_buf());
        self.is_dirty = false;
        Ok(())
    }

    pub fn load_image_file(&mut self, path: &Path) -> Result<(), CanvasError> {
        let decoded = io::load_image_file(path)
            .inspect_err(|e| log_err!("Opening {} failed: {}", path.display(), e))?;
        self.apply_import(decoded);
        Ok(())
    }

    /// Window title: file name (or "Untitled") with a dirty marker.
    pub fn display_title(&self) -> String {
        let name = self
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        if self.is_dirty {
            format!("{}*", name)
        } else {
            name
        }
    }
}

use crate::canvas::{CanvasState, Pixel};
use crate::components::colors::parse_hex_color;
use crate::components::curves::PointRef;
use crate::error::CanvasError;
use crate::ops::shapes::{self, Ink, ShapeKind, StrokeStyle};
use crate::{log_info, log_warn};

pub const MIN_STROKE_WIDTH: f32 = 1.0;

/// Tool selected in the drawing-mode selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DrawTool {
    #[default]
    Free,
    Shape(ShapeKind),
}

impl DrawTool {
    pub fn all() -> &'static [DrawTool] {
        &[
            DrawTool::Free,
            DrawTool::Shape(ShapeKind::Rectangle),
            DrawTool::Shape(ShapeKind::Square),
            DrawTool::Shape(ShapeKind::Circle),
            DrawTool::Shape(ShapeKind::Triangle),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawTool::Free => "free",
            DrawTool::Shape(kind) => kind.name(),
        }
    }

    /// Case-insensitive lookup by selector name.
    pub fn from_name(name: &str) -> Result<Self, CanvasError> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| CanvasError::UnknownTool(name.to_string()))
    }
}

/// Exactly one of these is active; fill and curve editing exclude each
/// other and normal painting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolMode {
    Draw(DrawTool),
    Erase,
    Fill,
    CurveEdit,
}

impl Default for ToolMode {
    fn default() -> Self {
        ToolMode::Draw(DrawTool::Free)
    }
}

/// Turns the pointer / selector stream into edits on a `CanvasState`.
pub struct ToolState {
    mode: ToolMode,
    /// Restored when a special mode is toggled off.
    last_draw_tool: DrawTool,
    style: StrokeStyle,
    painting: bool,
    /// Fixed corner/centre of the current shape gesture.
    anchor: (f32, f32),
    /// End of the previous freehand segment.
    last_pos: Option<(f32, f32)>,
    /// Control point grabbed by the current drag, if any.
    selected_point: Option<PointRef>,
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new(StrokeStyle::default())
    }
}

impl ToolState {
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            mode: ToolMode::default(),
            last_draw_tool: DrawTool::Free,
            style,
            painting: false,
            anchor: (0.0, 0.0),
            last_pos: None,
            selected_point: None,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn draw_tool(&self) -> DrawTool {
        self.last_draw_tool
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn selected_point(&self) -> Option<PointRef> {
        self.selected_point
    }

    // ---- pointer stream -----------------------------------------------------

    pub fn pointer_down(&mut self, canvas: &mut CanvasState, x: f32, y: f32) {
        match self.mode {
            ToolMode::Fill => {}
            ToolMode::CurveEdit => {
                if let Some(hit) = canvas.curves.hit_test(x, y) {
                    self.selected_point = Some(hit);
                } else if canvas.curves.add_control_point(x, y).is_some() {
                    canvas.redraw_with_snapshot();
                }
            }
            ToolMode::Draw(_) | ToolMode::Erase => {
                self.painting = true;
                self.anchor = (x, y);
                self.last_pos = Some((x, y));
                self.paint_to(canvas, x, y);
            }
        }
    }

    pub fn pointer_move(&mut self, canvas: &mut CanvasState, x: f32, y: f32) {
        if let Some(at) = self.selected_point {
            if canvas.curves.move_point(at, x, y) {
                canvas.redraw_with_snapshot();
            } else {
                self.selected_point = None;
            }
        } else if self.painting {
            self.paint_to(canvas, x, y);
        }
    }

    /// Ends the gesture: a shape preview is merged into the stroke layer.
    pub fn pointer_up(&mut self, canvas: &mut CanvasState) {
        if self.painting && canvas.commit_scratch() {
            canvas.compose();
        }
        self.painting = false;
        self.last_pos = None;
        self.selected_point = None;
    }

    /// Re-entering the canvas with the button held starts a fresh gesture.
    pub fn pointer_enter(&mut self, canvas: &mut CanvasState, x: f32, y: f32, button_down: bool) {
        if button_down {
            self.pointer_down(canvas, x, y);
        }
    }

    pub fn pointer_leave(&mut self, canvas: &mut CanvasState) {
        self.pointer_up(canvas);
    }

    /// Flood fill at the click position; only meaningful in fill mode.
    pub fn click(&mut self, canvas: &mut CanvasState, x: f32, y: f32) -> usize {
        if self.mode != ToolMode::Fill {
            return 0;
        }
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            log_warn!("Fill click ({:.1}, {:.1}) outside canvas, ignored", x, y);
            return 0;
        }
        canvas.fill_at((x.floor() as u32, y.floor() as u32), self.style.color)
    }

    fn paint_to(&mut self, canvas: &mut CanvasState, x: f32, y: f32) {
        match self.mode {
            ToolMode::Draw(DrawTool::Free) => {
                let from = self.last_pos.unwrap_or((x, y));
                shapes::stroke_segment(
                    canvas.stroke_layer_mut(),
                    from,
                    (x, y),
                    self.style.width,
                    Ink::Paint(self.style.color),
                );
                self.last_pos = Some((x, y));
            }
            ToolMode::Erase => {
                let from = self.last_pos.unwrap_or((x, y));
                shapes::stroke_segment(canvas.stroke_layer_mut(), from, (x, y), self.style.width, Ink::Erase);
                self.last_pos = Some((x, y));
            }
            ToolMode::Draw(DrawTool::Shape(kind)) => {
                let (anchor, style) = (self.anchor, self.style);
                shapes::stroke_shape(canvas.begin_scratch(), kind, anchor, (x, y), style);
            }
            ToolMode::Fill | ToolMode::CurveEdit => return,
        }
        canvas.compose();
    }

    // ---- selectors ----------------------------------------------------------

    pub fn set_draw_tool(&mut self, canvas: &mut CanvasState, tool: DrawTool) {
        if self.painting {
            self.pointer_up(canvas);
        }
        self.last_draw_tool = tool;
        if let ToolMode::Draw(_) = self.mode {
            self.mode = ToolMode::Draw(tool);
        }
    }

    pub fn tool_changed(&mut self, canvas: &mut CanvasState, name: &str) -> Result<(), CanvasError> {
        let tool = DrawTool::from_name(name)?;
        self.set_draw_tool(canvas, tool);
        Ok(())
    }

    pub fn set_color(&mut self, canvas: &mut CanvasState, color: Pixel) {
        self.style.color = color;
        canvas.curve_style = self.style;
    }

    pub fn color_changed(&mut self, canvas: &mut CanvasState, hex: &str) -> Result<(), CanvasError> {
        let color = parse_hex_color(hex)?;
        self.set_color(canvas, color);
        Ok(())
    }

    pub fn width_changed(&mut self, canvas: &mut CanvasState, width: f32) {
        self.style.width = if width.is_finite() {
            width.max(MIN_STROKE_WIDTH)
        } else {
            MIN_STROKE_WIDTH
        };
        canvas.curve_style = self.style;
    }

    // ---- mode toggles -------------------------------------------------------

    pub fn toggle_eraser(&mut self, canvas: &mut CanvasState) {
        if self.mode == ToolMode::Erase {
            self.set_mode(canvas, ToolMode::Draw(self.last_draw_tool));
        } else {
            self.set_mode(canvas, ToolMode::Erase);
        }
    }

    pub fn toggle_fill_mode(&mut self, canvas: &mut CanvasState) {
        if self.mode == ToolMode::Fill {
            self.set_mode(canvas, ToolMode::Draw(self.last_draw_tool));
        } else {
            self.set_mode(canvas, ToolMode::Fill);
        }
    }

    pub fn toggle_curve_mode(&mut self, canvas: &mut CanvasState) {
        if self.mode == ToolMode::CurveEdit {
            self.set_mode(canvas, ToolMode::Draw(self.last_draw_tool));
        } else {
            self.set_mode(canvas, ToolMode::CurveEdit);
        }
    }

    /// Switch modes, leaving the current special mode's preview first.
    fn set_mode(&mut self, canvas: &mut CanvasState, next: ToolMode) {
        if self.mode == next {
            return;
        }
        self.pointer_up(canvas);

        match self.mode {
            ToolMode::Fill => canvas.exit_preview_mode(),
            ToolMode::CurveEdit => {
                canvas.exit_preview_mode();
                canvas.curves.clear_pending();
                canvas.show_curve_handles = false;
                canvas.compose();
            }
            ToolMode::Draw(_) | ToolMode::Erase => {}
        }

        match next {
            ToolMode::Fill => canvas.enter_preview_mode(),
            ToolMode::CurveEdit => {
                canvas.curve_style = self.style;
                canvas.enter_preview_mode();
                canvas.curves.clear_pending();
                canvas.show_curve_handles = true;
                canvas.compose();
            }
            ToolMode::Draw(_) | ToolMode::Erase => {}
        }

        log_info!("Tool mode {:?} -> {:?}", self.mode, next);
        self.mode = next;
    }

    /// Drop any in-flight gesture without committing it (used when the
    /// canvas is cleared or replaced underneath the tool).
    pub fn cancel_gesture(&mut self, canvas: &mut CanvasState) {
        canvas.discard_scratch();
        self.painting = false;
        self.last_pos = None;
        self.selected_point = None;
    }

    // ---- labels -------------------------------------------------------------

    pub fn eraser_label(&self) -> &'static str {
        if self.mode == ToolMode::Erase {
            "Drawing mode"
        } else {
            "Eraser mode"
        }
    }

    pub fn fill_label(&self) -> &'static str {
        if self.mode == ToolMode::Fill {
            "Drawing mode"
        } else {
            "Fill"
        }
    }

    pub fn curve_label(&self) -> &'static str {
        if self.mode == ToolMode::CurveEdit {
            "Drawing mode"
        } else {
            "Curve mode"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    const RED: Pixel = Rgba([255, 0, 0, 255]);

    fn setup() -> (ToolState, CanvasState) {
        let mut canvas = CanvasState::new(60, 60);
        let mut tools = ToolState::default();
        tools.set_color(&mut canvas, RED);
        tools.width_changed(&mut canvas, 2.0);
        canvas.compose();
        (tools, canvas)
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in DrawTool::all() {
            assert_eq!(DrawTool::from_name(tool.name()).unwrap(), *tool);
        }
        assert_eq!(
            DrawTool::from_name(" Circle ").unwrap(),
            DrawTool::Shape(ShapeKind::Circle)
        );
        assert!(DrawTool::from_name("hexagon").is_err());
    }

    #[test]
    fn freehand_strokes_connect_move_events() {
        let (mut tools, mut canvas) = setup();
        tools.pointer_down(&mut canvas, 10.0, 10.0);
        tools.pointer_move(&mut canvas, 30.0, 10.0);
        tools.pointer_up(&mut canvas);
        assert_eq!(canvas.stroke_layer().get_pixel(20, 10), RED);
        assert_eq!(canvas.frame().get_pixel(20, 10), RED);
        assert!(!tools.is_painting());
    }

    #[test]
    fn moves_without_press_do_nothing() {
        let (mut tools, mut canvas) = setup();
        tools.pointer_move(&mut canvas, 30.0, 10.0);
        assert_eq!(canvas.frame().get_pixel(30, 10), TRANSPARENT);
    }

    #[test]
    fn shape_preview_keeps_earlier_strokes() {
        let (mut tools, mut canvas) = setup();
        tools.pointer_down(&mut canvas, 5.0, 50.0);
        tools.pointer_move(&mut canvas, 55.0, 50.0);
        tools.pointer_up(&mut canvas);

        tools.tool_changed(&mut canvas, "rectangle").unwrap();
        tools.pointer_down(&mut canvas, 10.0, 10.0);
        tools.pointer_move(&mut canvas, 40.0, 40.0);
        tools.pointer_move(&mut canvas, 20.0, 20.0);
        // Only the latest rectangle is visible; the first preview is gone.
        assert_eq!(canvas.frame().get_pixel(20, 15), RED);
        assert_eq!(canvas.frame().get_pixel(39, 25), TRANSPARENT);
        tools.pointer_up(&mut canvas);
        assert_eq!(canvas.stroke_layer().get_pixel(20, 15), RED);
        assert_eq!(canvas.stroke_layer().get_pixel(30, 50), RED);
    }

    #[test]
    fn eraser_clears_stroke_pixels() {
        let (mut tools, mut canvas) = setup();
        tools.pointer_down(&mut canvas, 5.0, 20.0);
        tools.pointer_move(&mut canvas, 55.0, 20.0);
        tools.pointer_up(&mut canvas);
        tools.toggle_eraser(&mut canvas);
        assert_eq!(tools.eraser_label(), "Drawing mode");
        tools.width_changed(&mut canvas, 6.0);
        tools.pointer_down(&mut canvas, 30.0, 20.0);
        tools.pointer_up(&mut canvas);
        assert_eq!(canvas.stroke_layer().get_pixel(30, 20), TRANSPARENT);
        assert_eq!(canvas.stroke_layer().get_pixel(10, 20), RED);
        tools.toggle_eraser(&mut canvas);
        assert_eq!(tools.mode(), ToolMode::Draw(DrawTool::Free));
    }

    #[test]
    fn special_modes_are_mutually_exclusive() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_fill_mode(&mut canvas);
        assert_eq!(tools.mode(), ToolMode::Fill);
        assert!(canvas.has_snapshot());
        tools.toggle_curve_mode(&mut canvas);
        assert_eq!(tools.mode(), ToolMode::CurveEdit);
        assert_eq!(tools.fill_label(), "Fill");
        assert_eq!(tools.curve_label(), "Drawing mode");
        tools.toggle_curve_mode(&mut canvas);
        assert_eq!(tools.mode(), ToolMode::Draw(DrawTool::Free));
        assert!(!canvas.has_snapshot());
    }

    #[test]
    fn tool_change_in_fill_mode_is_remembered() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_fill_mode(&mut canvas);
        tools.tool_changed(&mut canvas, "circle").unwrap();
        assert_eq!(tools.mode(), ToolMode::Fill);
        tools.toggle_fill_mode(&mut canvas);
        assert_eq!(tools.mode(), ToolMode::Draw(DrawTool::Shape(ShapeKind::Circle)));
    }

    #[test]
    fn press_in_fill_mode_does_not_paint() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_fill_mode(&mut canvas);
        tools.pointer_down(&mut canvas, 10.0, 10.0);
        tools.pointer_move(&mut canvas, 20.0, 10.0);
        assert_eq!(canvas.stroke_layer().get_pixel(15, 10), TRANSPARENT);
        assert_eq!(tools.click(&mut canvas, 10.0, 10.0), 60 * 60);
        assert_eq!(canvas.frame().get_pixel(15, 10), RED);
    }

    #[test]
    fn click_outside_fill_mode_is_ignored() {
        let (mut tools, mut canvas) = setup();
        assert_eq!(tools.click(&mut canvas, 10.0, 10.0), 0);
        tools.toggle_fill_mode(&mut canvas);
        assert_eq!(tools.click(&mut canvas, -1.0, 10.0), 0);
        assert_eq!(tools.click(&mut canvas, 60.0, 10.0), 0);
    }

    #[test]
    fn non_finite_click_is_ignored() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_fill_mode(&mut canvas);
        assert_eq!(tools.click(&mut canvas, f32::NAN, 5.0), 0);
        assert_eq!(tools.click(&mut canvas, 5.0, f32::INFINITY), 0);
        assert_eq!(tools.click(&mut canvas, f32::NEG_INFINITY, 5.0), 0);
        assert_eq!(canvas.stroke_layer().get_pixel(0, 0), TRANSPARENT);
        assert_eq!(canvas.frame().get_pixel(0, 0), TRANSPARENT);

        // A finite click on the same blank canvas does fill.
        assert_eq!(tools.click(&mut canvas, 5.0, 5.0), 60 * 60);
        assert_eq!(canvas.stroke_layer().get_pixel(0, 0), RED);
    }

    #[test]
    fn curve_mode_places_and_drags_points() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_curve_mode(&mut canvas);
        for (x, y) in [(10.0, 40.0), (30.0, 0.0), (50.0, 40.0)] {
            tools.pointer_down(&mut canvas, x, y);
            tools.pointer_up(&mut canvas);
        }
        assert_eq!(canvas.curves.len(), 1);
        // Handle disc drawn over the start point.
        assert_eq!(canvas.frame().get_pixel(10, 40), Rgba([255, 0, 0, 255]));

        tools.pointer_down(&mut canvas, 52.0, 41.0);
        assert_eq!(tools.selected_point(), Some(PointRef { curve: 0, point: 2 }));
        tools.pointer_move(&mut canvas, 55.0, 50.0);
        tools.pointer_up(&mut canvas);
        assert_eq!(canvas.curves.curves()[0].end().y, 50.0);
        assert_eq!(canvas.curves.len(), 1, "grabbing must not add a point");
        assert!(canvas.curves.pending().is_empty());
    }

    #[test]
    fn leaving_curve_mode_keeps_curves_and_hides_handles() {
        let (mut tools, mut canvas) = setup();
        tools.toggle_curve_mode(&mut canvas);
        for (x, y) in [(5.0, 5.0), (30.0, 5.0), (55.0, 5.0)] {
            tools.pointer_down(&mut canvas, x, y);
        }
        tools.toggle_curve_mode(&mut canvas);
        assert_eq!(canvas.curves.len(), 1);
        assert!(!canvas.show_curve_handles);
        assert_eq!(canvas.frame().get_pixel(30, 5), RED);
        assert_eq!(canvas.frame().get_pixel(5, 9), TRANSPARENT);
    }

    #[test]
    fn invalid_selectors_leave_state_untouched() {
        let (mut tools, mut canvas) = setup();
        assert!(tools.color_changed(&mut canvas, "#12345").is_err());
        assert_eq!(tools.style().color, RED);
        assert!(tools.tool_changed(&mut canvas, "spiral").is_err());
        assert_eq!(tools.draw_tool(), DrawTool::Free);
        tools.width_changed(&mut canvas, f32::NAN);
        assert_eq!(tools.style().width, MIN_STROKE_WIDTH);
    }
}

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};
use image::Rgba;

use sketchboard::components::tools::{DrawTool, ToolMode};
use sketchboard::io::with_png_extension;
use sketchboard::settings::CanvasSettings;
use sketchboard::{Session, log_err, log_info};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Window front-end: maps egui input onto the session's event stream and
/// shows the composited frame as a texture.
pub struct SketchboardApp {
    session: Session,
    settings: CanvasSettings,
    canvas_texture: Option<TextureHandle>,
    /// Frame generation the texture was last uploaded from.
    uploaded_generation: Option<u64>,
    pointer_inside: bool,
    color: Color32,
    stroke_width: f32,
    title: String,
    status: String,
}

impl SketchboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: CanvasSettings) -> Self {
        let session = Session::from_settings(&settings);
        let style = session.tools().style();
        log_info!(
            "Canvas {}x{}, stroke width {}",
            session.canvas.width,
            session.canvas.height,
            style.width
        );
        Self {
            color: Color32::from_rgb(style.color[0], style.color[1], style.color[2]),
            stroke_width: style.width,
            session,
            settings,
            canvas_texture: None,
            uploaded_generation: None,
            pointer_inside: false,
            title: String::new(),
            status: String::new(),
        }
    }

    fn poll_imports(&mut self, ctx: &egui::Context) {
        for outcome in self.session.poll_imports() {
            self.status = match outcome {
                Ok(ticket) => format!("Image #{} imported", ticket),
                Err(e) => format!("Import failed: {}", e),
            };
        }
        if self.session.pending_imports() > 0 {
            ctx.request_repaint();
        }
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let title = format!("Sketchboard - {}", self.session.display_title());
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            let current = self.session.tools().draw_tool();
            let mut selected = current;
            egui::ComboBox::from_id_source("draw_tool")
                .selected_text(selected.name())
                .show_ui(ui, |ui| {
                    for tool in DrawTool::all() {
                        ui.selectable_value(&mut selected, *tool, tool.name());
                    }
                });
            if selected != current {
                self.session.set_draw_tool(selected);
            }

            if egui::widgets::color_picker::color_edit_button_srgba(
                ui,
                &mut self.color,
                egui::color_picker::Alpha::Opaque,
            )
            .changed()
            {
                let c = self.color;
                self.session.set_color(Rgba([c.r(), c.g(), c.b(), 255]));
            }

            let max = self.session.max_stroke_width();
            if ui
                .add(egui::Slider::new(&mut self.stroke_width, 1.0..=max).text("Width"))
                .changed()
            {
                self.session.width_changed(self.stroke_width);
            }

            ui.separator();

            let mode = self.session.mode();
            if ui
                .selectable_label(mode == ToolMode::Erase, self.session.eraser_label())
                .clicked()
            {
                self.session.toggle_eraser();
            }
            if ui
                .selectable_label(mode == ToolMode::Fill, self.session.fill_label())
                .clicked()
            {
                self.session.toggle_fill_mode();
            }
            if ui
                .selectable_label(mode == ToolMode::CurveEdit, self.session.curve_label())
                .clicked()
            {
                self.session.toggle_curve_mode();
            }

            ui.separator();

            if ui.button("Clear").clicked() {
                self.session.clear_all();
                self.status = "Canvas cleared".to_string();
            }
            if ui.button("Open…").clicked() {
                self.open_dialog();
            }
            if ui.button("Save…").clicked() {
                self.save_dialog();
            }
        });
    }

    fn open_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.status = format!("Loading {}…", path.display());
            self.session.request_import_file(path);
        }
    }

    fn save_dialog(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("sketch.png");
        if let Some(ref dir) = self.settings.last_export_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(path) = dialog.save_file() else { return };
        let path = with_png_extension(path);
        match self.session.save_png(&path) {
            Ok(()) => {
                self.status = format!("Saved {}", path.display());
                self.settings.last_export_dir = path.parent().map(|p| p.to_path_buf());
                self.settings.save();
            }
            Err(e) => {
                log_err!("Save dialog: {}", e);
                self.status = format!("Save failed: {}", e);
            }
        }
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        let generation = self.session.canvas.dirty_generation;
        if self.uploaded_generation == Some(generation) && self.canvas_texture.is_some() {
            return;
        }
        let frame = self.session.frame();
        let image = ColorImage::from_rgba_unmultiplied(
            [frame.width() as usize, frame.height() as usize],
            frame.as_raw(),
        );
        match self.canvas_texture {
            Some(ref mut tex) => tex.set(image, TextureOptions::NEAREST),
            None => {
                self.canvas_texture =
                    Some(ctx.load_texture("canvas_frame", image, TextureOptions::NEAREST));
            }
        }
        self.uploaded_generation = Some(generation);
    }

    fn canvas_view(&mut self, ui: &mut egui::Ui) {
        let size = Vec2::new(
            self.session.canvas.width as f32,
            self.session.canvas.height as f32,
        );
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        self.handle_pointer(ui, rect, &response);
        self.refresh_texture(ui.ctx());

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::WHITE);
        if let Some(ref tex) = self.canvas_texture {
            painter.image(
                tex.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }

    /// Translate this frame's pointer state into enter / leave / down / move
    /// / up / click calls, in canvas-local coordinates.
    fn handle_pointer(&mut self, ui: &egui::Ui, rect: Rect, response: &egui::Response) {
        let (hover, pressed, released, down, moved) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.delta() != Vec2::ZERO,
            )
        });
        let local = hover
            .filter(|p| rect.contains(*p))
            .map(|p| (p.x - rect.min.x, p.y - rect.min.y));

        match (local, self.pointer_inside) {
            (Some((x, y)), false) => {
                self.pointer_inside = true;
                self.session.pointer_enter(x, y, down && !pressed);
            }
            (None, true) => {
                self.pointer_inside = false;
                self.session.pointer_leave();
            }
            _ => {}
        }

        let Some((x, y)) = local else { return };
        if pressed {
            self.session.pointer_down(x, y);
        } else if moved {
            self.session.pointer_move(x, y);
        }
        if released {
            self.session.pointer_up();
        }
        if response.clicked() {
            self.session.click(x, y);
        }
    }
}

impl eframe::App for SketchboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_imports(ctx);
        self.update_title(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{:?}", self.session.mode()));
                ui.separator();
                ui.label(&self.status);
            });
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| self.canvas_view(ui));
        });
    }
}

impl Drop for SketchboardApp {
    fn drop(&mut self) {
        let style = self.session.tools().style();
        self.settings.default_color = sketchboard::components::colors::to_hex(style.color);
        self.settings.default_stroke_width = style.width;
        self.settings.save();
    }
}

mod app;

use app::SketchboardApp;
use eframe::egui;
use sketchboard::cli;
use sketchboard::logger;
use sketchboard::settings::CanvasSettings;

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        logger::init();
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode ----------------------------------------------------------
    logger::init();

    let settings = CanvasSettings::load();
    let inner = [
        (settings.canvas_width as f32 + 40.0).clamp(480.0, 1600.0),
        (settings.canvas_height as f32 + 120.0).clamp(360.0, 1000.0),
    ];
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(inner)
            .with_title("Sketchboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Sketchboard",
        options,
        Box::new(move |cc| Box::new(SketchboardApp::new(cc, settings))),
    )
}

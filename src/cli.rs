// ============================================================================
// Sketchboard CLI: headless replay of a recorded input session
// ============================================================================
//
// Usage examples:
//   sketchboard --events session.json --output out.png
//   sketchboard -e strokes.json -o out.png --background photo.jpg
//   sketchboard -e fill.json -o out.png --width 320 --height 240 --verbose
//
// The event file is a JSON array such as
//   [{"event":"tool","name":"circle"},
//    {"event":"down","x":10,"y":10},{"event":"move","x":40,"y":30},{"event":"up"}]
// No window is opened. Events are applied in order to a fresh session and
// the final visible frame is written as PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::error::CanvasError;
use crate::project::Session;
use crate::settings::CanvasSettings;
use crate::{log_err, log_info};

/// Sketchboard headless replay.
#[derive(Parser, Debug)]
#[command(
    name = "sketchboard",
    about = "Replay a recorded drawing session and export the result",
    long_about = "Apply a JSON array of pointer/selector events to a blank canvas and\n\
                  write the final frame as PNG, without opening the GUI.\n\n\
                  Example:\n  \
                  sketchboard --events session.json --output out.png"
)]
pub struct CliArgs {
    /// JSON event script to replay.
    #[arg(short, long, value_name = "EVENTS.json")]
    pub events: PathBuf,

    /// Destination PNG file.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Image imported as the background before the first event.
    #[arg(short, long, value_name = "IMAGE")]
    pub background: Option<PathBuf>,

    /// Canvas width in pixels (defaults to the saved setting).
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in pixels (defaults to the saved setting).
    #[arg(long)]
    pub height: Option<u32>,

    /// Mirror the session log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// `true` when the process was started with `--events`/`-e`; `main()`
    /// uses this to skip creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--events" || a == "-e" || a.starts_with("--events="))
    }
}

/// One entry of an event script.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Down {
        x: f32,
        y: f32,
    },
    Move {
        x: f32,
        y: f32,
    },
    Up,
    Enter {
        x: f32,
        y: f32,
        #[serde(default)]
        button_down: bool,
    },
    Leave,
    Click {
        x: f32,
        y: f32,
    },
    Tool {
        name: String,
    },
    Color {
        hex: String,
    },
    Width {
        value: f32,
    },
    ToggleEraser,
    ToggleFill,
    ToggleCurves,
    Clear,
    /// Relative paths resolve against the event file's directory.
    Import {
        path: PathBuf,
    },
}

pub fn parse_events(json: &str) -> Result<Vec<ScriptEvent>, CanvasError> {
    Ok(serde_json::from_str(json)?)
}

/// Apply one event. Selector and import errors are returned; pointer events
/// never fail.
pub fn apply_event(
    session: &mut Session,
    event: &ScriptEvent,
    base_dir: &Path,
) -> Result<(), CanvasError> {
    match event {
        ScriptEvent::Down { x, y } => session.pointer_down(*x, *y),
        ScriptEvent::Move { x, y } => session.pointer_move(*x, *y),
        ScriptEvent::Up => session.pointer_up(),
        ScriptEvent::Enter { x, y, button_down } => session.pointer_enter(*x, *y, *button_down),
        ScriptEvent::Leave => session.pointer_leave(),
        ScriptEvent::Click { x, y } => {
            session.click(*x, *y);
        }
        ScriptEvent::Tool { name } => session.tool_changed(name)?,
        ScriptEvent::Color { hex } => session.color_changed(hex)?,
        ScriptEvent::Width { value } => session.width_changed(*value),
        ScriptEvent::ToggleEraser => session.toggle_eraser(),
        ScriptEvent::ToggleFill => session.toggle_fill_mode(),
        ScriptEvent::ToggleCurves => session.toggle_curve_mode(),
        ScriptEvent::Clear => session.clear_all(),
        ScriptEvent::Import { path } => {
            let path = if path.is_relative() { base_dir.join(path) } else { path.clone() };
            session.load_image_file(&path)?;
        }
    }
    Ok(())
}

/// Apply `events` in order, stopping at the first failure. The error names
/// the offending event's position.
pub fn replay(
    session: &mut Session,
    events: &[ScriptEvent],
    base_dir: &Path,
) -> Result<(), CanvasError> {
    for (index, event) in events.iter().enumerate() {
        apply_event(session, event, base_dir)
            .map_err(|e| CanvasError::Script(format!("event #{} ({:?}): {}", index, event, e)))?;
    }
    Ok(())
}

/// Run a whole replay and return an OS exit code.
/// `0` = output written, `1` = anything failed.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::set_mirror_stderr(args.verbose);
    let start = Instant::now();
    match run_inner(&args) {
        Ok(count) => {
            log_info!(
                "Replayed {} events -> {} in {:.0?}",
                count,
                args.output.display(),
                start.elapsed()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_err!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_inner(args: &CliArgs) -> Result<usize, CanvasError> {
    let json = std::fs::read_to_string(&args.events)?;
    let events = parse_events(&json)?;

    let mut settings = CanvasSettings::load();
    if let Some(w) = args.width {
        settings.canvas_width = w;
    }
    if let Some(h) = args.height {
        settings.canvas_height = h;
    }
    let mut session = Session::from_settings(&settings);

    if let Some(ref background) = args.background {
        session.load_image_file(background)?;
    }

    let base_dir = args
        .events
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    replay(&mut session, &events, &base_dir)?;
    session.save_png(&args.output)?;
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_tagged_events() {
        let events = parse_events(
            r##"[
                {"event":"tool","name":"square"},
                {"event":"color","hex":"#ff0000"},
                {"event":"down","x":1,"y":2.5},
                {"event":"enter","x":3,"y":4},
                {"event":"toggle_fill"},
                {"event":"up"}
            ]"##,
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                ScriptEvent::Tool { name: "square".into() },
                ScriptEvent::Color { hex: "#ff0000".into() },
                ScriptEvent::Down { x: 1.0, y: 2.5 },
                ScriptEvent::Enter { x: 3.0, y: 4.0, button_down: false },
                ScriptEvent::ToggleFill,
                ScriptEvent::Up,
            ]
        );
    }

    #[test]
    fn unknown_event_is_a_script_error() {
        assert!(matches!(
            parse_events(r#"[{"event":"teleport"}]"#),
            Err(CanvasError::Script(_))
        ));
    }

    #[test]
    fn replay_draws_and_fills() {
        let mut session = Session::new(20, 20);
        let events = parse_events(
            r##"[
                {"event":"color","hex":"#0000ff"},
                {"event":"width","value":2},
                {"event":"tool","name":"rectangle"},
                {"event":"down","x":5,"y":5},
                {"event":"move","x":15,"y":15},
                {"event":"up"},
                {"event":"color","hex":"#00ff00"},
                {"event":"toggle_fill"},
                {"event":"click","x":10,"y":10},
                {"event":"toggle_fill"}
            ]"##,
        )
        .unwrap();
        replay(&mut session, &events, Path::new(".")).unwrap();
        assert_eq!(session.frame().get_pixel(5, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(session.frame().get_pixel(10, 10), Rgba([0, 255, 0, 255]));
        assert_eq!(session.frame().get_pixel(1, 1), TRANSPARENT);
    }

    #[test]
    fn replay_stops_at_bad_selector() {
        let mut session = Session::new(10, 10);
        let events = vec![
            ScriptEvent::Tool { name: "blob".into() },
            ScriptEvent::Down { x: 5.0, y: 5.0 },
        ];
        let err = replay(&mut session, &events, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("event #0"), "{}", err);
        assert_eq!(session.frame().get_pixel(5, 5), TRANSPARENT);
    }
}

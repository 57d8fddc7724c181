use std::path::{Path, PathBuf};

use crate::error::CanvasError;
use crate::log_warn;

const SETTINGS_FILE: &str = "sketchboard_settings.cfg";

/// Settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Initial selector color as `#rrggbb`.
    pub default_color: String,
    pub default_stroke_width: f32,
    /// Upper bound of the width slider / `width_changed`.
    pub max_stroke_width: f32,
    /// Directory the save dialog opens in.
    pub last_export_dir: Option<PathBuf>,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            default_color: "#000000".to_string(),
            default_stroke_width: 5.0,
            max_stroke_width: 50.0,
            last_export_dir: None,
        }
    }
}

impl CanvasSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/sketchboard/sketchboard_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\Sketchboard\sketchboard_settings.cfg
    /// On macOS:   ~/Library/Application Support/Sketchboard/sketchboard_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?
                .join("sketchboard");
            Some(config_dir.join(SETTINGS_FILE))
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            Some(PathBuf::from(appdata).join("Sketchboard").join(SETTINGS_FILE))
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("Sketchboard")
                    .join(SETTINGS_FILE),
            )
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Load from the per-user file; defaults when missing or unreadable.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys are skipped and bad values keep
    /// their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "canvas_width" => match val.parse::<u32>() {
                    Ok(v) if v > 0 => s.canvas_width = v,
                    _ => {
                        log_warn!("settings: bad canvas_width '{}'", val);
                    }
                },
                "canvas_height" => match val.parse::<u32>() {
                    Ok(v) if v > 0 => s.canvas_height = v,
                    _ => {
                        log_warn!("settings: bad canvas_height '{}'", val);
                    }
                },
                "default_color" => {
                    if crate::components::colors::hex_to_rgb(val).is_ok() {
                        s.default_color = val.to_string();
                    } else {
                        log_warn!("settings: bad default_color '{}'", val);
                    }
                }
                "default_stroke_width" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v >= 1.0
                    {
                        s.default_stroke_width = v;
                    }
                }
                "max_stroke_width" => {
                    if let Ok(v) = val.parse::<f32>()
                        && v.is_finite()
                        && v >= 1.0
                    {
                        s.max_stroke_width = v;
                    }
                }
                "last_export_dir" => {
                    s.last_export_dir = (!val.is_empty()).then(|| PathBuf::from(val));
                }
                _ => {}
            }
        }
        s.default_stroke_width = s.default_stroke_width.min(s.max_stroke_width);
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             default_color={}\n\
             default_stroke_width={}\n\
             max_stroke_width={}\n\
             last_export_dir={}\n",
            self.canvas_width,
            self.canvas_height,
            self.default_color,
            self.default_stroke_width,
            self.max_stroke_width,
            self.last_export_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        )
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CanvasError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    /// Save to the per-user file. Failures are logged, never fatal.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }
}

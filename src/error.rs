use image::ImageError;

/// Errors surfaced at the edges of the drawing core: file and image I/O,
/// selector parsing, and scripted replay. Drawing operations themselves
/// never fail; they degrade to "no visible change".
#[derive(Debug)]
pub enum CanvasError {
    Io(std::io::Error),
    Decode(ImageError),
    Encode(ImageError),
    InvalidColor(String),
    UnknownTool(String),
    Script(String),
}

impl std::fmt::Display for CanvasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanvasError::Io(e) => write!(f, "I/O error: {}", e),
            CanvasError::Decode(e) => write!(f, "Image decode failed: {}", e),
            CanvasError::Encode(e) => write!(f, "Image encode failed: {}", e),
            CanvasError::InvalidColor(s) => write!(f, "Invalid color '{}'", s),
            CanvasError::UnknownTool(s) => write!(f, "Unknown drawing tool '{}'", s),
            CanvasError::Script(s) => write!(f, "Event script error: {}", s),
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::Io(e) => Some(e),
            CanvasError::Decode(e) | CanvasError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CanvasError {
    fn from(e: std::io::Error) -> Self {
        CanvasError::Io(e)
    }
}

/// Bare `ImageError`s come from the decode side; encode paths map explicitly.
impl From<ImageError> for CanvasError {
    fn from(e: ImageError) -> Self {
        CanvasError::Decode(e)
    }
}

impl From<serde_json::Error> for CanvasError {
    fn from(e: serde_json::Error) -> Self {
        CanvasError::Script(e.to_string())
    }
}

//! Sketchboard core: an interactive raster drawing surface.
//!
//! `project::Session` is the entry point. It owns the layered
//! `canvas::CanvasState`, the tool-mode state machine and the background
//! image loader, and accepts the pointer / selector / import stream.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use canvas::{CanvasState, Pixel, PixelBuffer};
pub use error::CanvasError;
pub use project::Session;

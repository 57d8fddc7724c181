use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

use crate::canvas::PixelBuffer;
use crate::error::CanvasError;

// ============================================================================
// ENCODE / DECODE
// ============================================================================

/// Encode a buffer as an RGBA8 PNG into `writer`.
fn write_png<W: Write>(buffer: &PixelBuffer, writer: W) -> Result<(), CanvasError> {
    PngEncoder::new(writer)
        .write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            ColorType::Rgba8,
        )
        .map_err(CanvasError::Encode)
}

/// PNG bytes of `buffer`.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, CanvasError> {
    let mut bytes = Vec::with_capacity(buffer.as_raw().len() / 4);
    write_png(buffer, &mut bytes)?;
    Ok(bytes)
}

/// Decode any supported raster format (format is sniffed from the bytes)
/// into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, CanvasError> {
    let decoded = image::load_from_memory(bytes).map_err(CanvasError::Decode)?;
    Ok(PixelBuffer::from_rgba_image(decoded.to_rgba8()))
}

/// Write `buffer` to `path` as PNG. Safe to call from a background task.
pub fn save_png(buffer: &PixelBuffer, path: &Path) -> Result<(), CanvasError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_png(buffer, &mut writer)?;
    writer.flush()?;
    Ok(())
}

pub fn load_image_file(path: &Path) -> Result<PixelBuffer, CanvasError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

/// Append `.png` when the chosen save path has no extension.
pub fn with_png_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("png")
    }
}

// ============================================================================
// ASYNC IMPORT
// ============================================================================

/// Where an import request gets its bytes from.
#[derive(Clone, Debug)]
pub enum ImportSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Result delivered from a background decode task.
pub enum IoResult {
    ImageLoaded { ticket: u64, image: PixelBuffer },
    LoadFailed { ticket: u64, error: CanvasError },
}

impl IoResult {
    pub fn ticket(&self) -> u64 {
        match self {
            IoResult::ImageLoaded { ticket, .. } | IoResult::LoadFailed { ticket, .. } => *ticket,
        }
    }
}

/// Decodes imports on the rayon pool and hands results back over a
/// channel. Results arrive in completion order, not request order.
pub struct ImageLoader {
    sender: mpsc::Sender<IoResult>,
    receiver: mpsc::Receiver<IoResult>,
    next_ticket: u64,
    pending: usize,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            next_ticket: 0,
            pending: 0,
        }
    }

    /// Number of requests whose result has not been received yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Start decoding in the background. Returns the request's ticket.
    pub fn request(&mut self, source: ImportSource) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending += 1;

        let sender = self.sender.clone();
        rayon::spawn(move || {
            let decoded = match source {
                ImportSource::Bytes(bytes) => decode_image(&bytes),
                ImportSource::File(path) => load_image_file(&path),
            };
            let result = match decoded {
                Ok(image) => IoResult::ImageLoaded { ticket, image },
                Err(error) => IoResult::LoadFailed { ticket, error },
            };
            let _ = sender.send(result);
        });
        ticket
    }

    /// Next finished result, without blocking.
    pub fn try_next(&mut self) -> Option<IoResult> {
        let result = self.receiver.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(result)
    }

    /// Block until the next result arrives. `None` when nothing is in flight.
    pub fn wait_next(&mut self) -> Option<IoResult> {
        if self.pending == 0 {
            return None;
        }
        let result = self.receiver.recv().ok()?;
        self.pending -= 1;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Pixel;
    use image::Rgba;

    const TEAL: Pixel = Rgba([0, 128, 128, 255]);

    fn sample() -> PixelBuffer {
        let mut buf = PixelBuffer::new(3, 2);
        buf.put_pixel(0, 0, TEAL);
        buf.put_pixel(2, 1, Rgba([10, 20, 30, 40]));
        buf
    }

    #[test]
    fn png_bytes_carry_signature_and_pixels() {
        let bytes = encode_png(&sample()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(decode_image(&bytes).unwrap(), sample());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(CanvasError::Decode(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("sketchboard-io-test-missing.png");
        assert!(matches!(load_image_file(&path), Err(CanvasError::Io(_))));
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "sketchboard-io-test-{}.png",
            std::process::id()
        ));
        save_png(&sample(), &path).unwrap();
        let loaded = load_image_file(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.unwrap(), sample());
    }

    #[test]
    fn png_extension_is_added_when_missing() {
        assert_eq!(with_png_extension(PathBuf::from("a/out")), PathBuf::from("a/out.png"));
        assert_eq!(with_png_extension(PathBuf::from("b.PNG")), PathBuf::from("b.PNG"));
    }

    #[test]
    fn loader_reports_every_request() {
        let mut loader = ImageLoader::new();
        let good = loader.request(ImportSource::Bytes(encode_png(&sample()).unwrap()));
        let bad = loader.request(ImportSource::Bytes(vec![1, 2, 3]));
        assert_eq!(loader.pending(), 2);

        let mut seen = Vec::new();
        while let Some(result) = loader.wait_next() {
            match result {
                IoResult::ImageLoaded { ticket, image } => {
                    assert_eq!(image, sample());
                    seen.push((ticket, true));
                }
                IoResult::LoadFailed { ticket, .. } => seen.push((ticket, false)),
            }
        }
        seen.sort();
        assert_eq!(seen, vec![(good, true), (bad, false)]);
        assert_eq!(loader.pending(), 0);
        assert!(loader.try_next().is_none());
    }
}

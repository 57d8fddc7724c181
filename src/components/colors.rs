use image::Rgba;

use crate::canvas::Pixel;
use crate::error::CanvasError;

/// Parse `#rrggbb` (leading `#` optional) into three channels.
pub fn hex_to_rgb(hex: &str) -> Result<[u8; 3], CanvasError> {
    let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CanvasError::InvalidColor(hex.to_string()));
    }
    let value =
        u32::from_str_radix(digits, 16).map_err(|_| CanvasError::InvalidColor(hex.to_string()))?;
    Ok([
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ])
}

/// Parse a selector color into an opaque pixel.
pub fn parse_hex_color(hex: &str) -> Result<Pixel, CanvasError> {
    let [r, g, b] = hex_to_rgb(hex)?;
    Ok(Rgba([r, g, b, 255]))
}

/// Format as lowercase `#rrggbb`; alpha is dropped.
pub fn to_hex(color: Pixel) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_hex_channels() {
        assert_eq!(hex_to_rgb("#ff8800").unwrap(), [255, 136, 0]);
        assert_eq!(hex_to_rgb("00FF7f").unwrap(), [0, 255, 127]);
    }

    #[test]
    fn selector_colors_are_opaque() {
        assert_eq!(parse_hex_color("#102030").unwrap(), Rgba([16, 32, 48, 255]));
        assert_eq!(to_hex(Rgba([16, 32, 48, 9])), "#102030");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "#fff", "#ff880", "#ff88001", "#gg8800", "+ff880"] {
            assert!(
                matches!(hex_to_rgb(bad), Err(CanvasError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}

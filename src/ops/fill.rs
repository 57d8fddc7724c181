use image::Rgba;

use crate::canvas::{Pixel, PixelBuffer};

/// 4-connected flood fill with exact color matching.
///
/// Every pixel reachable from `seed` through neighbours whose color equals
/// the seed color exactly is overwritten with `fill`'s RGB at full opacity.
/// Returns the number of pixels written; 0 when the seed is out of range or
/// already equals `fill`.
///
/// Uses an explicit Vec stack of packed flat indices plus a byte grid for
/// visited tracking, so very large regions never hit recursion limits.
pub fn flood_fill(buffer: &mut PixelBuffer, seed: (u32, u32), fill: Pixel) -> usize {
    let (width, height) = (buffer.width(), buffer.height());
    if seed.0 >= width || seed.1 >= height {
        return 0;
    }

    let target = buffer.get_pixel(seed.0, seed.1);
    if target == fill {
        return 0;
    }
    let written = Rgba([fill[0], fill[1], fill[2], 255]);

    let wu = width as usize;
    let mut visited = vec![0u8; wu * height as usize];
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    stack.push(seed.1 * width + seed.0);
    let mut filled = 0usize;

    while let Some(idx) = stack.pop() {
        let x = idx % width;
        let y = idx / width;
        // A pixel can be pushed several times before it is processed; the
        // color re-check is what keeps already-filled pixels out.
        if visited[idx as usize] != 0 || buffer.get_pixel(x, y) != target {
            continue;
        }
        visited[idx as usize] = 1;
        buffer.put_pixel(x, y, written);
        filled += 1;

        if x > 0 {
            stack.push(idx - 1);
        }
        if x + 1 < width {
            stack.push(idx + 1);
        }
        if y > 0 {
            stack.push(idx - width);
        }
        if y + 1 < height {
            stack.push(idx + width);
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WHITE: Pixel = Rgba([255, 255, 255, 255]);
    const RED: Pixel = Rgba([255, 0, 0, 255]);
    const BLUE: Pixel = Rgba([0, 0, 255, 255]);

    fn pixels(buf: &PixelBuffer) -> Vec<[u8; 4]> {
        buf.as_rgba_image().pixels().map(|p| p.0).collect()
    }

    #[test]
    fn fills_uniform_buffer() {
        let mut buf = PixelBuffer::new_filled(4, 4, WHITE);
        assert_eq!(flood_fill(&mut buf, (0, 0), RED), 16);
        assert_eq!(pixels(&buf), vec![[255, 0, 0, 255]; 16]);
    }

    #[test]
    fn same_color_is_a_no_op() {
        let mut buf = PixelBuffer::new_filled(4, 4, RED);
        buf.put_pixel(1, 1, BLUE);
        let before = pixels(&buf);
        assert_eq!(flood_fill(&mut buf, (0, 0), RED), 0);
        assert_eq!(pixels(&buf), before);
    }

    #[test]
    fn corner_cut_off_by_diagonal_border_is_untouched() {
        // Blue at (2,3) and (3,2) walls off (3,3); diagonals do not connect.
        let mut buf = PixelBuffer::new_filled(4, 4, WHITE);
        buf.put_pixel(2, 3, BLUE);
        buf.put_pixel(3, 2, BLUE);
        assert_eq!(flood_fill(&mut buf, (0, 0), RED), 13);
        assert_eq!(buf.get_pixel(3, 3), WHITE);
        assert_eq!(buf.get_pixel(2, 3), BLUE);
        assert_eq!(buf.get_pixel(2, 2), RED);
    }

    #[test]
    fn single_border_pixel_leaves_remaining_region_connected() {
        let mut buf = PixelBuffer::new_filled(4, 4, WHITE);
        buf.put_pixel(2, 2, BLUE);
        assert_eq!(flood_fill(&mut buf, (0, 0), RED), 15);
        assert_eq!(buf.get_pixel(2, 2), BLUE);
        assert_eq!(buf.get_pixel(3, 3), RED);
    }

    #[test]
    fn disjoint_regions_are_independent() {
        // Vertical blue wall at x = 2 splits the grid into two white halves.
        let mut buf = PixelBuffer::new_filled(5, 3, WHITE);
        for y in 0..3 {
            buf.put_pixel(2, y, BLUE);
        }
        flood_fill(&mut buf, (0, 1), RED);
        for y in 0..3 {
            assert_eq!(buf.get_pixel(0, y), RED);
            assert_eq!(buf.get_pixel(1, y), RED);
            assert_eq!(buf.get_pixel(3, y), WHITE);
            assert_eq!(buf.get_pixel(4, y), WHITE);
        }
    }

    #[test]
    fn filled_pixels_are_always_opaque() {
        let mut buf = PixelBuffer::new_filled(3, 3, Rgba([10, 20, 30, 40]));
        flood_fill(&mut buf, (1, 1), Rgba([0, 200, 0, 7]));
        assert!(pixels(&buf).iter().all(|p| *p == [0, 200, 0, 255]));
    }

    #[test]
    fn exact_match_excludes_near_colors() {
        let mut buf = PixelBuffer::new_filled(3, 1, WHITE);
        buf.put_pixel(1, 0, Rgba([255, 255, 254, 255]));
        assert_eq!(flood_fill(&mut buf, (0, 0), RED), 1);
        assert_eq!(buf.get_pixel(2, 0), WHITE);
    }

    #[test]
    fn out_of_range_seed_is_ignored() {
        let mut buf = PixelBuffer::new_filled(2, 2, WHITE);
        assert_eq!(flood_fill(&mut buf, (2, 0), RED), 0);
        assert_eq!(buf.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn large_region_does_not_overflow() {
        let mut buf = PixelBuffer::new(512, 512);
        assert_eq!(flood_fill(&mut buf, (256, 256), BLUE), 512 * 512);
    }
}

//! Software drawing into an RGBA8 frame buffer.

use image::RgbaImage;

pub(super) fn fill(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

/// Paints rows `[top, bottom)` with `color`.
pub(super) fn fill_rows(frame: &mut [u8], width: u32, top: i32, bottom: i32, color: [u8; 4]) {
    let row_bytes = width as usize * 4;
    if row_bytes == 0 {
        return;
    }
    let rows = (frame.len() / row_bytes) as i32;
    let top = top.clamp(0, rows) as usize;
    let bottom = bottom.clamp(0, rows) as usize;
    if top >= bottom {
        return;
    }
    fill(&mut frame[top * row_bytes..bottom * row_bytes], color);
}

pub(super) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let offset = (y as usize * width as usize + x as usize) * 4;
    if let Some(pixel) = frame.get_mut(offset..offset + 4) {
        pixel.copy_from_slice(&color);
    }
}

pub(super) fn draw_filled_circle(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    radius: i32,
    color: [u8; 4],
) {
    let radius = radius.max(1);
    let radius_sq = i64::from(radius) * i64::from(radius);
    let min_dy = (-radius).max(-cy);
    let max_dy = radius.min(height as i32 - 1 - cy);
    let min_dx = (-radius).max(-cx);
    let max_dx = radius.min(width as i32 - 1 - cx);
    for dy in min_dy..=max_dy {
        for dx in min_dx..=max_dx {
            if i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy) <= radius_sq {
                write_pixel_rgba_clipped(frame, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

pub(super) fn draw_cross(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for x in (cx - half_size)..=(cx + half_size) {
        write_pixel_rgba_clipped(frame, width, height, x, cy, color);
    }
    for y in (cy - half_size)..=(cy + half_size) {
        write_pixel_rgba_clipped(frame, width, height, cx, y, color);
    }
}

/// Blacks out everything outside a centred circle of `radius` pixels.
pub(super) fn apply_vignette(frame: &mut [u8], width: u32, height: u32, radius: f32) {
    let cx = width as f32 * 0.5;
    let cy = height as f32 * 0.5;
    let radius_sq = radius * radius;
    for (index, pixel) in frame.chunks_exact_mut(4).enumerate() {
        let x = (index % width.max(1) as usize) as f32 + 0.5 - cx;
        let y = (index / width.max(1) as usize) as f32 + 0.5 - cy;
        if x * x + y * y > radius_sq {
            pixel.copy_from_slice(&[0, 0, 0, 255]);
        }
    }
}

/// Nearest-neighbour blit of `image` into the rectangle at `(left, top)` sized `out_w` x `out_h`.
#[allow(clippy::too_many_arguments)]
pub(super) fn blit_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    image: &RgbaImage,
    left: i32,
    top: i32,
    out_w: u32,
    out_h: u32,
) {
    if image.width() == 0 || image.height() == 0 || out_w == 0 || out_h == 0 {
        return;
    }
    for out_y in 0..out_h {
        let y = top + out_y as i32;
        if y < 0 || y >= height as i32 {
            continue;
        }
        let src_y = (u64::from(out_y) * u64::from(image.height()) / u64::from(out_h)) as u32;
        for out_x in 0..out_w {
            let x = left + out_x as i32;
            if x < 0 || x >= width as i32 {
                continue;
            }
            let src_x = (u64::from(out_x) * u64::from(image.width()) / u64::from(out_w)) as u32;
            let source = image.get_pixel(src_x, src_y).0;
            if source[3] == 0 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width, height, x, y, source);
        }
    }
}

/// Largest `(w, h)` with the image's aspect ratio that fits in `max_w` x `max_h`.
pub(super) fn fit_within(image_w: u32, image_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if image_w == 0 || image_h == 0 {
        return (0, 0);
    }
    let scale = (max_w as f32 / image_w as f32).min(max_h as f32 / image_h as f32);
    (
        (image_w as f32 * scale).floor().max(1.0) as u32,
        (image_h as f32 * scale).floor().max(1.0) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        write_pixel_rgba_clipped(&mut frame, 4, 4, -1, 0, [9; 4]);
        write_pixel_rgba_clipped(&mut frame, 4, 4, 4, 0, [9; 4]);
        write_pixel_rgba_clipped(&mut frame, 4, 4, 0, 4, [9; 4]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fill_rows_clamps_to_frame() {
        let mut frame = vec![0u8; 2 * 3 * 4];
        fill_rows(&mut frame, 2, 2, 10, [1, 2, 3, 4]);
        assert_eq!(pixel(&frame, 2, 0, 1), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 2, 0, 2), [1, 2, 3, 4]);
        assert_eq!(pixel(&frame, 2, 1, 2), [1, 2, 3, 4]);
    }

    #[test]
    fn circle_larger_than_frame_is_clipped_to_it() {
        let mut frame = vec![0u8; 4 * 3 * 4];
        draw_filled_circle(&mut frame, 4, 3, 1, 1, 1_000, [7; 4]);
        assert!(frame.iter().all(|byte| *byte == 7));

        let mut frame = vec![0u8; 4 * 3 * 4];
        draw_filled_circle(&mut frame, 4, 3, -50, 1, 2, [7; 4]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn vignette_keeps_center_and_blacks_corners() {
        let mut frame = vec![255u8; 10 * 10 * 4];
        apply_vignette(&mut frame, 10, 10, 4.0);
        assert_eq!(pixel(&frame, 10, 5, 5), [255, 255, 255, 255]);
        assert_eq!(pixel(&frame, 10, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn blit_scales_source_to_target_rect() {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        let mut frame = vec![0u8; 4 * 2 * 4];
        blit_scaled(&mut frame, 4, 2, &image, 0, 0, 4, 2);
        assert_eq!(pixel(&frame, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn fit_within_preserves_aspect_ratio() {
        assert_eq!(fit_within(200, 100, 100, 100), (100, 50));
        assert_eq!(fit_within(100, 400, 300, 200), (50, 200));
        assert_eq!(fit_within(0, 10, 100, 100), (0, 0));
    }
}

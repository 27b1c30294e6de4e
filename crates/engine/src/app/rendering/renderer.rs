use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::raster::{
    apply_vignette, blit_scaled, draw_cross, draw_filled_circle, fill, fill_rows, fit_within,
};
use super::{Viewport, CLEAR_COLOR};
use crate::app::SceneWorld;

const CROSSHAIR_COLOR: [u8; 4] = [20, 20, 20, 255];
const CROSSHAIR_HALF_SIZE_PX: i32 = 6;
const BINOCULAR_ZOOM_THRESHOLD: f32 = 1.5;
const BINOCULAR_RADIUS_FRACTION: f32 = 0.45;
const PANEL_BACKDROP_COLOR: [u8; 4] = [250, 250, 245, 255];
const PANEL_FRACTION: f32 = 0.8;
const HORIZON_PROBE_DISTANCE: f32 = 1000.0;
const UNBOUNDED_MODEL_RADIUS: f32 = 0.5;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        compose_frame(self.pixels.frame_mut(), self.viewport, world);
        self.pixels.render()
    }
}

/// Draws one frame of `world` into an RGBA8 buffer sized for `viewport`.
/// Projected disc radius, capped at the viewport diagonal.
fn disc_radius_px(radius: f32, focal: f32, depth: f32, viewport: Viewport) -> i32 {
    let diagonal = (viewport.width as f32).hypot(viewport.height as f32);
    (radius * focal / depth).min(diagonal).round() as i32
}

pub(crate) fn compose_frame(frame: &mut [u8], viewport: Viewport, world: &SceneWorld) {
    let Viewport { width, height } = viewport;
    let camera = world.camera();
    fill(frame, CLEAR_COLOR);

    let horizon_y = camera
        .project(
            camera.position + camera.horizontal_forward() * HORIZON_PROBE_DISTANCE,
            viewport,
        )
        .map(|(_, y, _)| y.round() as i32)
        .unwrap_or(height as i32 / 2);
    if let Some(sky) = world.sky_color() {
        fill_rows(frame, width, 0, horizon_y, sky);
    }
    if let Some(ground) = world.ground_color() {
        fill_rows(frame, width, horizon_y, height as i32, ground);
    }

    let focal = camera.focal_length_px(viewport);
    let mut visible: Vec<(f32, i32, i32, i32, [u8; 4])> = world
        .models()
        .iter()
        .filter_map(|model| {
            let (center, radius) = model.bounding_sphere().unwrap_or((
                model.transform.position,
                UNBOUNDED_MODEL_RADIUS * model.transform.scale.abs(),
            ));
            let (x, y, depth) = camera.project(center, viewport)?;
            let radius_px = disc_radius_px(radius, focal, depth, viewport);
            Some((depth, x.round() as i32, y.round() as i32, radius_px, model.color))
        })
        .collect();
    visible.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (_, x, y, radius_px, color) in visible {
        draw_filled_circle(frame, width, height, x, y, radius_px, color);
    }

    if camera.zoom > BINOCULAR_ZOOM_THRESHOLD {
        let radius = width.min(height) as f32 * BINOCULAR_RADIUS_FRACTION;
        apply_vignette(frame, width, height, radius);
    }

    match world.panel() {
        Some(panel) => {
            let max_w = (width as f32 * PANEL_FRACTION) as u32;
            let max_h = (height as f32 * PANEL_FRACTION) as u32;
            let left = ((width - max_w) / 2) as i32;
            let top = ((height - max_h) / 2) as i32;
            for row in top..top + max_h as i32 {
                let start = (row as usize * width as usize + left as usize) * 4;
                let end = start + max_w as usize * 4;
                if let Some(span) = frame.get_mut(start..end) {
                    fill(span, PANEL_BACKDROP_COLOR);
                }
            }
            if let Some(texture) = &panel.image {
                let (out_w, out_h) =
                    fit_within(texture.image.width(), texture.image.height(), max_w, max_h);
                let image_left = left + (max_w as i32 - out_w as i32) / 2;
                let image_top = top + (max_h as i32 - out_h as i32) / 2;
                blit_scaled(
                    frame,
                    width,
                    height,
                    &texture.image,
                    image_left,
                    image_top,
                    out_w,
                    out_h,
                );
            }
        }
        None => draw_cross(
            frame,
            width,
            height,
            width as i32 / 2,
            height as i32 / 2,
            CROSSHAIR_HALF_SIZE_PX,
            CROSSHAIR_COLOR,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbaImage;

    use glam::Vec3;

    use super::*;
    use crate::app::{PanelView, Transform3};
    use crate::assets::TextureImage;

    const VIEWPORT: Viewport = Viewport {
        width: 64,
        height: 48,
    };

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * VIEWPORT.width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    fn blank_frame() -> Vec<u8> {
        vec![0u8; (VIEWPORT.width * VIEWPORT.height * 4) as usize]
    }

    #[test]
    fn empty_world_clears_to_mint_and_draws_crosshair() {
        let world = SceneWorld::new();
        let mut frame = blank_frame();
        compose_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel(&frame, 0, 0), CLEAR_COLOR);
        assert_eq!(pixel(&frame, 32, 24), CROSSHAIR_COLOR);
    }

    #[test]
    fn model_in_front_is_drawn_in_its_color() {
        let mut world = SceneWorld::new();
        world.spawn_model(
            "Northern_Cardinal",
            Transform3 {
                position: Vec3::new(0.0, 0.0, -4.0),
                ..Transform3::default()
            },
            None,
            [200, 10, 10, 255],
        );
        world.apply_pending();

        let mut frame = blank_frame();
        compose_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel(&frame, 35, 26), [200, 10, 10, 255]);
    }

    #[test]
    fn disc_radius_is_capped_at_viewport_diagonal() {
        assert_eq!(disc_radius_px(0.5, 100.0, 10.0, VIEWPORT), 5);
        assert_eq!(disc_radius_px(0.5, 150.0, 0.1001, VIEWPORT), 80);
    }

    #[test]
    fn model_at_the_near_plane_covers_the_frame() {
        let mut world = SceneWorld::new();
        world.camera_mut().zoom = 5.0;
        world.spawn_model(
            "Blue_Jay",
            Transform3 {
                position: Vec3::new(0.0, 0.0, -0.11),
                ..Transform3::default()
            },
            None,
            [30, 60, 200, 255],
        );
        world.apply_pending();

        let mut frame = blank_frame();
        compose_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel(&frame, 20, 24), [30, 60, 200, 255]);
    }

    #[test]
    fn binocular_zoom_adds_vignette() {
        let mut world = SceneWorld::new();
        world.camera_mut().zoom = 5.0;
        let mut frame = blank_frame();
        compose_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 0, 255]);
        assert_eq!(pixel(&frame, 20, 24), CLEAR_COLOR);
    }

    #[test]
    fn open_panel_hides_crosshair_and_shows_image() {
        let mut world = SceneWorld::new();
        world.open_panel(PanelView {
            title: "Blue_Jay".to_string(),
            image: Some(TextureImage {
                image: Arc::new(RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]))),
            }),
        });
        let mut frame = blank_frame();
        compose_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel(&frame, 32, 24), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 0, 0), CLEAR_COLOR);
    }
}

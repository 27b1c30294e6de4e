use glam::Vec3;

use super::pick::Ray;
use super::rendering::Viewport;

const NEAR_PLANE: f32 = 0.1;
const DEFAULT_FOV_Y_RADIANS: f32 = 75.0 * std::f32::consts::PI / 180.0;
pub const MAX_PITCH_RADIANS: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// First-person perspective camera. At `yaw == 0` it faces -Z; positive yaw
/// turns left about +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Focal-length multiplier; 1 is the unmagnified view.
    pub zoom: f32,
    pub fov_y: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            zoom: 1.0,
            fov_y: DEFAULT_FOV_Y_RADIANS,
        }
    }
}

impl Camera3D {
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(-sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
    }

    /// Forward direction flattened onto the ground plane.
    pub fn horizontal_forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(-sin_yaw, 0.0, -cos_yaw)
    }

    pub fn right(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(cos_yaw, 0.0, -sin_yaw)
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn look_at(&mut self, target: Vec3) {
        let direction = (target - self.position).normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }
        self.pitch = direction
            .y
            .clamp(-1.0, 1.0)
            .asin()
            .clamp(-MAX_PITCH_RADIANS, MAX_PITCH_RADIANS);
        self.yaw = (-direction.x).atan2(-direction.z);
    }

    /// Ray through the centre of the view.
    pub fn center_ray(&self) -> Ray {
        Ray::new(self.position, self.forward())
    }

    pub fn focal_length_px(&self, viewport: Viewport) -> f32 {
        let half_fov = (self.fov_y * 0.5).clamp(0.01, 1.55);
        let zoom = if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        };
        (viewport.height as f32 * 0.5) / half_fov.tan() * zoom
    }

    /// Screen position in pixels plus view depth, or `None` behind the near plane.
    pub fn project(&self, point: Vec3, viewport: Viewport) -> Option<(f32, f32, f32)> {
        let relative = point - self.position;
        let depth = relative.dot(self.forward());
        if depth <= NEAR_PLANE {
            return None;
        }
        let focal = self.focal_length_px(viewport);
        let x = relative.dot(self.right()) / depth * focal + viewport.width as f32 * 0.5;
        let y = viewport.height as f32 * 0.5 - relative.dot(self.up()) / depth * focal;
        Some((x, y, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn default_camera_faces_negative_z() {
        let camera = Camera3D::default();
        assert!(approx(camera.forward(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn look_at_level_target_keeps_pitch_zero() {
        let mut camera = Camera3D {
            position: Vec3::new(0.0, 18.0, 11.0),
            ..Camera3D::default()
        };
        camera.look_at(Vec3::new(0.0, 18.0, 0.0));
        assert!(camera.pitch.abs() < EPSILON);
        assert!(approx(camera.forward(), Vec3::NEG_Z));

        camera.look_at(Vec3::new(-5.0, 18.0, 11.0));
        assert!(approx(camera.forward(), Vec3::NEG_X));
        assert!(approx(camera.horizontal_forward(), Vec3::NEG_X));
    }

    #[test]
    fn point_ahead_projects_to_viewport_center() {
        let camera = Camera3D::default();
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let (x, y, depth) = camera
            .project(Vec3::new(0.0, 0.0, -10.0), viewport)
            .expect("in front");
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!((depth - 10.0).abs() < 1e-3);
        assert!(camera.project(Vec3::new(0.0, 0.0, 5.0), viewport).is_none());
    }

    #[test]
    fn zoom_scales_screen_offset_from_center() {
        let viewport = Viewport {
            width: 800,
            height: 600,
        };
        let point = Vec3::new(1.0, 1.0, -10.0);
        let plain = Camera3D::default();
        let zoomed = Camera3D {
            zoom: 5.0,
            ..Camera3D::default()
        };

        let (px, py, _) = plain.project(point, viewport).expect("plain");
        let (zx, zy, _) = zoomed.project(point, viewport).expect("zoomed");
        assert!(px > 400.0 && py < 300.0);
        assert!(((zx - 400.0) - 5.0 * (px - 400.0)).abs() < 1e-2);
        assert!(((300.0 - zy) - 5.0 * (300.0 - py)).abs() < 1e-2);
    }
}

use tracing::info;

use super::camera::{Camera3D, MAX_PITCH_RADIANS};

const DEFAULT_LOOK_SENSITIVITY: f32 = 0.002;
const MAX_LOOK_DELTA_PER_EVENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

/// Pointer-locked first-person controls over a [`Camera3D`].
///
/// The lock here is the game's view of it; the loop runner mirrors it onto
/// the OS cursor grab and calls [`unlock`](Self::unlock) if the OS refuses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerLockControls {
    state: LockState,
    look_sensitivity: f32,
}

impl Default for PointerLockControls {
    fn default() -> Self {
        Self {
            state: LockState::Unlocked,
            look_sensitivity: DEFAULT_LOOK_SENSITIVITY,
        }
    }
}

impl PointerLockControls {
    pub fn with_look_sensitivity(look_sensitivity: f32) -> Self {
        Self {
            look_sensitivity,
            ..Self::default()
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    /// Returns `true` when the state changed.
    pub fn lock(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }
        self.state = LockState::Locked;
        info!("pointer_locked");
        true
    }

    /// Returns `true` when the state changed.
    pub fn unlock(&mut self) -> bool {
        if !self.is_locked() {
            return false;
        }
        self.state = LockState::Unlocked;
        info!("pointer_unlocked");
        true
    }

    /// Moves along the camera's horizontal forward direction.
    pub fn move_forward(&self, camera: &mut Camera3D, distance: f32) {
        camera.position += camera.horizontal_forward() * distance;
    }

    pub fn move_right(&self, camera: &mut Camera3D, distance: f32) {
        camera.position += camera.right() * distance;
    }

    /// Turns the camera by a raw pointer delta. Ignored while unlocked.
    pub fn apply_look_delta(&self, camera: &mut Camera3D, dx: f32, dy: f32) -> bool {
        if !self.is_locked() {
            return false;
        }
        let dx = dx.clamp(-MAX_LOOK_DELTA_PER_EVENT, MAX_LOOK_DELTA_PER_EVENT);
        let dy = dy.clamp(-MAX_LOOK_DELTA_PER_EVENT, MAX_LOOK_DELTA_PER_EVENT);
        camera.yaw -= dx * self.look_sensitivity;
        camera.pitch = (camera.pitch - dy * self.look_sensitivity)
            .clamp(-MAX_PITCH_RADIANS, MAX_PITCH_RADIANS);
        true
    }
}

use engine::{AudioListener, Camera3D, InputAction, InputSnapshot, PointerLockControls};
use glam::Vec2;
use tracing::{debug, info};

use super::config::GameConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementIntent {
    pub fn from_input(input: &InputSnapshot) -> Self {
        Self {
            forward: input.is_down(InputAction::MoveForward),
            backward: input.is_down(InputAction::MoveBackward),
            left: input.is_down(InputAction::MoveLeft),
            right: input.is_down(InputAction::MoveRight),
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// `(right - left, forward - backward)`, unit length unless zero.
    pub fn direction(&self) -> Vec2 {
        Vec2::new(
            axis(self.right, self.left),
            axis(self.forward, self.backward),
        )
        .normalize_or_zero()
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTuning {
    pub decay: f32,
    pub acceleration: f32,
    pub max_tick_delta: Option<f32>,
    pub zoomed_level: f32,
    pub normal_level: f32,
    pub zoom_convergence: f32,
    pub intro_target_height: f32,
    pub intro_convergence: f32,
    pub intro_snap_epsilon: f32,
}

impl Default for NavigationTuning {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

impl NavigationTuning {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            decay: config.movement.decay,
            acceleration: config.movement.acceleration,
            max_tick_delta: config
                .movement
                .max_tick_delta_ms
                .map(|ms| ms as f32 / 1000.0),
            zoomed_level: config.zoom.zoomed_level,
            normal_level: config.zoom.normal_level,
            zoom_convergence: config.zoom.convergence,
            intro_target_height: config.intro.target_height,
            intro_convergence: config.intro.convergence,
            intro_snap_epsilon: config.intro.snap_epsilon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroState {
    Pending,
    Active,
    /// Terminal; the intro never runs twice.
    Finished,
}

/// Per-tick camera motion: damped acceleration, binocular zoom, the
/// descent intro and the audio listener follow.
#[derive(Debug, Clone)]
pub struct NavigationLoop {
    tuning: NavigationTuning,
    intent: MovementIntent,
    /// `x` is lateral (right positive), `y` is forward.
    velocity: Vec2,
    zoomed: bool,
    intro: IntroState,
}

impl NavigationLoop {
    pub fn new(tuning: NavigationTuning) -> Self {
        Self {
            tuning,
            intent: MovementIntent::default(),
            velocity: Vec2::ZERO,
            zoomed: false,
            intro: IntroState::Pending,
        }
    }

    pub fn set_intent(&mut self, intent: MovementIntent) {
        self.intent = intent;
    }

    pub fn toggle_zoom(&mut self) -> bool {
        self.zoomed = !self.zoomed;
        debug!(zoomed = self.zoomed, "binocular_zoom_toggled");
        self.zoomed
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    /// Returns `false` when the intro is already running or has finished.
    pub fn start_intro(&mut self) -> bool {
        if self.intro != IntroState::Pending {
            return false;
        }
        self.intro = IntroState::Active;
        info!(target_height = self.tuning.intro_target_height, "camera_intro_started");
        true
    }

    #[cfg(test)]
    pub fn intro_state(&self) -> IntroState {
        self.intro
    }

    #[cfg(test)]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn tick(
        &mut self,
        delta: f32,
        camera: &mut Camera3D,
        controls: &PointerLockControls,
        listener: &mut AudioListener,
    ) {
        let delta = match self.tuning.max_tick_delta {
            Some(max) => delta.min(max),
            None => delta,
        };

        self.velocity -= self.velocity * self.tuning.decay * delta;
        if self.intent.any() {
            self.velocity += self.intent.direction() * self.tuning.acceleration * delta;
        }

        if controls.is_locked() {
            controls.move_right(camera, self.velocity.x * delta);
            controls.move_forward(camera, self.velocity.y * delta);
        }

        let zoom_target = if self.zoomed {
            self.tuning.zoomed_level
        } else {
            self.tuning.normal_level
        };
        camera.zoom += (zoom_target - camera.zoom) * self.tuning.zoom_convergence;

        if self.intro == IntroState::Active {
            let target = self.tuning.intro_target_height;
            camera.position.y -= (camera.position.y - target) * self.tuning.intro_convergence;
            if (camera.position.y - target).abs() < self.tuning.intro_snap_epsilon {
                camera.position.y = target;
                self.intro = IntroState::Finished;
                info!(height = target, "camera_intro_finished");
            }
        }

        listener.snap_to(camera.position);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    const DT: f32 = 0.016;

    struct Rig {
        navigation: NavigationLoop,
        camera: Camera3D,
        controls: PointerLockControls,
        listener: AudioListener,
    }

    impl Rig {
        fn locked() -> Self {
            let mut controls = PointerLockControls::default();
            controls.lock();
            Self {
                navigation: NavigationLoop::new(NavigationTuning::default()),
                camera: Camera3D::default(),
                controls,
                listener: AudioListener::default(),
            }
        }

        fn tick(&mut self, delta: f32) {
            self.navigation
                .tick(delta, &mut self.camera, &self.controls, &mut self.listener);
        }
    }

    fn forward_only() -> MovementIntent {
        MovementIntent {
            forward: true,
            ..MovementIntent::default()
        }
    }

    #[test]
    fn forward_motion_matches_closed_form() {
        let mut rig = Rig::locked();
        rig.navigation.set_intent(forward_only());

        rig.tick(DT);
        assert!((rig.navigation.velocity().y - 0.64).abs() < 1e-5);
        for _ in 1..60 {
            rig.tick(DT);
        }

        let expected = 0.064 * (60.0 - 5.25 * (1.0 - 0.84_f64.powi(60)));
        let travelled = -rig.camera.position.z;
        assert!(
            (f64::from(travelled) - expected).abs() < 1e-3,
            "travelled {travelled}, expected {expected}"
        );
        assert!(rig.camera.position.x.abs() < 1e-5);
    }

    #[test]
    fn velocity_approaches_terminal_speed() {
        let mut rig = Rig::locked();
        rig.navigation.set_intent(MovementIntent {
            forward: true,
            right: true,
            ..MovementIntent::default()
        });
        for _ in 0..600 {
            rig.tick(DT);
        }
        assert!((rig.navigation.velocity().length() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn unlocked_pointer_freezes_position_but_damping_continues() {
        let mut rig = Rig::locked();
        rig.navigation.set_intent(forward_only());
        for _ in 0..30 {
            rig.tick(DT);
        }
        rig.navigation.set_intent(MovementIntent::default());
        rig.controls.unlock();
        let parked = rig.camera.position;
        let speed = rig.navigation.velocity().y;

        for _ in 0..10 {
            rig.tick(DT);
        }
        assert_eq!(rig.camera.position, parked);
        assert!(rig.navigation.velocity().y < speed * 0.5);
    }

    #[test]
    fn zoom_converges_geometrically_without_overshoot() {
        let mut rig = Rig::locked();
        rig.navigation.toggle_zoom();
        for k in 1..=30 {
            rig.tick(DT);
            let expected = 5.0 - 4.0 * 0.5_f32.powi(k);
            assert!((rig.camera.zoom - expected).abs() < 1e-5, "tick {k}");
            assert!(rig.camera.zoom <= 5.0);
        }

        rig.navigation.toggle_zoom();
        for _ in 0..30 {
            rig.tick(DT);
        }
        assert!((rig.camera.zoom - 1.0).abs() < 1e-5);
        assert!(rig.camera.zoom >= 1.0);
    }

    #[test]
    fn intro_descends_snaps_and_never_restarts() {
        let mut rig = Rig::locked();
        rig.camera.position = Vec3::new(0.0, 18.0, 11.0);
        assert!(rig.navigation.start_intro());
        assert!(!rig.navigation.start_intro());

        rig.tick(DT);
        assert!((rig.camera.position.y - 14.0).abs() < 1e-5);
        for _ in 0..40 {
            rig.tick(DT);
        }
        assert_eq!(rig.camera.position.y, 10.0);
        assert_eq!(rig.navigation.intro_state(), IntroState::Finished);
        assert!(!rig.navigation.start_intro());

        rig.camera.position.y = 12.0;
        rig.tick(DT);
        assert_eq!(rig.camera.position.y, 12.0);
    }

    #[test]
    fn listener_follows_rounded_camera_position() {
        let mut rig = Rig::locked();
        rig.camera.position = Vec3::new(1.4, 17.6, -2.5);
        rig.tick(DT);
        assert_eq!(rig.listener.position(), Vec3::new(1.0, 18.0, -3.0));
    }

    #[test]
    fn tick_delta_is_clamped_only_when_configured() {
        let mut clamped = Rig::locked();
        clamped.navigation = NavigationLoop::new(NavigationTuning {
            max_tick_delta: Some(0.05),
            ..NavigationTuning::default()
        });
        clamped.navigation.set_intent(forward_only());
        clamped.tick(1.0);
        assert!((clamped.navigation.velocity().y - 2.0).abs() < 1e-5);

        let mut unclamped = Rig::locked();
        unclamped.navigation.set_intent(forward_only());
        unclamped.tick(1.0);
        assert!((unclamped.navigation.velocity().y - 40.0).abs() < 1e-4);
    }
}

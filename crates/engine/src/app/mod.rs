mod camera;
mod controls;
mod input;
mod loop_runner;
mod metrics;
mod pick;
mod rendering;
mod scene;

pub use camera::{Camera3D, MAX_PITCH_RADIANS};
pub use controls::{LockState, PointerLockControls};
pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use pick::{pick_nearest, ray_sphere, PickCandidate, PickHit, Ray};
pub use rendering::{Renderer, Viewport, CLEAR_COLOR};
pub use scene::{
    InputSnapshot, ModelId, PanelView, PlacedModel, Scene, SceneCommand, SceneWorld, Transform3,
};

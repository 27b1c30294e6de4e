use glam::{Quat, Vec3};

use super::camera::Camera3D;
use super::controls::PointerLockControls;
use super::input::{ActionStates, InputAction};
use crate::assets::{Bounds3, TextureImage};
use crate::audio::SoundStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Input gathered since the previous update. Edges are true for exactly one update.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    click_pressed: bool,
    zoom_toggle_pressed: bool,
    confirm_pressed: bool,
    escape_pressed: bool,
    look_delta: (f32, f32),
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        actions: ActionStates,
        click_pressed: bool,
        zoom_toggle_pressed: bool,
        confirm_pressed: bool,
        escape_pressed: bool,
        look_delta: (f32, f32),
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            actions,
            click_pressed,
            zoom_toggle_pressed,
            confirm_pressed,
            escape_pressed,
            look_delta,
            window_width,
            window_height,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_click_pressed(mut self, click_pressed: bool) -> Self {
        self.click_pressed = click_pressed;
        self
    }

    pub fn with_zoom_toggle_pressed(mut self, zoom_toggle_pressed: bool) -> Self {
        self.zoom_toggle_pressed = zoom_toggle_pressed;
        self
    }

    pub fn with_confirm_pressed(mut self, confirm_pressed: bool) -> Self {
        self.confirm_pressed = confirm_pressed;
        self
    }

    pub fn with_escape_pressed(mut self, escape_pressed: bool) -> Self {
        self.escape_pressed = escape_pressed;
        self
    }

    pub fn with_look_delta(mut self, dx: f32, dy: f32) -> Self {
        self.look_delta = (dx, dy);
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn click_pressed(&self) -> bool {
        self.click_pressed
    }

    pub fn zoom_toggle_pressed(&self) -> bool {
        self.zoom_toggle_pressed
    }

    pub fn confirm_pressed(&self) -> bool {
        self.confirm_pressed
    }

    pub fn escape_pressed(&self) -> bool {
        self.escape_pressed
    }

    pub fn look_delta(&self) -> (f32, f32) {
        self.look_delta
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u64);

/// Placement of a model: uniform scale, then heading about +Y, then translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3 {
    pub position: Vec3,
    pub heading: f32,
    pub scale: f32,
}

impl Default for Transform3 {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform3 {
    pub fn apply(&self, local: Vec3) -> Vec3 {
        Quat::from_rotation_y(self.heading) * (local * self.scale) + self.position
    }

    /// World-space bounding sphere of `bounds` under this transform.
    pub fn bounding_sphere(&self, bounds: &Bounds3) -> (Vec3, f32) {
        (self.apply(bounds.center()), bounds.radius() * self.scale.abs())
    }
}

#[derive(Debug, Clone)]
pub struct PlacedModel {
    pub id: ModelId,
    pub label: String,
    pub transform: Transform3,
    pub bounds: Option<Bounds3>,
    pub color: [u8; 4],
}

impl PlacedModel {
    pub fn bounding_sphere(&self) -> Option<(Vec3, f32)> {
        self.bounds
            .as_ref()
            .map(|bounds| self.transform.bounding_sphere(bounds))
    }
}

/// Full-screen card shown over the world, e.g. a field-guide page.
#[derive(Debug, Clone)]
pub struct PanelView {
    pub title: String,
    pub image: Option<TextureImage>,
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    next_model_id: u64,
    models: Vec<PlacedModel>,
    pending_models: Vec<PlacedModel>,
    camera: Camera3D,
    controls: PointerLockControls,
    sound: SoundStage,
    panel: Option<PanelView>,
    sky_color: Option<[u8; 4]>,
    ground_color: Option<[u8; 4]>,
    status: Option<String>,
}

impl SceneWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a model; it becomes visible after [`apply_pending`](Self::apply_pending).
    pub fn spawn_model(
        &mut self,
        label: impl Into<String>,
        transform: Transform3,
        bounds: Option<Bounds3>,
        color: [u8; 4],
    ) -> ModelId {
        let id = ModelId(self.next_model_id);
        self.next_model_id = self.next_model_id.saturating_add(1);
        self.pending_models.push(PlacedModel {
            id,
            label: label.into(),
            transform,
            bounds,
            color,
        });
        id
    }

    pub fn apply_pending(&mut self) {
        self.models.append(&mut self.pending_models);
    }

    pub fn models(&self) -> &[PlacedModel] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> Option<&PlacedModel> {
        self.models.iter().find(|model| model.id == id)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera3D {
        &mut self.camera
    }

    pub fn controls(&self) -> &PointerLockControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut PointerLockControls {
        &mut self.controls
    }

    /// Split borrow for moving the camera through the controls.
    pub fn camera_and_controls_mut(&mut self) -> (&mut Camera3D, &PointerLockControls) {
        (&mut self.camera, &self.controls)
    }

    pub fn sound(&self) -> &SoundStage {
        &self.sound
    }

    pub fn sound_mut(&mut self) -> &mut SoundStage {
        &mut self.sound
    }

    pub fn open_panel(&mut self, panel: PanelView) {
        self.panel = Some(panel);
    }

    pub fn close_panel(&mut self) -> Option<PanelView> {
        self.panel.take()
    }

    pub fn panel(&self) -> Option<&PanelView> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut PanelView> {
        self.panel.as_mut()
    }

    pub fn set_sky_color(&mut self, color: Option<[u8; 4]>) {
        self.sky_color = color;
    }

    pub fn sky_color(&self) -> Option<[u8; 4]> {
        self.sky_color
    }

    pub fn set_ground_color(&mut self, color: Option<[u8; 4]>) {
        self.ground_color = color;
    }

    pub fn ground_color(&self) -> Option<[u8; 4]> {
        self.ground_color
    }

    pub fn set_status(&mut self, status: Option<String>) {
        self.status = status;
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.pending_models.clear();
        self.camera = Camera3D::default();
        self.controls.unlock();
        self.sound.clear();
        self.panel = None;
        self.sky_color = None;
        self.ground_color = None;
        self.status = None;
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(&mut self, dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld)
        -> SceneCommand;
    fn render(&mut self, _world: &SceneWorld) {}
    fn unload(&mut self, world: &mut SceneWorld);
    /// Window title override while this scene is active.
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

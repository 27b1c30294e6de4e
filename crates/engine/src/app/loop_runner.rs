use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{DeviceEvent, ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand, SceneWorld};

pub const SLOW_FRAME_ENV_VAR: &str = "BIRDWATCH_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound on the delta handed to the scene. `None` passes real elapsed time through.
    pub max_frame_delta: Option<Duration>,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Birdwatch".to_string(),
            window_width: 1280,
            window_height: 720,
            max_frame_delta: None,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Runs `scene` until it returns [`SceneCommand::Quit`] or the window closes.
///
/// Exactly one scene update happens per redraw, with the real time elapsed
/// since the previous redraw as its delta.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let max_frame_delta = config.max_frame_delta.filter(|max| !max.is_zero());
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let initial_size = window.inner_size();
    let mut input_collector = InputCollector::new(initial_size.width, initial_size.height);

    let mut world = SceneWorld::new();
    scene.load(&mut world);
    world.apply_pending();
    info!(model_count = world.model_count(), "scene_loaded");

    info!(
        max_frame_delta_ms = max_frame_delta.map(|max| max.as_millis() as u64),
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut cursor_grabbed = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    if world.controls_mut().unlock() {
                        info!(reason = "focus_lost", "pointer_lock_released");
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if !event.repeat {
                        input_collector.handle_physical_key(event.physical_key, event.state);
                    }
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        // Explicit debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    let frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    if frame_dt < raw_frame_dt {
                        warn!(
                            raw_frame_dt_ms = raw_frame_dt.as_millis() as u64,
                            clamped_ms = frame_dt.as_millis() as u64,
                            "frame_delta_clamped"
                        );
                    }

                    let input_snapshot = input_collector.snapshot_for_frame();
                    let command =
                        scene.update(frame_dt.as_secs_f32(), &input_snapshot, &mut world);
                    world.apply_pending();
                    if command == SceneCommand::Quit {
                        info!(reason = "scene_quit", "shutdown_requested");
                        window_target.exit();
                        return;
                    }

                    sync_cursor_grab(&window, &mut world, &mut cursor_grabbed);

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    scene.render(&world);
                    if let Err(error) = renderer.render_world(&world) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scene.debug_title(&world);
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            frame_time_ms = snapshot.frame_time_ms,
                            max_frame_time_ms = snapshot.max_frame_time_ms,
                            model_count = world.model_count(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                input_collector.add_mouse_motion(delta.0 as f32, delta.1 as f32);
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload(&mut world);
                release_cursor(&window);
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Mirrors the controls' lock state onto the OS cursor.
fn sync_cursor_grab(window: &Window, world: &mut SceneWorld, cursor_grabbed: &mut bool) {
    let wants_lock = world.controls().is_locked();
    if wants_lock == *cursor_grabbed {
        return;
    }
    if wants_lock {
        if window.set_cursor_grab(CursorGrabMode::Locked).is_ok()
            || window.set_cursor_grab(CursorGrabMode::Confined).is_ok()
        {
            window.set_cursor_visible(false);
            *cursor_grabbed = true;
        } else {
            warn!("cursor_grab_refused");
            world.controls_mut().unlock();
        }
    } else {
        release_cursor(window);
        *cursor_grabbed = false;
    }
}

fn release_cursor(window: &Window) {
    if let Err(error) = window.set_cursor_grab(CursorGrabMode::None) {
        warn!(error = %error, "cursor_release_failed");
    }
    window.set_cursor_visible(true);
}

/// Press latch: reports one edge per physical press, however long it is held.
#[derive(Debug, Clone, Copy, Default)]
struct EdgeLatch {
    is_down: bool,
    pressed_edge: bool,
}

impl EdgeLatch {
    fn handle(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.is_down {
                    self.pressed_edge = true;
                }
                self.is_down = true;
            }
            ElementState::Released => self.is_down = false,
        }
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed_edge)
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    action_states: ActionStates,
    click: EdgeLatch,
    zoom_toggle: EdgeLatch,
    confirm: EdgeLatch,
    escape: EdgeLatch,
    look_delta: (f32, f32),
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveForward, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveBackward, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => self.zoom_toggle.handle(state),
            PhysicalKey::Code(KeyCode::Enter) | PhysicalKey::Code(KeyCode::NumpadEnter) => {
                self.confirm.handle(state);
            }
            PhysicalKey::Code(KeyCode::Escape) => self.escape.handle(state),
            _ => {}
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.click.handle(state);
        }
    }

    fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.look_delta.0 += dx;
        self.look_delta.1 += dy;
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn snapshot_for_frame(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.action_states,
            self.click.take(),
            self.zoom_toggle.take(),
            self.confirm.take(),
            self.escape.take(),
            std::mem::take(&mut self.look_delta),
            self.window_width,
            self.window_height,
        )
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Option<Duration>) -> Duration {
    match max_frame_delta {
        Some(max) => frame_dt.min(max),
        None => frame_dt,
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclamped_delta_passes_through() {
        let raw = Duration::from_millis(600);
        assert_eq!(clamp_frame_delta(raw, None), raw);
    }

    #[test]
    fn configured_clamp_caps_large_frame() {
        let max = Duration::from_millis(100);
        assert_eq!(clamp_frame_delta(Duration::from_millis(600), Some(max)), max);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), Some(max)),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn click_is_edge_triggered_for_single_frame() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let first = input.snapshot_for_frame();
        let second = input.snapshot_for_frame();
        assert!(first.click_pressed());
        assert!(!second.click_pressed());
    }

    #[test]
    fn held_space_does_not_retoggle_zoom() {
        let mut input = InputCollector::default();
        let space = PhysicalKey::Code(KeyCode::Space);
        input.handle_physical_key(space, ElementState::Pressed);
        let first = input.snapshot_for_frame();
        input.handle_physical_key(space, ElementState::Pressed);
        let second = input.snapshot_for_frame();
        input.handle_physical_key(space, ElementState::Released);
        input.handle_physical_key(space, ElementState::Pressed);
        let third = input.snapshot_for_frame();

        assert!(first.zoom_toggle_pressed());
        assert!(!second.zoom_toggle_pressed());
        assert!(third.zoom_toggle_pressed());
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::default();
        input.handle_physical_key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Pressed);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), ElementState::Pressed);
        let snapshot = input.snapshot_for_frame();
        assert!(snapshot.is_down(InputAction::MoveForward));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveBackward));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        let d = PhysicalKey::Code(KeyCode::KeyD);
        input.handle_physical_key(d, ElementState::Pressed);
        input.handle_physical_key(d, ElementState::Released);
        assert!(!input.snapshot_for_frame().is_down(InputAction::MoveRight));
    }

    #[test]
    fn mouse_motion_accumulates_until_snapshot() {
        let mut input = InputCollector::default();
        input.add_mouse_motion(3.0, -1.0);
        input.add_mouse_motion(2.0, 4.0);
        assert_eq!(input.snapshot_for_frame().look_delta(), (5.0, 3.0));
        assert_eq!(input.snapshot_for_frame().look_delta(), (0.0, 0.0));
    }

    #[test]
    fn escape_and_enter_are_separate_edges() {
        let mut input = InputCollector::new(800, 600);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed);
        input.handle_physical_key(PhysicalKey::Code(KeyCode::Enter), ElementState::Pressed);
        let snapshot = input.snapshot_for_frame();
        assert!(snapshot.escape_pressed());
        assert!(snapshot.confirm_pressed());
        assert_eq!(snapshot.window_size(), (800, 600));
    }

    #[test]
    fn cap_sleep_only_when_under_target() {
        let target = target_frame_duration(Some(50));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(5), target),
            Duration::from_millis(15)
        );
        assert_eq!(compute_cap_sleep(Duration::from_millis(30), target), Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::from_millis(5), None), Duration::ZERO);
    }
}

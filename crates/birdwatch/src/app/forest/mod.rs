//! The forest scene: streamed-in birds, identification by looking at them,
//! and a first-person walk with binoculars.

mod assembly;
mod config;
mod events;
mod gate;
mod navigation;
mod readiness;
mod start_flow;


use engine::{
    AssetKind, FetchBackend, InputSnapshot, PanelView, PlacementDef, PointerLockControls,
    Resource, ResourceLoader, Scene, SceneCommand, SceneWorld, TextureImage,
};
use tracing::{debug, info, warn};

pub(crate) use config::{default_roster, load_game_config, GameConfig, GameConfigError};

use assembly::{
    portrait_path, AssemblyHost, AssemblySettings, ForestMaterial, PlacementKind, WorldAssembly,
};
use events::WorldEvent;
use gate::{ArmOutcome, GateState, InteractionGate};
use navigation::{MovementIntent, NavigationLoop, NavigationTuning};
use start_flow::{tutorial_page_path, tutorial_page_title, StartAdvance, StartFlow};

const TITLE_CARD: &str = "Birdwatch";

const BIRD_PALETTE: [[u8; 4]; 6] = [
    [0xb5, 0x4a, 0x2c, 0xff],
    [0xc8, 0x1d, 0x25, 0xff],
    [0x3a, 0x6e, 0xc4, 0xff],
    [0x20, 0x20, 0x24, 0xff],
    [0xd9, 0xa4, 0x41, 0xff],
    [0x6b, 0x8e, 0x4e, 0xff],
];

/// Texture requested for whatever the info panel shows, delivered by title.
#[derive(Debug)]
struct PanelImageDelivery {
    title: String,
    image: Option<TextureImage>,
}

/// State the loader's completion handlers may touch.
pub(crate) struct ForestContext {
    assembly: WorldAssembly,
    panel_images: Vec<PanelImageDelivery>,
}

impl AssemblyHost for ForestContext {
    fn assembly(&mut self) -> &mut WorldAssembly {
        &mut self.assembly
    }
}

pub(crate) struct ForestScene {
    config: GameConfig,
    loader: ResourceLoader<ForestContext>,
    context: ForestContext,
    gate: InteractionGate,
    navigation: NavigationLoop,
    start: StartFlow,
    /// Name of the bird shown in the info panel.
    identified: Option<String>,
}

impl ForestScene {
    pub(crate) fn new(
        config: GameConfig,
        roster: Vec<PlacementDef>,
        backend: Box<dyn FetchBackend>,
    ) -> Self {
        let settings = AssemblySettings::from_config(&config, roster);
        let navigation = NavigationLoop::new(NavigationTuning::from_config(&config));
        Self {
            config,
            loader: ResourceLoader::new(backend),
            context: ForestContext {
                assembly: WorldAssembly::new(settings),
                panel_images: Vec::new(),
            },
            gate: InteractionGate::new(),
            navigation,
            start: StartFlow::new(),
            identified: None,
        }
    }

    fn apply_assembly_output(&mut self, world: &mut SceneWorld) {
        for event in self.context.assembly.drain_events() {
            match event {
                WorldEvent::WorldReady { count } => {
                    if self.gate.arm() == ArmOutcome::Armed {
                        info!(
                            count,
                            handler_installs = self.gate.handler_installs(),
                            "birds_ready_for_identification"
                        );
                    }
                }
                WorldEvent::WorldDegraded { loaded, failed } => {
                    if self.gate.arm() == ArmOutcome::Armed {
                        warn!(loaded, failed, "identification_armed_degraded");
                    }
                }
                WorldEvent::LoadFailed { kind, path } => {
                    debug!(kind = %kind, path = %path, "world_load_failure_observed");
                }
                WorldEvent::EntityPlaced { slot, name, count } => {
                    debug!(slot, name = %name, count, "bird_arrived");
                }
                WorldEvent::EnvironmentReady | WorldEvent::BaseSceneReady => {}
            }
        }

        for placement in self.context.assembly.drain_placements() {
            if placement.kind == PlacementKind::Scenery {
                continue;
            }
            let color = palette_color(&placement.label);
            world.spawn_model(placement.label, placement.transform, placement.bounds, color);
        }

        for source in self.context.assembly.drain_sounds() {
            world.sound_mut().attach(source);
        }

        world.set_sky_color(self.context.assembly.sky_tint());
        world.set_ground_color(self.context.assembly.ground_tint());
    }

    fn apply_panel_images(&mut self, world: &mut SceneWorld) {
        for delivery in self.context.panel_images.drain(..) {
            match world.panel_mut() {
                Some(panel) if panel.title == delivery.title => panel.image = delivery.image,
                _ => debug!(title = %delivery.title, "panel_image_discarded"),
            }
        }
    }

    fn open_panel(&mut self, world: &mut SceneWorld, title: String, image_path: String) {
        world.open_panel(PanelView {
            title: title.clone(),
            image: None,
        });
        self.loader.load(
            AssetKind::Texture,
            image_path,
            move |ctx: &mut ForestContext, _: &mut ResourceLoader<ForestContext>, result| {
                ctx.panel_images.push(PanelImageDelivery {
                    title,
                    image: result.ok().and_then(Resource::into_texture),
                });
            },
        );
    }

    fn handle_start_flow(&mut self, world: &mut SceneWorld) {
        match self.start.advance() {
            StartAdvance::ShowPage(page) => {
                self.open_panel(world, tutorial_page_title(page), tutorial_page_path(page));
            }
            StartAdvance::StartGame => {
                world.close_panel();
                self.navigation.start_intro();
                world.controls_mut().lock();
            }
            StartAdvance::AlreadyPlaying => {}
        }
    }

    fn handle_click(&mut self, world: &mut SceneWorld) {
        if !world.controls().is_locked() {
            world.controls_mut().lock();
            return;
        }
        let Some(handler) = self.gate.handler() else {
            debug!("click_ignored_gate_idle");
            return;
        };
        let Some(identified) = handler.identify(world.camera(), self.context.assembly.pickables())
        else {
            return;
        };

        world.controls_mut().unlock();
        debug!(name = %identified.name, distance = identified.distance, "info_panel_opened");
        let path = portrait_path(&identified.name);
        self.identified = Some(identified.name.clone());
        self.open_panel(world, identified.name, path);
    }

    fn close_info_panel(&mut self, world: &mut SceneWorld) {
        if let Some(name) = self.identified.take() {
            debug!(name = %name, "info_panel_closed");
        }
        world.close_panel();
        world.controls_mut().lock();
    }

    fn handle_input(&mut self, input: &InputSnapshot, world: &mut SceneWorld) -> SceneCommand {
        if input.escape_pressed() {
            if self.identified.is_some() {
                self.close_info_panel(world);
            } else if world.controls().is_locked() {
                world.controls_mut().unlock();
            } else {
                info!("quit_requested");
                return SceneCommand::Quit;
            }
        }

        if input.zoom_toggle_pressed() {
            self.navigation.toggle_zoom();
        }

        if !self.start.is_playing() {
            if input.click_pressed() || input.confirm_pressed() {
                self.handle_start_flow(world);
            }
        } else if self.identified.is_some() {
            if input.confirm_pressed() {
                self.close_info_panel(world);
            }
        } else if input.click_pressed() {
            self.handle_click(world);
        }

        let (dx, dy) = input.look_delta();
        if dx != 0.0 || dy != 0.0 {
            let (camera, controls) = world.camera_and_controls_mut();
            controls.apply_look_delta(camera, dx, dy);
        }
        SceneCommand::None
    }

    fn status_line(&self) -> String {
        let readiness = self.context.assembly.readiness();
        let gate = match self.gate.state() {
            GateState::Idle => "loading",
            GateState::Armed => "ready",
        };
        let optics = if self.navigation.is_zoomed() {
            " | binoculars"
        } else {
            ""
        };
        format!(
            "birds {}/{} {gate}{optics}",
            readiness.count(),
            readiness.target()
        )
    }
}

impl Scene for ForestScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let camera = world.camera_mut();
        camera.position = self.config.intro.start_position();
        camera.look_at(self.config.intro.look_at());
        camera.zoom = self.config.zoom.normal_level;
        *world.controls_mut() =
            PointerLockControls::with_look_sensitivity(self.config.look_sensitivity);

        if self.config.audio_enabled {
            open_audio_output(world);
        }

        world.open_panel(PanelView {
            title: TITLE_CARD.to_string(),
            image: None,
        });
        self.context.assembly.begin(&mut self.loader);
        world.set_status(Some(self.status_line()));
        info!("forest_scene_loaded");
    }

    fn update(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.loader.dispatch_completions(&mut self.context);
        self.apply_assembly_output(world);
        self.apply_panel_images(world);

        if self.handle_input(input, world) == SceneCommand::Quit {
            return SceneCommand::Quit;
        }

        self.navigation.set_intent(MovementIntent::from_input(input));
        let controls = *world.controls();
        let mut camera = *world.camera();
        let mut listener = *world.sound().listener();
        self.navigation
            .tick(dt_seconds, &mut camera, &controls, &mut listener);
        *world.camera_mut() = camera;
        *world.sound_mut().listener_mut() = listener;
        world.sound_mut().update();

        world.set_status(Some(self.status_line()));
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        world.clear();
        let assembly = &self.context.assembly;
        info!(
            ready = assembly.readiness().is_ready(),
            entities = assembly.entities().len(),
            pickables = assembly.pickables().len(),
            material_slots = assembly.material().map_or(0, ForestMaterial::filled_slots),
            in_flight = self.loader.in_flight(),
            stats = ?self.loader.stats(),
            "forest_scene_unloaded"
        );
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        world.status().map(|status| format!("Birdwatch | {status}"))
    }
}

#[cfg(feature = "audio-backend")]
fn open_audio_output(world: &mut SceneWorld) {
    if let Err(err) = world.sound_mut().open_default_output() {
        warn!(error = %err, "audio_output_unavailable");
    }
}

#[cfg(not(feature = "audio-backend"))]
fn open_audio_output(_world: &mut SceneWorld) {
    debug!("audio_output_not_compiled_in");
}

fn palette_color(label: &str) -> [u8; 4] {
    let hash = label.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    BIRD_PALETTE[hash as usize % BIRD_PALETTE.len()]
}

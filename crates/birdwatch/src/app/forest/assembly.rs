use engine::{
    AssetKind, Bounds3, EnvironmentMap, ExponentialFalloff, LoadFailure, LoadResult, ModelAsset,
    PickCandidate, PlacementDef, PositionalSource, Resource, ResourceLoader, TextureImage,
    Transform3,
};
use glam::Vec3;
use tracing::{debug, info, warn};

use super::config::{DecorativeModelConfig, GameConfig, ReadinessPolicy};
use super::events::WorldEvent;
use super::readiness::{ReadinessCounter, Recorded};

pub const ENVIRONMENT_MAP_PATH: &str = "textures/sky.hdr";
pub const BASE_SCENE_PATH: &str = "model/scene.gltf";

const UNBOUNDED_PICK_RADIUS: f32 = 0.5;

pub fn model_path(name: &str) -> String {
    format!("model/{name}.gltf")
}

pub fn audio_path(name: &str) -> String {
    format!("audio/{name}.wav")
}

pub fn portrait_path(name: &str) -> String {
    format!("textures/{name}.png")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlot {
    Diffuse,
    Normal,
    Occlusion,
    SpecularGlossiness,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 4] = [
        MaterialSlot::Diffuse,
        MaterialSlot::Normal,
        MaterialSlot::Occlusion,
        MaterialSlot::SpecularGlossiness,
    ];

    pub fn path(self) -> &'static str {
        match self {
            MaterialSlot::Diffuse => "model/textures/forest_diffuse.png",
            MaterialSlot::Normal => "model/textures/forest_normal.png",
            MaterialSlot::Occlusion => "model/textures/forest_occlusion.png",
            MaterialSlot::SpecularGlossiness => "model/textures/forest_specularGlossiness.png",
        }
    }
}

/// Forest surface material. Texture slots fill in as their loads land.
#[derive(Debug, Clone, Default)]
pub struct ForestMaterial {
    pub environment: Option<EnvironmentMap>,
    pub diffuse: Option<TextureImage>,
    pub normal: Option<TextureImage>,
    pub occlusion: Option<TextureImage>,
    pub specular_glossiness: Option<TextureImage>,
}

impl ForestMaterial {
    fn with_environment(environment: Option<EnvironmentMap>) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    pub fn slot(&self, slot: MaterialSlot) -> Option<&TextureImage> {
        match slot {
            MaterialSlot::Diffuse => self.diffuse.as_ref(),
            MaterialSlot::Normal => self.normal.as_ref(),
            MaterialSlot::Occlusion => self.occlusion.as_ref(),
            MaterialSlot::SpecularGlossiness => self.specular_glossiness.as_ref(),
        }
    }

    fn fill(&mut self, slot: MaterialSlot, texture: TextureImage) {
        let target = match slot {
            MaterialSlot::Diffuse => &mut self.diffuse,
            MaterialSlot::Normal => &mut self.normal,
            MaterialSlot::Occlusion => &mut self.occlusion,
            MaterialSlot::SpecularGlossiness => &mut self.specular_glossiness,
        };
        *target = Some(texture);
    }

    pub fn filled_slots(&self) -> usize {
        MaterialSlot::ALL
            .iter()
            .filter(|slot| self.slot(**slot).is_some())
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct Pickable {
    pub slot: usize,
    pub name: String,
    /// Sub-object names; all carry the entity's identity name once placed.
    pub mesh_names: Vec<String>,
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PickableSet {
    entries: Vec<Pickable>,
}

impl PickableSet {
    pub fn insert(&mut self, pickable: Pickable) {
        self.entries.push(pickable);
    }

    pub fn get(&self, index: usize) -> Option<&Pickable> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Keyed by index into this set.
    pub fn candidates(&self) -> impl Iterator<Item = PickCandidate<usize>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, pickable)| PickCandidate {
                key: index,
                center: pickable.center,
                radius: pickable.radius,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    Scenery,
    Entity,
    Decorative,
}

/// A model ready to be mirrored into the render world.
#[derive(Debug, Clone)]
pub struct Placement {
    pub kind: PlacementKind,
    pub label: String,
    pub transform: Transform3,
    pub bounds: Option<Bounds3>,
}

#[derive(Debug, Clone)]
pub struct PlacedEntity {
    pub slot: usize,
    pub name: String,
    pub transform: Transform3,
}

#[derive(Debug, Clone)]
pub struct AssemblySettings {
    pub roster: Vec<PlacementDef>,
    pub expected_entity_count: usize,
    pub policy: ReadinessPolicy,
    pub audio_enabled: bool,
    pub heading_offset: f32,
    pub falloff: ExponentialFalloff,
    pub volume: f32,
    pub decorative: Option<DecorativeModelConfig>,
}

impl AssemblySettings {
    pub fn from_config(config: &GameConfig, roster: Vec<PlacementDef>) -> Self {
        Self {
            expected_entity_count: config.expected_entity_count.unwrap_or(roster.len()),
            roster,
            policy: config.readiness_policy,
            audio_enabled: config.audio_enabled,
            heading_offset: config.model_heading_offset,
            falloff: ExponentialFalloff {
                ref_distance: config.sound.ref_distance,
                rolloff_factor: config.sound.rolloff_factor,
            },
            volume: config.sound.volume,
            decorative: config.decorative_model.clone(),
        }
    }
}

/// Loader context that owns a [`WorldAssembly`].
pub trait AssemblyHost: 'static {
    fn assembly(&mut self) -> &mut WorldAssembly;
}

impl AssemblyHost for WorldAssembly {
    fn assembly(&mut self) -> &mut WorldAssembly {
        self
    }
}

/// Builds the forest from asynchronously loaded pieces.
///
/// The environment map gates the material and base scene; the base scene
/// gates the entity models. Everything below that is fire-and-forget. The
/// scene drains [`WorldEvent`]s, placements and sounds after each dispatch.
#[derive(Debug)]
pub struct WorldAssembly {
    settings: AssemblySettings,
    material: Option<ForestMaterial>,
    base_scene: Option<ModelAsset>,
    entities: Vec<PlacedEntity>,
    pickables: PickableSet,
    readiness: ReadinessCounter,
    degraded_signalled: bool,
    events: Vec<WorldEvent>,
    placements: Vec<Placement>,
    sounds: Vec<PositionalSource>,
}

impl WorldAssembly {
    pub fn new(settings: AssemblySettings) -> Self {
        let readiness = ReadinessCounter::new(settings.expected_entity_count);
        Self {
            settings,
            material: None,
            base_scene: None,
            entities: Vec::new(),
            pickables: PickableSet::default(),
            readiness,
            degraded_signalled: false,
            events: Vec::new(),
            placements: Vec::new(),
            sounds: Vec::new(),
        }
    }

    pub fn begin<H: AssemblyHost>(&mut self, loader: &mut ResourceLoader<H>) {
        info!(
            entities = self.settings.roster.len(),
            target = self.settings.expected_entity_count,
            policy = ?self.settings.policy,
            "world_assembly_started"
        );
        if self.settings.expected_entity_count > self.settings.roster.len() {
            warn!(
                entities = self.settings.roster.len(),
                target = self.settings.expected_entity_count,
                "expected_entity_count_exceeds_roster"
            );
        }
        loader.load(
            AssetKind::EnvironmentMap,
            ENVIRONMENT_MAP_PATH,
            |host: &mut H, loader: &mut ResourceLoader<H>, result: LoadResult| {
                host.assembly().on_environment(loader, result);
            },
        );
    }

    fn on_environment<H: AssemblyHost>(
        &mut self,
        loader: &mut ResourceLoader<H>,
        result: LoadResult,
    ) {
        let environment = match expect_resource(
            result,
            AssetKind::EnvironmentMap,
            ENVIRONMENT_MAP_PATH,
            Resource::into_environment_map,
        ) {
            Ok(environment) => {
                let (width, height) = environment.dimensions();
                info!(width, height, "environment_ready");
                self.events.push(WorldEvent::EnvironmentReady);
                Some(environment)
            }
            Err(failure) => {
                self.report_failure(AssetKind::EnvironmentMap, &failure);
                if self.settings.policy == ReadinessPolicy::WaitForAll {
                    warn!(path = ENVIRONMENT_MAP_PATH, "world_assembly_stalled");
                    return;
                }
                None
            }
        };

        self.material = Some(ForestMaterial::with_environment(environment));
        for slot in MaterialSlot::ALL {
            loader.load(
                AssetKind::Texture,
                slot.path(),
                move |host: &mut H, _: &mut ResourceLoader<H>, result: LoadResult| {
                    host.assembly().on_material_texture(slot, result);
                },
            );
        }
        loader.load(
            AssetKind::Model,
            BASE_SCENE_PATH,
            |host: &mut H, loader: &mut ResourceLoader<H>, result: LoadResult| {
                host.assembly().on_base_scene(loader, result);
            },
        );
    }

    fn on_material_texture(&mut self, slot: MaterialSlot, result: LoadResult) {
        match expect_resource(result, AssetKind::Texture, slot.path(), Resource::into_texture) {
            Ok(texture) => {
                if let Some(material) = self.material.as_mut() {
                    material.fill(slot, texture);
                    debug!(slot = ?slot, filled = material.filled_slots(), "material_slot_filled");
                }
            }
            Err(failure) => self.report_failure(AssetKind::Texture, &failure),
        }
    }

    fn on_base_scene<H: AssemblyHost>(
        &mut self,
        loader: &mut ResourceLoader<H>,
        result: LoadResult,
    ) {
        match expect_resource(result, AssetKind::Model, BASE_SCENE_PATH, Resource::into_model) {
            Ok(scene) => {
                info!(meshes = scene.meshes.len(), "base_scene_ready");
                self.placements.push(Placement {
                    kind: PlacementKind::Scenery,
                    label: "scene".to_string(),
                    transform: Transform3::default(),
                    bounds: scene.bounds,
                });
                self.base_scene = Some(scene);
                self.events.push(WorldEvent::BaseSceneReady);
            }
            Err(failure) => {
                self.report_failure(AssetKind::Model, &failure);
                if self.settings.policy == ReadinessPolicy::WaitForAll {
                    warn!(path = BASE_SCENE_PATH, "world_assembly_stalled");
                    return;
                }
            }
        }
        self.issue_entity_loads(loader);
    }

    fn issue_entity_loads<H: AssemblyHost>(&mut self, loader: &mut ResourceLoader<H>) {
        for (slot, def) in self.settings.roster.iter().enumerate() {
            loader.load(
                AssetKind::Model,
                model_path(&def.name),
                move |host: &mut H, loader: &mut ResourceLoader<H>, result: LoadResult| {
                    host.assembly().on_entity_model(loader, slot, result);
                },
            );
        }
        if let Some(decorative) = &self.settings.decorative {
            loader.load(
                AssetKind::Model,
                model_path(&decorative.name),
                |host: &mut H, _: &mut ResourceLoader<H>, result: LoadResult| {
                    host.assembly().on_decorative_model(result);
                },
            );
        }
    }

    fn on_entity_model<H: AssemblyHost>(
        &mut self,
        loader: &mut ResourceLoader<H>,
        slot: usize,
        result: LoadResult,
    ) {
        let Some(def) = self.settings.roster.get(slot).cloned() else {
            warn!(slot, "entity_slot_unknown");
            return;
        };
        if self.readiness.is_recorded(slot) {
            warn!(slot, name = %def.name, "entity_completion_ignored_already_settled");
            return;
        }

        let path = model_path(&def.name);
        let model = expect_resource(result, AssetKind::Model, &path, Resource::into_model);
        let mut model = match model {
            Ok(model) => model,
            Err(failure) => {
                self.report_failure(AssetKind::Model, &failure);
                self.readiness.record_failed(slot);
                self.check_degraded();
                return;
            }
        };

        model.rename_meshes(&def.name);

        let transform = Transform3 {
            position: def.position,
            heading: self.settings.heading_offset + def.heading,
            scale: def.scale,
        };

        if self.settings.audio_enabled && def.sound {
            loader.load(
                AssetKind::Audio,
                audio_path(&def.name),
                move |host: &mut H, _: &mut ResourceLoader<H>, result: LoadResult| {
                    host.assembly().on_entity_audio(slot, result);
                },
            );
        }

        let (center, radius) = match model.bounds.as_ref() {
            Some(bounds) => transform.bounding_sphere(bounds),
            None => (transform.position, UNBOUNDED_PICK_RADIUS * transform.scale),
        };
        self.pickables.insert(Pickable {
            slot,
            name: def.name.clone(),
            mesh_names: model.meshes.iter().map(|mesh| mesh.name.clone()).collect(),
            center,
            radius,
        });
        self.placements.push(Placement {
            kind: PlacementKind::Entity,
            label: def.name.clone(),
            transform,
            bounds: model.bounds,
        });
        self.entities.push(PlacedEntity {
            slot,
            name: def.name.clone(),
            transform,
        });

        let target = self.readiness.target();
        match self.readiness.record_loaded(slot) {
            Recorded::Counted { count } => {
                info!(name = %def.name, count, target, "entity_placed");
                self.events.push(WorldEvent::EntityPlaced {
                    slot,
                    name: def.name,
                    count,
                });
            }
            Recorded::Ready { count } => {
                info!(name = %def.name, count, target, "entity_placed");
                info!(count, "world_ready");
                self.events.push(WorldEvent::EntityPlaced {
                    slot,
                    name: def.name,
                    count,
                });
                self.events.push(WorldEvent::WorldReady { count });
            }
            Recorded::Duplicate => {}
        }
        self.check_degraded();
    }

    fn on_entity_audio(&mut self, slot: usize, result: LoadResult) {
        let Some(entity) = self.entities.iter().find(|entity| entity.slot == slot) else {
            warn!(slot, "entity_audio_without_entity");
            return;
        };
        let path = audio_path(&entity.name);
        match expect_resource(result, AssetKind::Audio, &path, Resource::into_audio) {
            Ok(clip) => {
                debug!(name = %entity.name, "entity_sound_ready");
                self.sounds.push(PositionalSource {
                    label: entity.name.clone(),
                    clip,
                    position: entity.transform.position,
                    volume: self.settings.volume,
                    looping: true,
                    falloff: self.settings.falloff,
                });
            }
            Err(failure) => self.report_failure(AssetKind::Audio, &failure),
        }
    }

    fn on_decorative_model(&mut self, result: LoadResult) {
        let Some(decorative) = self.settings.decorative.clone() else {
            return;
        };
        let path = model_path(&decorative.name);
        match expect_resource(result, AssetKind::Model, &path, Resource::into_model) {
            Ok(model) => {
                debug!(name = %decorative.name, "decorative_model_placed");
                self.placements.push(Placement {
                    kind: PlacementKind::Decorative,
                    label: decorative.name.clone(),
                    transform: Transform3 {
                        position: decorative.position(),
                        heading: decorative.heading,
                        scale: decorative.scale,
                    },
                    bounds: model.bounds,
                });
            }
            Err(failure) => self.report_failure(AssetKind::Model, &failure),
        }
    }

    fn report_failure(&mut self, kind: AssetKind, failure: &LoadFailure) {
        self.events.push(WorldEvent::LoadFailed {
            kind,
            path: failure.path().to_string(),
        });
    }

    fn check_degraded(&mut self) {
        if self.settings.policy != ReadinessPolicy::Degrade
            || self.degraded_signalled
            || !self.readiness.is_degraded()
        {
            return;
        }
        self.degraded_signalled = true;
        let loaded = self.readiness.count();
        let failed = self.readiness.failed();
        warn!(loaded, failed, "world_degraded");
        self.events.push(WorldEvent::WorldDegraded { loaded, failed });
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_placements(&mut self) -> Vec<Placement> {
        std::mem::take(&mut self.placements)
    }

    pub fn drain_sounds(&mut self) -> Vec<PositionalSource> {
        std::mem::take(&mut self.sounds)
    }

    pub fn readiness(&self) -> &ReadinessCounter {
        &self.readiness
    }

    pub fn pickables(&self) -> &PickableSet {
        &self.pickables
    }

    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    pub fn material(&self) -> Option<&ForestMaterial> {
        self.material.as_ref()
    }

    pub fn sky_tint(&self) -> Option<[u8; 4]> {
        self.material
            .as_ref()
            .and_then(|material| material.environment.as_ref())
            .map(EnvironmentMap::mean_color)
    }

    /// Forest floor colour, once both the scene and its diffuse texture are in.
    pub fn ground_tint(&self) -> Option<[u8; 4]> {
        self.base_scene.as_ref()?;
        self.material
            .as_ref()
            .and_then(|material| material.diffuse.as_ref())
            .map(TextureImage::mean_color)
    }
}

fn expect_resource<T>(
    result: LoadResult,
    kind: AssetKind,
    path: &str,
    extract: fn(Resource) -> Option<T>,
) -> Result<T, LoadFailure> {
    let resource = result?;
    let actual = resource.kind();
    extract(resource).ok_or_else(|| LoadFailure::Decode {
        kind,
        path: path.to_string(),
        message: format!("expected {kind} resource, got {actual}"),
    })
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use engine::{ScriptedBackend, ScriptedHandle};

    use super::*;

    fn roster(names: &[&str]) -> Vec<PlacementDef> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| PlacementDef {
                name: name.to_string(),
                position: Vec3::new(index as f32 * 4.0, 10.0, -6.0),
                heading: PI / 3.0,
                scale: 0.5,
                sound: true,
            })
            .collect()
    }

    fn settings(names: &[&str], target: usize) -> AssemblySettings {
        AssemblySettings {
            expected_entity_count: target,
            decorative: None,
            ..AssemblySettings::from_config(&GameConfig::default(), roster(names))
        }
    }

    struct Harness {
        loader: ResourceLoader<WorldAssembly>,
        handle: ScriptedHandle,
        assembly: WorldAssembly,
    }

    impl Harness {
        fn start(settings: AssemblySettings) -> Self {
            let (backend, handle) = ScriptedBackend::new();
            let mut loader = ResourceLoader::new(Box::new(backend));
            let mut assembly = WorldAssembly::new(settings);
            assembly.begin(&mut loader);
            Self {
                loader,
                handle,
                assembly,
            }
        }

        fn complete(&mut self, path: &str) {
            assert!(self.handle.complete_placeholder(path).is_some(), "{path} not open");
            self.loader.dispatch_completions(&mut self.assembly);
        }

        fn fail(&mut self, path: &str) {
            assert!(self.handle.fail(path).is_some(), "{path} not open");
            self.loader.dispatch_completions(&mut self.assembly);
        }

        fn through_base_scene(settings: AssemblySettings) -> Self {
            let mut harness = Self::start(settings);
            harness.complete(ENVIRONMENT_MAP_PATH);
            harness.complete(BASE_SCENE_PATH);
            harness.assembly.drain_events();
            harness
        }

        fn open_paths(&self) -> Vec<String> {
            self.handle
                .open_requests()
                .into_iter()
                .map(|request| request.path)
                .collect()
        }
    }

    fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for (index, first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(index);
            for mut tail in permutations(&rest) {
                tail.insert(0, *first);
                out.push(tail);
            }
        }
        out
    }

    fn count_ready(events: &[WorldEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, WorldEvent::WorldReady { .. }))
            .count()
    }

    #[test]
    fn begin_issues_only_the_environment_map() {
        let harness = Harness::start(settings(&["A"], 1));
        assert_eq!(harness.open_paths(), vec![ENVIRONMENT_MAP_PATH.to_string()]);
    }

    #[test]
    fn environment_gates_material_textures_and_base_scene() {
        let mut harness = Harness::start(settings(&["A"], 1));
        assert!(harness.assembly.material().is_none());
        harness.complete(ENVIRONMENT_MAP_PATH);

        let material = harness.assembly.material().expect("material");
        assert!(material.environment.is_some());
        let open = harness.open_paths();
        for slot in MaterialSlot::ALL {
            assert!(open.contains(&slot.path().to_string()));
        }
        assert!(open.contains(&BASE_SCENE_PATH.to_string()));
        assert!(!open.contains(&model_path("A")));
        assert_eq!(harness.assembly.drain_events(), vec![WorldEvent::EnvironmentReady]);
    }

    #[test]
    fn material_slots_fill_in_any_order() {
        let mut harness = Harness::start(settings(&["A"], 1));
        harness.complete(ENVIRONMENT_MAP_PATH);
        harness.complete(MaterialSlot::Occlusion.path());
        harness.complete(MaterialSlot::Diffuse.path());

        let material = harness.assembly.material().expect("material");
        assert_eq!(material.filled_slots(), 2);
        assert!(material.slot(MaterialSlot::Normal).is_none());
    }

    #[test]
    fn base_scene_issues_one_load_per_roster_entry_plus_decorative() {
        let mut config_settings =
            AssemblySettings::from_config(&GameConfig::default(), roster(&["A", "B"]));
        config_settings.expected_entity_count = 2;
        let mut harness = Harness::start(config_settings);
        harness.complete(ENVIRONMENT_MAP_PATH);
        harness.complete(BASE_SCENE_PATH);

        let open = harness.open_paths();
        let model_loads: Vec<_> = open
            .iter()
            .filter(|path| path.starts_with("model/") && !path.starts_with("model/textures"))
            .collect();
        assert_eq!(
            model_loads,
            vec!["model/A.gltf", "model/B.gltf", "model/American_Robin.gltf"]
        );
        let placements = harness.assembly.drain_placements();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].kind, PlacementKind::Scenery);
    }

    #[test]
    fn entity_completion_renames_places_requests_audio_and_counts() {
        let mut harness = Harness::through_base_scene(settings(&["Blue_Jay", "B"], 2));
        harness.complete(&model_path("Blue_Jay"));

        let entity = &harness.assembly.entities()[0];
        assert!((entity.transform.heading - (FRAC_PI_2 + PI / 3.0)).abs() < 1e-6);
        assert_eq!(entity.transform.scale, 0.5);
        assert!(harness.handle.is_open(&audio_path("Blue_Jay")));

        let pickable = harness.assembly.pickables().get(0).expect("pickable");
        assert_eq!(pickable.mesh_names, vec!["Blue_Jay"]);
        assert_eq!(pickable.center, entity.transform.position);
        assert!((pickable.radius - Vec3::ONE.length() * 0.5 * 0.5).abs() < 1e-6);

        assert_eq!(harness.assembly.readiness().count(), 1);
        assert_eq!(
            harness.assembly.drain_events(),
            vec![WorldEvent::EntityPlaced {
                slot: 0,
                name: "Blue_Jay".to_string(),
                count: 1
            }]
        );
    }

    #[test]
    fn audio_completion_queues_a_looping_falloff_source() {
        let mut harness = Harness::through_base_scene(settings(&["A"], 1));
        harness.complete(&model_path("A"));
        harness.complete(&audio_path("A"));

        let sounds = harness.assembly.drain_sounds();
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].label, "A");
        assert!(sounds[0].looping);
        assert_eq!(sounds[0].volume, 0.8);
        assert_eq!(sounds[0].falloff, ExponentialFalloff::default());
    }

    #[test]
    fn audio_disabled_skips_sound_loads() {
        let mut disabled = settings(&["A"], 1);
        disabled.audio_enabled = false;
        let mut harness = Harness::through_base_scene(disabled);
        harness.complete(&model_path("A"));
        assert!(!harness.handle.is_open(&audio_path("A")));
        assert_eq!(count_ready(&harness.assembly.drain_events()), 1);
    }

    #[test]
    fn readiness_is_independent_of_completion_order() {
        let names = ["A", "B", "C", "D"];
        for order in permutations(&[0, 1, 2, 3]) {
            let mut harness = Harness::through_base_scene(settings(&names, 4));
            let mut events = Vec::new();
            for (step, slot) in order.iter().enumerate() {
                harness.complete(&model_path(names[*slot]));
                let batch = harness.assembly.drain_events();
                let expected_ready = usize::from(step == names.len() - 1);
                assert_eq!(count_ready(&batch), expected_ready, "order {order:?}");
                events.extend(batch);
            }
            assert_eq!(count_ready(&events), 1);
            assert_eq!(harness.assembly.readiness().count(), 4);
            assert_eq!(harness.assembly.pickables().len(), 4);
        }
    }

    #[test]
    fn duplicate_model_completion_is_not_counted() {
        let mut harness = Harness::through_base_scene(settings(&["A", "B"], 2));
        let task = harness
            .handle
            .complete_placeholder(&model_path("A"))
            .expect("open");
        harness
            .handle
            .inject_completion(task, Ok(Resource::placeholder(AssetKind::Model)));
        harness.loader.dispatch_completions(&mut harness.assembly);

        assert_eq!(harness.assembly.readiness().count(), 1);
        assert_eq!(harness.assembly.pickables().len(), 1);
        assert_eq!(harness.loader.stats().duplicate_completions, 1);
    }

    #[test]
    fn three_of_four_is_never_ready() {
        let names = ["A", "B", "C", "D"];
        let mut harness = Harness::through_base_scene(settings(&names, 4));
        for name in &names[..3] {
            harness.complete(&model_path(name));
        }
        for _ in 0..10 {
            harness.loader.dispatch_completions(&mut harness.assembly);
        }
        assert_eq!(count_ready(&harness.assembly.drain_events()), 0);
        assert!(!harness.assembly.readiness().is_ready());
    }

    #[test]
    fn zero_target_never_signals_ready() {
        let mut harness = Harness::through_base_scene(settings(&["A"], 0));
        harness.complete(&model_path("A"));
        assert_eq!(count_ready(&harness.assembly.drain_events()), 0);
    }

    #[test]
    fn decorative_model_never_counts() {
        let mut config_settings =
            AssemblySettings::from_config(&GameConfig::default(), roster(&["A"]));
        config_settings.expected_entity_count = 1;
        let mut harness = Harness::through_base_scene(config_settings);
        harness.complete(&model_path("American_Robin"));

        assert_eq!(harness.assembly.readiness().count(), 0);
        let placements = harness.assembly.drain_placements();
        assert!(placements
            .iter()
            .any(|placement| placement.kind == PlacementKind::Decorative));
    }

    #[test]
    fn entity_failure_is_reported_and_waits_forever_by_default() {
        let mut harness = Harness::through_base_scene(settings(&["A", "B"], 2));
        harness.complete(&model_path("A"));
        harness.fail(&model_path("B"));

        let events = harness.assembly.drain_events();
        assert!(events.contains(&WorldEvent::LoadFailed {
            kind: AssetKind::Model,
            path: model_path("B"),
        }));
        assert_eq!(count_ready(&events), 0);
        assert!(!events
            .iter()
            .any(|event| matches!(event, WorldEvent::WorldDegraded { .. })));
    }

    #[test]
    fn degrade_policy_signals_once_everything_settles() {
        let mut degrade = settings(&["A", "B", "C"], 3);
        degrade.policy = ReadinessPolicy::Degrade;
        let mut harness = Harness::through_base_scene(degrade);
        harness.fail(&model_path("B"));
        harness.complete(&model_path("A"));
        assert!(!harness
            .assembly
            .drain_events()
            .iter()
            .any(|event| matches!(event, WorldEvent::WorldDegraded { .. })));

        harness.complete(&model_path("C"));
        let events = harness.assembly.drain_events();
        assert!(events.contains(&WorldEvent::WorldDegraded { loaded: 2, failed: 1 }));
        assert_eq!(count_ready(&events), 0);
    }

    #[test]
    fn environment_failure_stalls_unless_degrading() {
        let mut stalled = Harness::start(settings(&["A"], 1));
        stalled.fail(ENVIRONMENT_MAP_PATH);
        assert!(stalled.open_paths().is_empty());
        assert!(stalled.assembly.material().is_none());

        let mut degrade = settings(&["A"], 1);
        degrade.policy = ReadinessPolicy::Degrade;
        let mut recovering = Harness::start(degrade);
        recovering.fail(ENVIRONMENT_MAP_PATH);
        assert!(recovering.handle.is_open(BASE_SCENE_PATH));
        assert!(recovering
            .assembly
            .material()
            .is_some_and(|material| material.environment.is_none()));
    }
}

use engine::AssetKind;

/// Progress of world assembly, drained by the scene once per update.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    EnvironmentReady,
    BaseSceneReady,
    EntityPlaced { slot: usize, name: String, count: usize },
    /// Every expected entity is placed. Emitted at most once.
    WorldReady { count: usize },
    /// Every expected entity has settled but some failed. Only under the degrade policy.
    WorldDegraded { loaded: usize, failed: usize },
    LoadFailed { kind: AssetKind, path: String },
}

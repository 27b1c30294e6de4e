use std::path::Path;

use engine::assets::BackendError;
use engine::{
    compile_placement_roster, resolve_app_paths, ContentError, LoopConfig, PlacementDef, Scene,
    StartupError, ThreadedBackend,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::forest::{default_roster, load_game_config, ForestScene, GameConfigError};

const GAME_CONFIG_FILE: &str = "config.json";
const ROSTER_FILE: &str = "roster.xml";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] GameConfigError),
    #[error(transparent)]
    Roster(#[from] ContentError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Birdwatch Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "project_root_resolved");

    let game_config = load_game_config(&paths.base_content_dir.join(GAME_CONFIG_FILE))?;
    let roster = load_roster(&paths.base_content_dir.join(ROSTER_FILE))?;
    info!(
        birds = roster.len(),
        expected = game_config.expected_entity_count.unwrap_or(roster.len()),
        "roster_loaded"
    );

    let backend = ThreadedBackend::new(paths.asset_dir.clone(), game_config.asset_workers)?;
    let scene = ForestScene::new(game_config, roster, Box::new(backend));

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
    })
}

fn load_roster(path: &Path) -> Result<Vec<PlacementDef>, ContentError> {
    if !path.is_file() {
        info!(path = %path.display(), "roster_file_missing_using_builtin");
        return Ok(default_roster());
    }
    compile_placement_roster(path)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

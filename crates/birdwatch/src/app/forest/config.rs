use std::f32::consts::{FRAC_PI_2, PI};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::PlacementDef;
use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

/// What happens to readiness when an entity model fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Failed entities never count; the world may never become ready.
    #[default]
    WaitForAll,
    /// Once every expected entity has settled, arm interaction with whatever loaded.
    Degrade,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    pub decay: f32,
    pub acceleration: f32,
    pub max_tick_delta_ms: Option<u64>,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            decay: 10.0,
            acceleration: 40.0,
            max_tick_delta_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomConfig {
    pub zoomed_level: f32,
    pub normal_level: f32,
    pub convergence: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            zoomed_level: 5.0,
            normal_level: 1.0,
            convergence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntroConfig {
    pub start_position: [f32; 3],
    pub look_at: [f32; 3],
    pub target_height: f32,
    pub convergence: f32,
    pub snap_epsilon: f32,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            start_position: [0.0, 18.0, 11.0],
            look_at: [0.0, 18.0, 0.0],
            target_height: 10.0,
            convergence: 0.5,
            snap_epsilon: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoundConfig {
    pub ref_distance: f32,
    pub rolloff_factor: f32,
    pub volume: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            ref_distance: 3.0,
            rolloff_factor: 2.0,
            volume: 0.8,
        }
    }
}

/// Model shown beside the start pages. Never counts toward readiness.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecorativeModelConfig {
    pub name: String,
    pub position: [f32; 3],
    pub heading: f32,
    #[serde(default = "default_model_scale")]
    pub scale: f32,
}

fn default_model_scale() -> f32 {
    0.5
}

impl Default for DecorativeModelConfig {
    fn default() -> Self {
        Self {
            name: "American_Robin".to_string(),
            position: [-1.5, 17.0, 8.5],
            heading: 1.3 * PI,
            scale: default_model_scale(),
        }
    }
}

/// Tuning loaded from `assets/base/config.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Entities that must load before interaction arms. Defaults to the roster length.
    pub expected_entity_count: Option<usize>,
    pub readiness_policy: ReadinessPolicy,
    pub audio_enabled: bool,
    pub asset_workers: usize,
    pub look_sensitivity: f32,
    /// Added to every roster heading; the bird models face +X at rest.
    pub model_heading_offset: f32,
    pub movement: MovementConfig,
    pub zoom: ZoomConfig,
    pub intro: IntroConfig,
    pub sound: SoundConfig,
    pub decorative_model: Option<DecorativeModelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            expected_entity_count: None,
            readiness_policy: ReadinessPolicy::WaitForAll,
            audio_enabled: true,
            asset_workers: 2,
            look_sensitivity: 0.002,
            model_heading_offset: FRAC_PI_2,
            movement: MovementConfig::default(),
            zoom: ZoomConfig::default(),
            intro: IntroConfig::default(),
            sound: SoundConfig::default(),
            decorative_model: Some(DecorativeModelConfig::default()),
        }
    }
}

impl IntroConfig {
    pub fn start_position(&self) -> Vec3 {
        Vec3::from_array(self.start_position)
    }

    pub fn look_at(&self) -> Vec3 {
        Vec3::from_array(self.look_at)
    }
}

impl DecorativeModelConfig {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Roster used when `roster.xml` is absent.
pub fn default_roster() -> Vec<PlacementDef> {
    let bird = |name: &str, position: [f32; 3], heading: f32| PlacementDef {
        name: name.to_string(),
        position: Vec3::from_array(position),
        heading,
        scale: default_model_scale(),
        sound: true,
    };
    vec![
        bird("American_Robin", [0.5, 5.0, -1.0], PI / 3.0),
        bird("Northern_Cardinal", [3.0, 14.0, -4.5], PI),
        bird("Blue_Jay", [-5.0, 13.0, -8.0], PI / 6.0),
        bird("Red-winged_Black_Bird", [8.2, 9.0, 6.8], -PI / 6.0),
    ]
}

#[derive(Debug, Error)]
pub enum GameConfigError {
    #[error("failed to read game config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid game config {path} at '{json_path}': {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
}

/// Reads the game config. A missing file yields the defaults.
pub fn load_game_config(path: &Path) -> Result<GameConfig, GameConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(GameConfig::default());
        }
        Err(source) => {
            return Err(GameConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_game_config(&raw, path)
}

pub fn parse_game_config(raw: &str, path: &Path) -> Result<GameConfig, GameConfigError> {
    let mut de = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut de).map_err(|error| {
        let json_path = error.path().to_string();
        GameConfigError::Parse {
            path: path.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp = TempDir::new().expect("temp");
        let config = load_game_config(&temp.path().join("config.json")).expect("defaults");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.movement.decay, 10.0);
        assert_eq!(config.zoom.zoomed_level, 5.0);
        assert_eq!(config.readiness_policy, ReadinessPolicy::WaitForAll);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config = parse_game_config(
            r#"{ "expected_entity_count": 3, "intro": { "convergence": 0.05 }, "readiness_policy": "degrade" }"#,
            Path::new("config.json"),
        )
        .expect("parse");
        assert_eq!(config.expected_entity_count, Some(3));
        assert_eq!(config.intro.convergence, 0.05);
        assert_eq!(config.intro.target_height, 10.0);
        assert_eq!(config.readiness_policy, ReadinessPolicy::Degrade);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let err = parse_game_config(
            r#"{ "movement": { "decay": "fast" } }"#,
            Path::new("config.json"),
        )
        .expect_err("invalid");
        match err {
            GameConfigError::Parse { json_path, .. } => assert_eq!(json_path, "movement.decay"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_roster_has_four_distinct_singing_birds() {
        let roster = default_roster();
        assert_eq!(roster.len(), 4);
        assert!(roster.iter().all(|bird| bird.sound && bird.scale == 0.5));
        let mut names: Vec<_> = roster.iter().map(|bird| bird.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_game_config(r#"{ "zoom": { "speed": 2 } }"#, Path::new("config.json"))
            .expect_err("unknown field");
        assert!(err.to_string().contains("speed"));
    }
}

/// Terminal front end configuration, loaded from TOML
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub target_fps: u32,
    /// Populate the built-in primitives, drifting grid and floor
    pub demo_scene: bool,
    /// Spacing of the floor vertex grid
    pub floor_step: f32,
    /// Import the built-in cube mesh in front of the camera
    pub show_cube: bool,
    pub camera: CameraConfig,
    pub movement: MovementConfig,
    pub meshes: Vec<MeshConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            demo_scene: true,
            floor_step: 0.5,
            show_cube: true,
            camera: CameraConfig::default(),
            movement: MovementConfig::default(),
            meshes: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.floor_step.is_finite() || self.floor_step <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "floor_step",
                reason: format!("must be positive and finite, got {}", self.floor_step),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub orientation: [f32; 3],
    pub zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            orientation: [0.0, 100.0, 0.0],
            zoom: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Velocity added per key press, units per second
    pub move_speed: f32,
    /// Heading change per key press
    pub turn_speed_deg: f32,
    /// Speed of `moving_over` entities towards the camera
    pub drift_speed: f32,
    /// Fraction of camera velocity kept per second
    pub damping: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            turn_speed_deg: 1.0,
            drift_speed: 20.0,
            damping: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub name: String,
    pub obj: String,
    #[serde(default)]
    pub mtl: Option<String>,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config = AppConfig::from_toml_str(
            r#"
target_fps = 60
demo_scene = false

[camera]
zoom = 20.0

[[meshes]]
name = "spoon"
obj = "assets/spoon.obj"
mtl = "assets/spoon.mtl"

[[meshes]]
name = "teapot"
obj = "assets/teapot.obj"
scale = 0.5
"#,
        )
        .unwrap();

        assert_eq!(config.target_fps, 60);
        assert!(!config.demo_scene);
        assert_eq!(config.camera.zoom, 20.0);
        assert_eq!(config.camera.orientation, [0.0, 100.0, 0.0]);
        assert_eq!(config.movement, MovementConfig::default());
        assert_eq!(config.meshes.len(), 2);
        assert_eq!(config.meshes[0].mtl.as_deref(), Some("assets/spoon.mtl"));
        assert_eq!(config.meshes[0].scale, 1.0);
        assert_eq!(config.meshes[1].mtl, None);
        assert_eq!(config.meshes[1].scale, 0.5);
    }

    #[test]
    fn test_non_positive_floor_step_rejected() {
        for text in ["floor_step = 0.0", "floor_step = -0.5", "floor_step = nan"] {
            assert!(matches!(
                AppConfig::from_toml_str(text),
                Err(ConfigError::Invalid { field: "floor_step", .. })
            ));
        }
        assert!(AppConfig::from_toml_str("floor_step = 0.3").is_ok());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            AppConfig::from_toml_str("target_fps = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }
}

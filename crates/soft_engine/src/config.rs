//! Scene configuration loading
//!
//! The camera/perspective/viewport surface is a typed record deserializable
//! from TOML. Scene graphs themselves are constructed programmatically; there
//! is no persisted scene format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::{CameraSettings, PerspectiveSettings, Viewport};

/// Errors raised while loading a scene configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML source failed to parse or did not match the schema
    #[error("failed to parse scene config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Camera, projection and viewport settings for a scene
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SceneConfig {
    /// Camera placement
    pub camera: CameraSettings,
    /// Perspective projection parameters
    pub perspective: PerspectiveSettings,
    /// Output viewport rectangle in pixels
    pub viewport: Viewport,
}

impl SceneConfig {
    /// Parse a scene configuration from TOML text
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = SceneConfig::from_toml(
            r#"
            [camera]
            position = [0.0, 5.0, -15.0]
            lookat = [0.0, 1.0, 0.0]
            up = [0.0, 1.0, 0.0]

            [perspective]
            fov = 45.0
            aspect = 1.6
            near = 0.5
            far = 500.0

            [viewport]
            x = 0.0
            y = 0.0
            width = 800.0
            height = 600.0
            "#,
        )
        .expect("config parses");

        assert_eq!(config.camera.position.y, 5.0);
        assert_eq!(config.perspective.fov, 45.0);
        assert_eq!(config.viewport.width, 800.0);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = SceneConfig::from_toml("[perspective]\nfov = 60.0\n").expect("partial config parses");
        assert_eq!(config.perspective.fov, 60.0);
        assert_eq!(config.viewport.width, Viewport::default().width);
        assert_eq!(config.camera.position, CameraSettings::default().position);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(SceneConfig::from_toml("camera = not-a-table").is_err());
    }
}

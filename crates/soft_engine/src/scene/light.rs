//! Light entities and the per-frame light snapshots consumed by the
//! lighting math

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Mat4, Vec3, Vec4};

/// Distance falloff policy for point lights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttenuationFactor {
    /// Constant attenuation, independent of distance
    #[default]
    None,
    /// Attenuation grows linearly with distance
    Linear,
    /// Attenuation grows with the square of distance
    Squared,
}

/// A directional light infinitely far away (sunlight)
#[derive(Debug, Clone)]
pub struct DistantLight {
    /// Light color, RGB 0-1
    pub color: Vec3,
    /// Brightness multiplier, 0-1
    pub intensity: f32,
    /// Unit direction the light shines along
    pub direction: Vec3,
    world_direction: Vec3,
}

impl DistantLight {
    /// Create a distant light shining along `direction`
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        let direction = utils::safe_normalize(direction);
        Self {
            color,
            intensity,
            direction,
            world_direction: -direction,
        }
    }

    /// Direction from surfaces toward the light, as of the most recent
    /// traversal
    pub fn world_direction(&self) -> Vec3 {
        self.world_direction
    }

    /// Rotate the negated shine direction into world space; translation does
    /// not apply to directions.
    pub(crate) fn update_world_direction(&mut self, world: &Mat4) {
        self.world_direction = utils::safe_normalize(world.transform_vector(&-self.direction));
    }

    pub(crate) fn snapshot(&self) -> Light {
        Light::Distant {
            color: self.color,
            intensity: self.intensity,
            world_direction: self.world_direction,
        }
    }
}

/// A positional light with distance falloff
#[derive(Debug, Clone)]
pub struct PointLight {
    /// Light color, RGB 0-1
    pub color: Vec3,
    /// Brightness multiplier, 0-1
    pub intensity: f32,
    /// Local-space position
    pub position: Vec3,
    /// Falloff coefficient
    pub attenuation: f32,
    /// Falloff policy
    pub attenuation_factor: AttenuationFactor,
    world_position: Vec3,
}

impl PointLight {
    /// Create a point light at a local-space position
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            position,
            attenuation: 1.0,
            attenuation_factor: AttenuationFactor::None,
            world_position: position,
        }
    }

    /// Builder: set the falloff coefficient and policy
    pub fn with_attenuation(mut self, attenuation: f32, factor: AttenuationFactor) -> Self {
        self.attenuation = attenuation;
        self.attenuation_factor = factor;
        self
    }

    /// World-space position as of the most recent traversal
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    pub(crate) fn update_world_position(&mut self, world: &Mat4) {
        let p = world * Vec4::new(self.position.x, self.position.y, self.position.z, 1.0);
        self.world_position = Vec3::new(p.x, p.y, p.z);
    }

    pub(crate) fn snapshot(&self) -> Light {
        Light::Point {
            color: self.color,
            intensity: self.intensity,
            world_position: self.world_position,
            attenuation: self.attenuation,
            factor: self.attenuation_factor,
        }
    }
}

/// Flat per-frame light data collected by the traversal
#[derive(Debug, Clone, Copy)]
pub enum Light {
    /// Directional contribution
    Distant {
        /// Light color, RGB 0-1
        color: Vec3,
        /// Brightness multiplier
        intensity: f32,
        /// Unit vector from surfaces toward the light, world space
        world_direction: Vec3,
    },
    /// Positional contribution with falloff
    Point {
        /// Light color, RGB 0-1
        color: Vec3,
        /// Brightness multiplier
        intensity: f32,
        /// World-space position
        world_position: Vec3,
        /// Falloff coefficient
        attenuation: f32,
        /// Falloff policy
        factor: AttenuationFactor,
    },
}

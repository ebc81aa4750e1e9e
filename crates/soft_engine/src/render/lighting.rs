//! Per-primitive lighting math
//!
//! Accumulates Lambertian and Blinn-style specular contributions over the
//! frame's lights. Results are raw RGB accumulators; the caller combines
//! them with the surface color and clamps to the displayable range.

use crate::foundation::math::{constants, utils, Vec3};
use crate::scene::light::{AttenuationFactor, Light};

fn attenuation_for(coefficient: f32, factor: AttenuationFactor, distance: f32) -> f32 {
    let attenuation = match factor {
        AttenuationFactor::None => coefficient,
        AttenuationFactor::Linear => coefficient * distance,
        AttenuationFactor::Squared => coefficient * distance * distance,
    };
    attenuation.max(constants::EPSILON)
}

/// Accumulate brightness for a lit surface point with a normal.
///
/// `position` and `normal` are world space. Back-facing lights (surface dot
/// at or below zero) contribute nothing. Distant lights contribute
/// `dot * intensity * diffuse`; point lights divide by their attenuation and,
/// when `specular` is nonzero, add a Blinn half-vector highlight. The viewer
/// direction for the half-vector is taken toward the world origin.
pub fn calc_normal_brightness(
    position: Vec3,
    normal: Vec3,
    lights: &[Light],
    diffuse: f32,
    specular: f32,
) -> Vec3 {
    let mut rgb = Vec3::zeros();
    for light in lights {
        match *light {
            Light::Distant {
                color,
                intensity,
                world_direction,
            } => {
                let dot = normal.dot(&world_direction);
                if dot > 0.0 {
                    rgb += color * (dot * intensity * diffuse);
                }
            }
            Light::Point {
                color,
                intensity,
                world_position,
                attenuation,
                factor,
            } => {
                let offset = world_position - position;
                let distance = offset.norm();
                let to_light = utils::safe_normalize(offset);
                let dot = normal.dot(&to_light);
                if dot <= 0.0 {
                    continue;
                }
                let attenuation = attenuation_for(attenuation, factor, distance);
                rgb += color * (diffuse * dot * intensity / attenuation);

                if specular > 0.0 {
                    let to_camera = utils::safe_normalize(-position);
                    let half = utils::safe_normalize(to_light + to_camera);
                    let highlight =
                        normal.dot(&half).max(0.0).powf(specular) * intensity / attenuation;
                    rgb += color * highlight;
                }
            }
        }
    }
    rgb
}

/// Accumulate brightness for primitives without a usable normal (points and
/// wireframe edges).
pub fn calc_position_brightness(position: Vec3, lights: &[Light]) -> Vec3 {
    let mut rgb = Vec3::zeros();
    for light in lights {
        match *light {
            Light::Distant {
                color, intensity, ..
            } => {
                rgb += color * intensity;
            }
            Light::Point {
                color,
                intensity,
                world_position,
                attenuation,
                factor,
            } => {
                let distance = (world_position - position).norm();
                let attenuation = attenuation_for(attenuation, factor, distance);
                // doubled attenuation visually matches polygon brightness
                rgb += color * (intensity / (attenuation * 2.0));
            }
        }
    }
    rgb
}

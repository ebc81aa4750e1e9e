//! Math utilities and types
//!
//! Provides the fundamental vector/matrix types for the 3D pipeline.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D homogeneous vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Math constants
pub mod constants {
    /// Guard value for divisions that must not blow up on degenerate input
    pub const EPSILON: f32 = 1e-6;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Normalize a vector, returning the input unchanged when its length is
    /// too small to divide by.
    pub fn safe_normalize(v: Vec3) -> Vec3 {
        v.try_normalize(constants::EPSILON).unwrap_or(v)
    }

    /// Divisor guard: substitutes a signed epsilon for values too close to
    /// zero.
    pub fn nonzero(value: f32) -> f32 {
        if value.abs() < constants::EPSILON {
            constants::EPSILON.copysign(value)
        } else {
            value
        }
    }
}

/// Extension trait for `Mat4` with the view/projection constructors the
/// pipeline needs
pub trait Mat4Ext {
    /// Create a rotation matrix around the X axis
    fn rotation_x(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Create a rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Create a rotation matrix from Euler angles, applied intrinsically as
    /// roll, then pitch, then yaw
    fn from_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Mat4;

    /// Create a right-handed perspective projection; `near` and `far` are
    /// positive distances from the viewer
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_x(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::x_axis(), angle)
    }

    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn from_yaw_pitch_roll(yaw: f32, pitch: f32, roll: f32) -> Mat4 {
        nalgebra::Rotation3::from_euler_angles(roll, pitch, yaw).to_homogeneous()
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(center), &up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_roundtrip() {
        let m = Mat4::rotation_y(0.7)
            * Mat4::new_translation(&Vec3::new(1.0, -2.0, 3.0))
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 1.0, 0.5));
        let inv = m.try_inverse().expect("matrix is invertible");
        assert_relative_eq!(m * inv, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_singular_inverse_returns_none() {
        let m = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 0.0, 1.0));
        assert!(m.try_inverse().is_none());
    }

    #[test]
    fn test_safe_normalize_unit_length() {
        let v = utils::safe_normalize(Vec3::new(3.0, -4.0, 12.0));
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_safe_normalize_zero_unchanged() {
        let v = utils::safe_normalize(Vec3::zeros());
        assert_eq!(v, Vec3::zeros());
    }

    #[test]
    fn test_nonzero_substitutes_epsilon() {
        assert!(utils::nonzero(0.0) > 0.0);
        assert!(utils::nonzero(-0.0_f32) != 0.0);
        assert_eq!(utils::nonzero(2.5), 2.5);
    }

    #[test]
    fn test_yaw_pitch_roll_applies_roll_first() {
        let (yaw, pitch, roll) = (0.3, -0.8, 1.1);
        let composed = Mat4::rotation_z(yaw) * Mat4::rotation_y(pitch) * Mat4::rotation_x(roll);
        assert_relative_eq!(
            Mat4::from_yaw_pitch_roll(yaw, pitch, roll),
            composed,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let eye = Vec3::new(0.0, 0.0, -10.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
        let transformed = view * Vec4::new(eye.x, eye.y, eye.z, 1.0);
        assert_relative_eq!(transformed.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(transformed.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(transformed.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_perspective_maps_near_plane_to_negative_one() {
        let proj = Mat4::perspective(utils::deg_to_rad(35.0), 1.0, 1.0, 100.0);
        // a point on the near plane straight ahead (view space -Z forward)
        let clip = proj * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(clip.z / clip.w, -1.0, epsilon = 1e-4);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }
}

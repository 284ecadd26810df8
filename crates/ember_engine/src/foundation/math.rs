//! Math utilities and types
//!
//! Fundamental math types for 3D rendering, built on nalgebra. Matrix
//! conventions are right-handed with the Vulkan flip (Y-down NDC, depth
//! range 0..1) baked into the projection constructors.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// Smallest denominator treated as non-zero in projective math
    pub const PROJECTIVE_EPSILON: f32 = 1e-6;
}

/// Math utility functions
pub mod utils {
    use super::*;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Normalize a vector, returning the zero vector for (near-)zero input
    /// instead of dividing by zero.
    pub fn normalize_or_zero(v: Vec3) -> Vec3 {
        let mag = v.magnitude();
        if mag < constants::PROJECTIVE_EPSILON {
            Vec3::zeros()
        } else {
            v / mag
        }
    }
}

/// Extension trait for Mat4 with rendering-oriented constructors
pub trait Mat4Ext {
    /// Rotation matrix around the X axis (radians)
    fn rotation_x(angle: f32) -> Mat4;

    /// Rotation matrix around the Y axis (radians)
    fn rotation_y(angle: f32) -> Mat4;

    /// Rotation matrix around the Z axis (radians)
    fn rotation_z(angle: f32) -> Mat4;

    /// Perspective projection for Vulkan: right-handed view space with +Z
    /// forward, Y flipped for Vulkan's Y-down NDC, depth mapped to [0, 1].
    fn perspective_vk(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection for a 2D extent rectangle, same Vulkan
    /// conventions as [`Mat4Ext::perspective_vk`].
    fn orthographic_vk(min: Vec2, max: Vec2, near: f32, far: f32) -> Mat4;
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

    fn perspective_vk(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5)
            .tan()
            .max(constants::PROJECTIVE_EPSILON);
        let aspect = aspect.max(constants::PROJECTIVE_EPSILON);
        let depth = (far - near).max(constants::PROJECTIVE_EPSILON);

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        // Y flipped here so view space stays Y-up while NDC is Vulkan Y-down
        result[(1, 1)] = -1.0 / tan_half_fovy;
        result[(2, 2)] = far / depth;
        result[(2, 3)] = -(near * far) / depth;
        // w = +z_view: the camera looks down +Z in view space
        result[(3, 2)] = 1.0;
        result
    }

    fn orthographic_vk(min: Vec2, max: Vec2, near: f32, far: f32) -> Mat4 {
        let width = (max.x - min.x).max(constants::PROJECTIVE_EPSILON);
        let height = (max.y - min.y).max(constants::PROJECTIVE_EPSILON);
        let depth = (far - near).max(constants::PROJECTIVE_EPSILON);

        let mut result = Mat4::identity();
        result[(0, 0)] = 2.0 / width;
        result[(0, 3)] = -(max.x + min.x) / width;
        result[(1, 1)] = -2.0 / height;
        result[(1, 3)] = (max.y + min.y) / height;
        result[(2, 2)] = 1.0 / depth;
        result[(2, 3)] = -near / depth;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_or_zero_unit_length() {
        let v = utils::normalize_or_zero(Vec3::new(3.0, -4.0, 12.0));
        assert_relative_eq!(v.magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_or_zero_zero_vector() {
        let v = utils::normalize_or_zero(Vec3::zeros());
        assert_eq!(v, Vec3::zeros());
    }

    #[test]
    fn perspective_depth_range_endpoints() {
        let proj = Mat4::perspective_vk(utils::deg_to_rad(70.0), 16.0 / 9.0, 0.1, 200.0);

        let at_near = proj * Vec4::new(0.0, 0.0, 0.1, 1.0);
        let at_far = proj * Vec4::new(0.0, 0.0, 200.0, 1.0);

        assert_relative_eq!(at_near.z / at_near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(at_far.z / at_far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn orthographic_maps_rect_corners_to_ndc() {
        let proj = Mat4::orthographic_vk(Vec2::new(-2.0, -1.0), Vec2::new(2.0, 1.0), 0.0, 10.0);

        let corner = proj * Vec4::new(2.0, 1.0, 0.0, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-6);
        // Vulkan Y-down: the top of the rect lands at -1
        assert_relative_eq!(corner.y, -1.0, epsilon = 1e-6);
    }
}

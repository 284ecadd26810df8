//! Camera projections
//!
//! Perspective and orthographic cameras with eagerly recomputed projection
//! matrices: every setter recalculates immediately, there is no dirty flag.
//! Exactly one entity is designated "main" through [`MainCameraSlot`];
//! drawing without one is a configuration error, never a silent default.

use crate::ecs::Entity;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec2};

/// Perspective camera parameters plus the derived projection matrix
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    fov_y_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    /// Create a perspective camera; the projection is computed immediately
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_y_degrees,
            aspect,
            near,
            far,
            projection: Mat4::identity(),
        };
        camera.recalculate_projection();
        camera
    }

    /// Vertical field of view in degrees
    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y_degrees
    }

    /// Aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near and far clip plane offsets
    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Update the vertical field of view (degrees)
    pub fn set_fov_y(&mut self, fov_y_degrees: f32) {
        self.fov_y_degrees = fov_y_degrees;
        self.recalculate_projection();
    }

    /// Update the aspect ratio; call on every viewport resize
    pub fn set_aspect(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("camera aspect ratio {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
        self.recalculate_projection();
    }

    /// Update near/far clip plane offsets
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.recalculate_projection();
    }

    /// Rebuild the projection matrix from the current parameters
    pub fn recalculate_projection(&mut self) {
        self.projection = Mat4::perspective_vk(
            utils::deg_to_rad(self.fov_y_degrees),
            self.aspect,
            self.near,
            self.far,
        );
    }

    /// The derived projection matrix
    pub fn projection(&self) -> Mat4 {
        self.projection
    }
}

/// Orthographic camera: a visible rectangle plus near/far offsets
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    min: Vec2,
    max: Vec2,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl OrthographicCamera {
    /// Create an orthographic camera; the projection is computed immediately
    pub fn new(min: Vec2, max: Vec2, near: f32, far: f32) -> Self {
        let mut camera = Self {
            min,
            max,
            near,
            far,
            projection: Mat4::identity(),
        };
        camera.recalculate_projection();
        camera
    }

    /// The visible rectangle (min, max)
    pub fn extent(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    /// Update the visible rectangle
    pub fn set_extent(&mut self, min: Vec2, max: Vec2) {
        self.min = min;
        self.max = max;
        self.recalculate_projection();
    }

    /// Update near/far clip plane offsets
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.recalculate_projection();
    }

    /// Rebuild the projection matrix from the current parameters
    pub fn recalculate_projection(&mut self) {
        self.projection = Mat4::orthographic_vk(self.min, self.max, self.near, self.far);
    }

    /// The derived projection matrix
    pub fn projection(&self) -> Mat4 {
        self.projection
    }
}

/// Camera component variant attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub enum CameraProjection {
    /// Perspective lens
    Perspective(PerspectiveCamera),
    /// Orthographic lens
    Orthographic(OrthographicCamera),
}

impl CameraProjection {
    /// Projection matrix of whichever variant is present
    pub fn projection_matrix(&self) -> Mat4 {
        match self {
            Self::Perspective(camera) => camera.projection(),
            Self::Orthographic(camera) => camera.projection(),
        }
    }
}

/// Full render matrix: projection × view × world
pub fn render_matrix(projection: Mat4, view: Mat4, world: Mat4) -> Mat4 {
    projection * view * world
}

/// Single-slot registry for the main camera entity.
///
/// Holds a weak reference only; the entity may die without notice and the
/// draw path re-validates it every frame.
#[derive(Debug, Default)]
pub struct MainCameraSlot {
    entity: Option<Entity>,
}

impl MainCameraSlot {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Designate an entity as the main camera, replacing any previous one
    pub fn set(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    /// Clear the designation
    pub fn clear(&mut self) {
        self.entity = None;
    }

    /// Currently designated entity, if any
    pub fn get(&self) -> Option<Entity> {
        self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    #[test]
    fn setters_recompute_projection_eagerly() {
        let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 100.0);
        let before = camera.projection();
        camera.set_fov_y(90.0);
        assert_ne!(before, camera.projection());

        let before = camera.projection();
        camera.set_aspect(4.0 / 3.0);
        assert_ne!(before, camera.projection());
    }

    #[test]
    fn perspective_depth_is_monotonic_with_distance() {
        // Camera at (0,0,-2) with identity rotation: view space z is
        // world z + 2. Entities at z=1 and z=5 must both project inside
        // (0,1) with the farther one at greater-or-equal depth.
        let camera = PerspectiveCamera::new(70.0, 16.0 / 9.0, 0.1, 200.0);
        let view = Mat4::new_translation(&crate::foundation::math::Vec3::new(0.0, 0.0, 2.0));

        let depth_of = |z: f32| {
            let clip = camera.projection() * view * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };

        let near_depth = depth_of(1.0);
        let far_depth = depth_of(5.0);
        assert!(near_depth > 0.0 && near_depth < 1.0);
        assert!(far_depth > 0.0 && far_depth < 1.0);
        assert!(far_depth >= near_depth);
    }

    #[test]
    fn origin_depth_lies_between_plane_mappings() {
        let camera = PerspectiveCamera::new(70.0, 16.0 / 9.0, 0.1, 200.0);
        let view = Mat4::new_translation(&crate::foundation::math::Vec3::new(0.0, 0.0, 2.0));
        let clip = render_matrix(camera.projection(), view, Mat4::identity())
            * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }

    #[test]
    fn orthographic_extent_setter_recomputes() {
        let mut camera = OrthographicCamera::new(
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, 1.0),
            0.0,
            10.0,
        );
        let before = camera.projection();
        camera.set_extent(Vec2::new(-2.0, -2.0), Vec2::new(2.0, 2.0));
        assert_ne!(before, camera.projection());

        let mid = camera.projection() * Vec4::new(0.0, 0.0, 5.0, 1.0);
        assert_relative_eq!(mid.z, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn main_camera_slot_holds_single_designation() {
        let mut world = crate::ecs::World::new();
        let (a, b) = (world.spawn(), world.spawn());

        let mut slot = MainCameraSlot::new();
        assert!(slot.get().is_none());
        slot.set(a);
        slot.set(b);
        assert_eq!(slot.get(), Some(b));
        slot.clear();
        assert!(slot.get().is_none());
    }
}

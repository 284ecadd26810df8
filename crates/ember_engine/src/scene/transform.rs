//! Transform hierarchy
//!
//! Parent-relative position/rotation/scale nodes stored in an arena and
//! addressed by stable keys. World matrices compose up the parent chain;
//! the walk carries a depth guard so a malformed (cyclic) hierarchy is
//! reported instead of recursing forever.
//!
//! Composition order is fixed: scale innermost, then rotation applied X,
//! then Y, then Z (angles in degrees), then translation. View matrices
//! deliberately exclude scale — cameras are never "scaled".

use crate::core::error::{EngineError, EngineResult};
use crate::ecs::Entity;
use crate::foundation::math::{constants, utils, Mat4, Mat4Ext, Vec2, Vec3, Vec4};
use crate::scene::camera::PerspectiveCamera;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`TransformHierarchy`]
    pub struct TransformKey;
}

/// Deepest parent chain accepted before a cycle is assumed
pub const MAX_PARENT_DEPTH: u32 = 64;

/// A single node: local TRS plus non-owning relational links
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    /// Local position relative to the parent
    pub position: Vec3,
    /// Local rotation as Euler angles in degrees, applied X, Y, Z
    pub rotation: Vec3,
    /// Local scale factors
    pub scale: Vec3,
    /// Weak back-reference to the owning entity; lookup-only, never ownership
    pub entity: Option<Entity>,
    /// Weak reference to the parent node; `None` marks a root
    pub parent: Option<TransformKey>,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            entity: None,
            parent: None,
        }
    }
}

impl TransformNode {
    /// Identity transform with no links
    pub fn identity() -> Self {
        Self::default()
    }

    /// Node at a position with identity rotation and scale
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder: set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: set rotation (Euler degrees)
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set non-uniform scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder: set the owning-entity back-reference
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Builder: set the parent link
    pub fn with_parent(mut self, parent: TransformKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Local matrix: translation × Rx × Ry × Rz × scale
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.local_rotation_matrix()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Local matrix without the scale term, used for view computation
    pub fn local_matrix_rigid(&self) -> Mat4 {
        Mat4::new_translation(&self.position) * self.local_rotation_matrix()
    }

    fn local_rotation_matrix(&self) -> Mat4 {
        Mat4::rotation_x(utils::deg_to_rad(self.rotation.x))
            * Mat4::rotation_y(utils::deg_to_rad(self.rotation.y))
            * Mat4::rotation_z(utils::deg_to_rad(self.rotation.z))
    }
}

/// Arena of transform nodes
pub struct TransformHierarchy {
    nodes: SlotMap<TransformKey, TransformNode>,
}

impl Default for TransformHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformHierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Insert a node, returning its key
    pub fn insert(&mut self, node: TransformNode) -> TransformKey {
        self.nodes.insert(node)
    }

    /// Remove a node. Children keep their now-dangling parent link and are
    /// composed as roots from then on.
    pub fn remove(&mut self, key: TransformKey) -> Option<TransformNode> {
        self.nodes.remove(key)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes are stored
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immutable access to a node
    pub fn get(&self, key: TransformKey) -> Option<&TransformNode> {
        self.nodes.get(key)
    }

    /// Mutable access to a node
    pub fn get_mut(&mut self, key: TransformKey) -> Option<&mut TransformNode> {
        self.nodes.get_mut(key)
    }

    /// Throwing parent lookup: reports "no parent" when the node has no
    /// owning-entity back-reference, no parent link, or the parent no
    /// longer exists.
    pub fn parent(&self, key: TransformKey) -> EngineResult<TransformKey> {
        let node = self
            .nodes
            .get(key)
            .ok_or_else(|| EngineError::not_found("transform", "node does not exist"))?;
        if node.entity.is_none() {
            return Err(EngineError::not_found(
                "transform",
                "no owning entity set on node",
            ));
        }
        match node.parent {
            Some(parent) if self.nodes.contains_key(parent) => Ok(parent),
            Some(_) => Err(EngineError::not_found("transform", "parent no longer exists")),
            None => Err(EngineError::not_found("transform", "no parent set")),
        }
    }

    /// Non-throwing parent lookup for hot paths. A node whose parent would
    /// fail the throwing lookup is treated as a root.
    pub fn try_parent(&self, key: TransformKey) -> Option<TransformKey> {
        let node = self.nodes.get(key)?;
        node.entity?;
        let parent = node.parent?;
        self.nodes.contains_key(parent).then_some(parent)
    }

    /// World matrix: the parent's world matrix times the local matrix.
    /// Roots return their local matrix alone.
    pub fn world_matrix(&self, key: TransformKey) -> EngineResult<Mat4> {
        self.compose(key, TransformNode::local_matrix)
    }

    /// World matrix with scale excluded at every level of the chain
    pub fn world_matrix_rigid(&self, key: TransformKey) -> EngineResult<Mat4> {
        self.compose(key, TransformNode::local_matrix_rigid)
    }

    fn compose(
        &self,
        key: TransformKey,
        local: impl Fn(&TransformNode) -> Mat4,
    ) -> EngineResult<Mat4> {
        let mut matrix = match self.nodes.get(key) {
            Some(node) => local(node),
            None => return Err(EngineError::not_found("transform", "node does not exist")),
        };

        let mut current = key;
        let mut depth = 0u32;
        while let Some(parent) = self.try_parent(current) {
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                return Err(EngineError::type_mismatch(
                    "transform",
                    format!("parent chain exceeds depth {MAX_PARENT_DEPTH}, cycle suspected"),
                ));
            }
            let node = &self.nodes[parent];
            matrix = local(node) * matrix;
            current = parent;
        }
        Ok(matrix)
    }

    /// View matrix for a node acting as camera: the inverse of its
    /// scale-excluded world matrix.
    pub fn view_matrix(&self, key: TransformKey) -> EngineResult<Mat4> {
        self.world_matrix_rigid(key)?
            .try_inverse()
            .ok_or_else(|| EngineError::type_mismatch("transform", "camera matrix not invertible"))
    }

    /// World-space position of the node's origin
    pub fn abs_position(&self, key: TransformKey) -> EngineResult<Vec3> {
        let world = self.world_matrix(key)?;
        Ok(Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]))
    }

    /// Project a node's origin to pixel coordinates through a perspective
    /// camera. Returns `Ok(None)` when the point sits on the camera plane
    /// (clip-space w of zero) and cannot be projected.
    pub fn screen_position(
        &self,
        key: TransformKey,
        camera_key: TransformKey,
        camera: &PerspectiveCamera,
        viewport: (u32, u32),
    ) -> EngineResult<Option<Vec2>> {
        let world = self.world_matrix(key)?;
        let view = self.view_matrix(camera_key)?;
        let clip = camera.projection() * view * world * Vec4::new(0.0, 0.0, 0.0, 1.0);

        if clip.w.abs() < constants::PROJECTIVE_EPSILON {
            return Ok(None);
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let (width, height) = viewport;
        Ok(Some(Vec2::new(
            (ndc_x + 1.0) * 0.5 * width as f32,
            (ndc_y + 1.0) * 0.5 * height as f32,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use approx::assert_relative_eq;

    fn hierarchy_with_entities() -> (TransformHierarchy, World) {
        (TransformHierarchy::new(), World::new())
    }

    fn assert_mat_eq(a: &Mat4, b: &Mat4) {
        for r in 0..4 {
            for c in 0..4 {
                assert_relative_eq!(a[(r, c)], b[(r, c)], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn root_world_matrix_equals_local() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let e = world.spawn();
        let node = TransformNode::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(30.0, 0.0, 45.0))
            .with_entity(e);
        let local = node.local_matrix();
        let key = transforms.insert(node);

        assert_mat_eq(&transforms.world_matrix(key).unwrap(), &local);
    }

    #[test]
    fn three_level_chain_composes_parent_times_local() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let (ea, eb, ec) = (world.spawn(), world.spawn(), world.spawn());

        let root = transforms.insert(
            TransformNode::from_position(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Vec3::new(0.0, 90.0, 0.0))
                .with_scale(Vec3::new(2.0, 2.0, 2.0))
                .with_entity(ea),
        );
        let mid = transforms.insert(
            TransformNode::from_position(Vec3::new(0.0, 3.0, 0.0))
                .with_rotation(Vec3::new(45.0, 0.0, 0.0))
                .with_entity(eb)
                .with_parent(root),
        );
        let leaf = transforms.insert(
            TransformNode::from_position(Vec3::new(0.0, 0.0, 1.0))
                .with_scale(Vec3::new(0.5, 1.0, 1.5))
                .with_entity(ec)
                .with_parent(mid),
        );

        let expected = transforms.world_matrix(mid).unwrap()
            * transforms.get(leaf).unwrap().local_matrix();
        assert_mat_eq(&transforms.world_matrix(leaf).unwrap(), &expected);

        let expected_mid = transforms.world_matrix(root).unwrap()
            * transforms.get(mid).unwrap().local_matrix();
        assert_mat_eq(&transforms.world_matrix(mid).unwrap(), &expected_mid);
    }

    #[test]
    fn node_without_entity_backref_composes_as_root() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let e = world.spawn();
        let parent = transforms.insert(
            TransformNode::from_position(Vec3::new(10.0, 0.0, 0.0)).with_entity(e),
        );
        // No entity back-reference: the parent link must be ignored
        let orphan = transforms.insert(
            TransformNode::from_position(Vec3::new(1.0, 0.0, 0.0)).with_parent(parent),
        );

        assert!(transforms.parent(orphan).is_err());
        let pos = transforms.abs_position(orphan).unwrap();
        assert_relative_eq!(pos.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn parent_cycle_reports_error_instead_of_looping() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let (ea, eb) = (world.spawn(), world.spawn());
        let a = transforms.insert(TransformNode::identity().with_entity(ea));
        let b = transforms.insert(TransformNode::identity().with_entity(eb).with_parent(a));
        transforms.get_mut(a).unwrap().parent = Some(b);

        let err = transforms.world_matrix(a).unwrap_err();
        assert!(err.reason.contains("cycle"));
    }

    #[test]
    fn view_matrix_excludes_scale() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let e = world.spawn();
        let key = transforms.insert(
            TransformNode::from_position(Vec3::new(0.0, 0.0, -2.0))
                .with_scale(Vec3::new(5.0, 5.0, 5.0))
                .with_entity(e),
        );

        let view = transforms.view_matrix(key).unwrap();
        // Inverse of a pure translation: scale must not appear
        assert_relative_eq!(view[(0, 0)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(view[(2, 3)], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn abs_position_extracts_translation_through_chain() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let (ea, eb) = (world.spawn(), world.spawn());
        let parent = transforms.insert(
            TransformNode::from_position(Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Vec3::new(0.0, 90.0, 0.0))
                .with_entity(ea),
        );
        let child = transforms.insert(
            TransformNode::from_position(Vec3::new(0.0, 0.0, 1.0))
                .with_entity(eb)
                .with_parent(parent),
        );

        // (0,0,1) rotated 90 degrees around Y lands on (1,0,0), then offset
        let pos = transforms.abs_position(child).unwrap();
        assert_relative_eq!(pos.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(pos.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn screen_position_centers_point_ahead_of_camera() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let (cam_e, obj_e) = (world.spawn(), world.spawn());
        let cam = transforms.insert(
            TransformNode::from_position(Vec3::new(0.0, 0.0, -2.0)).with_entity(cam_e),
        );
        let obj = transforms.insert(TransformNode::identity().with_entity(obj_e));
        let camera = PerspectiveCamera::new(70.0, 16.0 / 9.0, 0.1, 200.0);

        let px = transforms
            .screen_position(obj, cam, &camera, (1920, 1080))
            .unwrap()
            .unwrap();
        assert_relative_eq!(px.x, 960.0, epsilon = 1e-2);
        assert_relative_eq!(px.y, 540.0, epsilon = 1e-2);
    }

    #[test]
    fn screen_position_on_camera_plane_is_off_screen() {
        let (mut transforms, mut world) = hierarchy_with_entities();
        let (cam_e, obj_e) = (world.spawn(), world.spawn());
        let cam = transforms.insert(TransformNode::identity().with_entity(cam_e));
        // Same position as the camera: clip-space w is zero
        let obj = transforms.insert(TransformNode::identity().with_entity(obj_e));
        let camera = PerspectiveCamera::new(70.0, 16.0 / 9.0, 0.1, 200.0);

        let result = transforms
            .screen_position(obj, cam, &camera, (1920, 1080))
            .unwrap();
        assert!(result.is_none());
    }
}

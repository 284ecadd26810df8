//! Entity registry
//!
//! A deliberately small world: entities are slotmap keys, and each entity
//! carries the handful of components the engine core needs (transform link,
//! camera variant, renderable, motion). Lookups come in two forms — a
//! throwing accessor for call sites that consider absence a bug, and a
//! `try_` variant for call sites probing expected absence.

use crate::core::error::{EngineError, EngineResult};
use crate::foundation::math::Vec3;
use crate::render::device::{MaterialHandle, MeshHandle};
use crate::scene::camera::CameraProjection;
use crate::scene::transform::{TransformHierarchy, TransformKey, TransformNode};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable entity identifier
    pub struct Entity;
}

/// Drawable component: mesh plus material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    /// Mesh resource uploaded to the device
    pub mesh: MeshHandle,
    /// Material resource registered with the device
    pub material: MaterialHandle,
}

/// Simple linear/angular motion, integrated every Update stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// World-units per second
    pub linear_velocity: Vec3,
    /// Degrees per second around each local axis
    pub angular_velocity: Vec3,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
        }
    }
}

#[derive(Default)]
struct EntityRecord {
    transform: Option<TransformKey>,
    camera: Option<CameraProjection>,
    renderable: Option<Renderable>,
    motion: Option<Motion>,
}

/// The entity registry
#[derive(Default)]
pub struct World {
    entities: SlotMap<Entity, EntityRecord>,
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty entity
    pub fn spawn(&mut self) -> Entity {
        self.entities.insert(EntityRecord::default())
    }

    /// Destroy an entity and its transform node. Parent links of other
    /// nodes that pointed at the removed transform dangle and those nodes
    /// become roots.
    pub fn despawn(&mut self, entity: Entity, transforms: &mut TransformHierarchy) {
        if let Some(record) = self.entities.remove(entity) {
            if let Some(key) = record.transform {
                transforms.remove(key);
            }
        }
    }

    /// True while the entity is alive
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entities exist
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn record(&self, entity: Entity, component: &'static str) -> EngineResult<&EntityRecord> {
        self.entities.get(entity).ok_or_else(|| {
            EngineError::not_found("world", format!("entity not found for {component} lookup"))
        })
    }

    /// Create a transform node owned by the entity, wiring the back
    /// reference, and attach it.
    pub fn attach_transform(
        &mut self,
        entity: Entity,
        node: TransformNode,
        transforms: &mut TransformHierarchy,
    ) -> EngineResult<TransformKey> {
        let record = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| EngineError::not_found("world", "entity not found"))?;
        let key = transforms.insert(node.with_entity(entity));
        if let Some(previous) = record.transform.replace(key) {
            transforms.remove(previous);
        }
        Ok(key)
    }

    /// Transform key of the entity; absence is an error
    pub fn transform_key(&self, entity: Entity) -> EngineResult<TransformKey> {
        self.record(entity, "transform")?
            .transform
            .ok_or_else(|| EngineError::not_found("world", "entity has no transform component"))
    }

    /// Transform key of the entity; absence is expected
    pub fn try_transform_key(&self, entity: Entity) -> Option<TransformKey> {
        self.entities.get(entity)?.transform
    }

    /// Attach or replace the camera component
    pub fn set_camera(&mut self, entity: Entity, camera: CameraProjection) -> EngineResult<()> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| EngineError::not_found("world", "entity not found"))?
            .camera = Some(camera);
        Ok(())
    }

    /// Camera component of the entity; absence is an error
    pub fn camera(&self, entity: Entity) -> EngineResult<&CameraProjection> {
        self.record(entity, "camera")?
            .camera
            .as_ref()
            .ok_or_else(|| EngineError::not_found("world", "entity has no camera component"))
    }

    /// Camera component of the entity; absence is expected
    pub fn try_camera(&self, entity: Entity) -> Option<&CameraProjection> {
        self.entities.get(entity)?.camera.as_ref()
    }

    /// Mutable camera component of the entity; absence is expected
    pub fn try_camera_mut(&mut self, entity: Entity) -> Option<&mut CameraProjection> {
        self.entities.get_mut(entity)?.camera.as_mut()
    }

    /// Attach or replace the renderable component
    pub fn set_renderable(&mut self, entity: Entity, renderable: Renderable) -> EngineResult<()> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| EngineError::not_found("world", "entity not found"))?
            .renderable = Some(renderable);
        Ok(())
    }

    /// Renderable component of the entity; absence is an error
    pub fn renderable(&self, entity: Entity) -> EngineResult<Renderable> {
        self.record(entity, "renderable")?
            .renderable
            .ok_or_else(|| EngineError::not_found("world", "entity has no renderable component"))
    }

    /// Renderable component of the entity; absence is expected
    pub fn try_renderable(&self, entity: Entity) -> Option<Renderable> {
        self.entities.get(entity)?.renderable
    }

    /// Attach or replace the motion component
    pub fn set_motion(&mut self, entity: Entity, motion: Motion) -> EngineResult<()> {
        self.entities
            .get_mut(entity)
            .ok_or_else(|| EngineError::not_found("world", "entity not found"))?
            .motion = Some(motion);
        Ok(())
    }

    /// Entities that carry both a renderable and a transform, in storage
    /// order. Iteration order across despawns is implementation-defined.
    pub fn drawable_entities(&self) -> Vec<(Entity, Renderable, TransformKey)> {
        self.entities
            .iter()
            .filter_map(|(entity, record)| {
                Some((entity, record.renderable?, record.transform?))
            })
            .collect()
    }

    /// Entities with motion and a transform: (transform key, motion)
    pub fn moving_entities(&self) -> Vec<(TransformKey, Motion)> {
        self.entities
            .values()
            .filter_map(|record| Some((record.transform?, record.motion?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::camera::PerspectiveCamera;

    #[test]
    fn throwing_lookup_reports_not_found() {
        let mut world = World::new();
        let entity = world.spawn();

        let err = world.camera(entity).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::NotFound);
        assert!(world.try_camera(entity).is_none());
    }

    #[test]
    fn camera_component_round_trip() {
        let mut world = World::new();
        let entity = world.spawn();
        world
            .set_camera(
                entity,
                CameraProjection::Perspective(PerspectiveCamera::new(70.0, 1.0, 0.1, 100.0)),
            )
            .unwrap();
        assert!(world.camera(entity).is_ok());
    }

    #[test]
    fn despawn_removes_transform_node() {
        let mut world = World::new();
        let mut transforms = TransformHierarchy::new();
        let entity = world.spawn();
        let key = world
            .attach_transform(entity, TransformNode::identity(), &mut transforms)
            .unwrap();
        assert!(transforms.get(key).is_some());

        world.despawn(entity, &mut transforms);
        assert!(transforms.get(key).is_none());
        assert!(!world.contains(entity));
    }

    #[test]
    fn lookup_on_dead_entity_is_an_error() {
        let mut world = World::new();
        let mut transforms = TransformHierarchy::new();
        let entity = world.spawn();
        world.despawn(entity, &mut transforms);

        assert!(world.transform_key(entity).is_err());
        assert!(world.try_transform_key(entity).is_none());
    }
}

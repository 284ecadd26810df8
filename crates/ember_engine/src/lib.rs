//! # Ember Engine
//!
//! A real-time rendering engine core: GPU-backed frame loop for an
//! entity/component world. The crate covers the four load-bearing
//! subsystems and leaves application glue (window wiring, asset import,
//! menus) to callers:
//!
//! - **Deletion queue**: LIFO teardown of GPU resources, so dependents are
//!   always destroyed before what they depend on.
//! - **Frame synchronization**: fence/semaphore handshake with the GPU,
//!   swapchain acquisition and presentation, rebuild on resize — one frame
//!   in flight.
//! - **Transform hierarchy and cameras**: parent-relative TRS nodes
//!   composed into world, view, and projection matrices.
//! - **Stage scheduler**: a fixed, dependency-ordered chain of named frame
//!   stages that all per-frame work registers against.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     ember_engine::foundation::logging::init();
//!     let mut engine = Engine::new(EngineConfig::default())?;
//!
//!     // Create a camera entity and designate it as main
//!     let ctx = engine.context_mut();
//!     let camera = ctx.world.spawn();
//!     ctx.world.attach_transform(
//!         camera,
//!         TransformNode::from_position(Vec3::new(0.0, 0.0, -2.0)),
//!         &mut ctx.transforms,
//!     )?;
//!     ctx.world.set_camera(
//!         camera,
//!         CameraProjection::Perspective(PerspectiveCamera::new(70.0, 16.0 / 9.0, 0.1, 200.0)),
//!     )?;
//!     ctx.main_camera.set(camera);
//!
//!     engine.run()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc
)]

pub mod core;
pub mod ecs;
pub mod foundation;
pub mod platform;
pub mod render;
pub mod scene;
pub mod schedule;

mod engine;

pub use engine::Engine;

/// Common imports for engine users
pub mod prelude {
    pub use crate::core::{EngineConfig, EngineContext, EngineError, EngineResult, ErrorKind};
    pub use crate::ecs::{Entity, Motion, Renderable, World};
    pub use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec3, Vec4};
    pub use crate::platform::{InputState, KeyCode, MouseButton, PlatformEvent, WindowSurface};
    pub use crate::render::{
        DeletionQueue, DrawCall, FramePhase, FrameSynchronizer, GraphicsDevice, MaterialHandle,
        MeshHandle, MeshVertex, ReleaseKind, ResourceRelease,
    };
    pub use crate::scene::{
        CameraProjection, MainCameraSlot, OrthographicCamera, PerspectiveCamera,
        TransformHierarchy, TransformKey, TransformNode,
    };
    pub use crate::schedule::{FrameSystem, Stage, StageScheduler};
    pub use crate::Engine;
}

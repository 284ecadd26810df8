//! Engine context
//!
//! One explicit struct, passed by mutable reference into every frame
//! system, instead of singleton engine/input/world managers. Tests build
//! as many independent contexts as they like.

use crate::core::config::EngineConfig;
use crate::ecs::World;
use crate::platform::{InputState, WindowSurface};
use crate::render::device::GraphicsDevice;
use crate::render::frame::FrameSynchronizer;
use crate::scene::camera::MainCameraSlot;
use crate::scene::transform::TransformHierarchy;

/// GPU-facing portion of the context: device, frame synchronizer, window
pub struct GpuContext {
    /// Graphics device the renderer records against
    pub device: Box<dyn GraphicsDevice>,
    /// Per-frame CPU/GPU handshake state
    pub frame: FrameSynchronizer,
    /// Platform window and event source
    pub window: Box<dyn WindowSurface>,
}

/// Mutable state shared by all frame systems
pub struct EngineContext {
    /// Entity registry
    pub world: World,
    /// Transform hierarchy arena
    pub transforms: TransformHierarchy,
    /// Single-slot main camera registry
    pub main_camera: MainCameraSlot,
    /// Aggregated input state, cleared of transients every Housekeeping
    pub input: InputState,
    /// Current drawable extent in pixels
    pub viewport: (u32, u32),
    /// Set when a platform close request has been observed
    pub quit_requested: bool,
    /// GPU device, frame synchronizer, and window
    pub gpu: GpuContext,
    /// Engine configuration snapshot
    pub config: EngineConfig,
}

impl EngineContext {
    /// Build a context around an already-initialized GPU backend
    pub fn new(config: EngineConfig, gpu: GpuContext) -> Self {
        let viewport = gpu.window.drawable_extent();
        Self {
            world: World::new(),
            transforms: TransformHierarchy::new(),
            main_camera: MainCameraSlot::new(),
            input: InputState::new(),
            viewport,
            quit_requested: false,
            gpu,
            config,
        }
    }
}

//! Graphics device surface
//!
//! The Vulkan-style interface the frame synchronizer and draw path are
//! written against. Handles are typed opaque wrappers over native handles
//! (null sentinel 0); they are moved, never cloned into two owners.
//! Wait/acquire/present return outcome enums so callers own the policy
//! for timeouts and swapchain staleness.

use crate::core::error::EngineResult;
use crate::foundation::math::Mat4;

/// Handle to a fence object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceHandle(pub u64);

/// Handle to a semaphore object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreHandle(pub u64);

/// Handle to a mesh resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a material resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Result of a bounded fence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The fence was signaled within the timeout
    Signaled,
    /// The timeout elapsed first
    TimedOut,
}

/// Result of a swapchain image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is available at this index
    Acquired(u32),
    /// The swapchain no longer matches the surface; rebuild required
    OutOfDate,
    /// The timeout elapsed first
    TimedOut,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented normally
    Presented,
    /// The swapchain no longer matches the surface; rebuild required
    OutOfDate,
    /// Presented, but the swapchain is a poor match; rebuild advised
    Suboptimal,
}

/// Vertex format accepted by [`GraphicsDevice::upload_mesh`]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    /// Object-space position
    pub position: [f32; 3],
}

unsafe impl bytemuck::Pod for MeshVertex {}
unsafe impl bytemuck::Zeroable for MeshVertex {}

/// One recorded draw: which mesh, which material, and the full
/// projection × view × world matrix
#[derive(Debug, Clone, Copy)]
pub struct DrawCall {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Material to draw it with
    pub material: MaterialHandle,
    /// Combined render matrix
    pub render_matrix: Mat4,
}

/// The device surface consumed by the engine core.
///
/// All calls happen on the single frame-driving thread. Any non-success
/// condition that is not expressed through an outcome enum is returned as
/// a `DeviceFailure` error, which callers treat as fatal.
pub trait GraphicsDevice {
    /// Create a fence, optionally already signaled
    fn create_fence(&mut self, signaled: bool) -> EngineResult<FenceHandle>;

    /// Create a binary semaphore
    fn create_semaphore(&mut self) -> EngineResult<SemaphoreHandle>;

    /// Block until the fence signals or the timeout elapses
    fn wait_for_fence(&mut self, fence: FenceHandle, timeout_ns: u64) -> EngineResult<WaitOutcome>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&mut self, fence: FenceHandle) -> EngineResult<()>;

    /// Acquire the next presentable image, signaling `signal` when ready
    fn acquire_image(
        &mut self,
        signal: SemaphoreHandle,
        timeout_ns: u64,
    ) -> EngineResult<AcquireOutcome>;

    /// Reset the command buffer and begin recording into the given image
    fn begin_recording(&mut self, image_index: u32) -> EngineResult<()>;

    /// Record one draw into the open command buffer
    fn record_draw(&mut self, draw: &DrawCall) -> EngineResult<()>;

    /// Finish command recording
    fn end_recording(&mut self) -> EngineResult<()>;

    /// Submit the recorded commands: wait on `wait` at color-output,
    /// signal `signal` and `fence` on completion
    fn submit(
        &mut self,
        wait: SemaphoreHandle,
        signal: SemaphoreHandle,
        fence: FenceHandle,
    ) -> EngineResult<()>;

    /// Present the image, waiting GPU-side on `wait`
    fn present(&mut self, wait: SemaphoreHandle, image_index: u32) -> EngineResult<PresentOutcome>;

    /// Tear down swapchain-scoped resources (LIFO through the deletion
    /// queue) and rebuild them at the given extent
    fn rebuild_swapchain(&mut self, extent: (u32, u32)) -> EngineResult<()>;

    /// Block until all submitted GPU work completes
    fn wait_idle(&mut self) -> EngineResult<()>;

    /// Upload vertex data, returning a handle usable in draw calls
    fn upload_mesh(&mut self, vertices: &[MeshVertex]) -> EngineResult<MeshHandle>;

    /// Register a flat-color material
    fn create_material(&mut self, color: [f32; 4]) -> EngineResult<MaterialHandle>;

    /// Extent of the current swapchain in pixels
    fn swapchain_extent(&self) -> (u32, u32);

    /// Release every remaining GPU resource; called once at shutdown after
    /// the device has gone idle
    fn release_all(&mut self) -> EngineResult<()>;
}

//! Rendering core: deletion queue, device surface, frame synchronization,
//! shader binaries, and the Vulkan backend

pub mod deletion_queue;
pub mod device;
pub mod frame;
pub mod shader;
pub mod vulkan;

pub use deletion_queue::{DeletionQueue, ReleaseKind, ReleaseSink, ResourceRelease};
pub use device::{
    AcquireOutcome, DrawCall, FenceHandle, GraphicsDevice, MaterialHandle, MeshHandle, MeshVertex,
    PresentOutcome, SemaphoreHandle, WaitOutcome,
};
pub use frame::{FramePhase, FrameSynchronizer};

#[cfg(test)]
pub(crate) mod testing {
    //! Mock device and window used across the crate's tests

    use super::device::*;
    use crate::core::config::EngineConfig;
    use crate::core::context::{EngineContext, GpuContext};
    use crate::core::error::EngineResult;
    use crate::platform::{PlatformEvent, WindowSurface};
    use crate::render::frame::FrameSynchronizer;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Scriptable in-memory device
    pub struct MockDevice {
        fence_signaled: bool,
        next_handle: u64,
        recording: bool,
        rebuild_count: u32,
        last_rebuild_extent: Option<(u32, u32)>,
        extent: (u32, u32),
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        /// Shared so tests can observe draws after the device is boxed
        pub draws: Rc<RefCell<Vec<DrawCall>>>,
        pub submit_count: u32,
    }

    impl MockDevice {
        pub fn new() -> Self {
            Self {
                fence_signaled: false,
                next_handle: 1,
                recording: false,
                rebuild_count: 0,
                last_rebuild_extent: None,
                extent: (800, 600),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                draws: Rc::new(RefCell::new(Vec::new())),
                submit_count: 0,
            }
        }

        fn next(&mut self) -> u64 {
            let handle = self.next_handle;
            self.next_handle += 1;
            handle
        }

        pub fn fence_signaled(&self) -> bool {
            self.fence_signaled
        }

        pub fn force_fence_unsignaled(&mut self) {
            self.fence_signaled = false;
        }

        pub fn script_acquire(&mut self, outcome: AcquireOutcome) {
            self.acquire_script.push_back(outcome);
        }

        pub fn script_present(&mut self, outcome: PresentOutcome) {
            self.present_script.push_back(outcome);
        }

        pub fn rebuild_count(&self) -> u32 {
            self.rebuild_count
        }

        pub fn last_rebuild_extent(&self) -> Option<(u32, u32)> {
            self.last_rebuild_extent
        }
    }

    impl GraphicsDevice for MockDevice {
        fn create_fence(&mut self, signaled: bool) -> EngineResult<FenceHandle> {
            self.fence_signaled = signaled;
            Ok(FenceHandle(self.next()))
        }

        fn create_semaphore(&mut self) -> EngineResult<SemaphoreHandle> {
            Ok(SemaphoreHandle(self.next()))
        }

        fn wait_for_fence(
            &mut self,
            _fence: FenceHandle,
            _timeout_ns: u64,
        ) -> EngineResult<WaitOutcome> {
            Ok(if self.fence_signaled {
                WaitOutcome::Signaled
            } else {
                WaitOutcome::TimedOut
            })
        }

        fn reset_fence(&mut self, _fence: FenceHandle) -> EngineResult<()> {
            self.fence_signaled = false;
            Ok(())
        }

        fn acquire_image(
            &mut self,
            _signal: SemaphoreHandle,
            _timeout_ns: u64,
        ) -> EngineResult<AcquireOutcome> {
            Ok(self
                .acquire_script
                .pop_front()
                .unwrap_or(AcquireOutcome::Acquired(0)))
        }

        fn begin_recording(&mut self, _image_index: u32) -> EngineResult<()> {
            self.recording = true;
            Ok(())
        }

        fn record_draw(&mut self, draw: &DrawCall) -> EngineResult<()> {
            assert!(self.recording, "draw recorded outside an open frame");
            self.draws.borrow_mut().push(*draw);
            Ok(())
        }

        fn end_recording(&mut self) -> EngineResult<()> {
            self.recording = false;
            Ok(())
        }

        fn submit(
            &mut self,
            _wait: SemaphoreHandle,
            _signal: SemaphoreHandle,
            _fence: FenceHandle,
        ) -> EngineResult<()> {
            // The simulated GPU finishes instantly: signal the frame fence
            self.fence_signaled = true;
            self.submit_count += 1;
            Ok(())
        }

        fn present(
            &mut self,
            _wait: SemaphoreHandle,
            _image_index: u32,
        ) -> EngineResult<PresentOutcome> {
            Ok(self
                .present_script
                .pop_front()
                .unwrap_or(PresentOutcome::Presented))
        }

        fn rebuild_swapchain(&mut self, extent: (u32, u32)) -> EngineResult<()> {
            self.rebuild_count += 1;
            self.last_rebuild_extent = Some(extent);
            self.extent = extent;
            Ok(())
        }

        fn wait_idle(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn upload_mesh(&mut self, _vertices: &[MeshVertex]) -> EngineResult<MeshHandle> {
            Ok(MeshHandle(self.next()))
        }

        fn create_material(&mut self, _color: [f32; 4]) -> EngineResult<MaterialHandle> {
            Ok(MaterialHandle(self.next()))
        }

        fn swapchain_extent(&self) -> (u32, u32) {
            self.extent
        }

        fn release_all(&mut self) -> EngineResult<()> {
            Ok(())
        }
    }

    /// Scriptable window: a sequence of drawable sizes and event batches
    pub struct MockWindow {
        sizes: VecDeque<(u32, u32)>,
        events: VecDeque<Vec<PlatformEvent>>,
        pump_count: u32,
    }

    impl MockWindow {
        pub fn fixed(width: u32, height: u32) -> Self {
            Self {
                sizes: VecDeque::from(vec![(width, height)]),
                events: VecDeque::new(),
                pump_count: 0,
            }
        }

        /// The drawable size advances one step per pump
        pub fn with_sizes(sizes: Vec<(u32, u32)>) -> Self {
            Self {
                sizes: VecDeque::from(sizes),
                events: VecDeque::new(),
                pump_count: 0,
            }
        }

        pub fn script_events(&mut self, batches: Vec<Vec<PlatformEvent>>) {
            self.events = VecDeque::from(batches);
        }

        pub fn pump_count(&self) -> u32 {
            self.pump_count
        }
    }

    impl WindowSurface for MockWindow {
        fn pump_events(&mut self) -> Vec<PlatformEvent> {
            self.pump_count += 1;
            if self.sizes.len() > 1 {
                self.sizes.pop_front();
            }
            self.events.pop_front().unwrap_or_default()
        }

        fn drawable_extent(&self) -> (u32, u32) {
            *self.sizes.front().unwrap_or(&(0, 0))
        }
    }

    /// A full context over the mock backend, for scheduler and engine tests
    pub fn test_context() -> EngineContext {
        let mut device = MockDevice::new();
        let frame = FrameSynchronizer::new(&mut device, 1_000, 1_000).unwrap();
        let gpu = GpuContext {
            device: Box::new(device),
            frame,
            window: Box::new(MockWindow::fixed(800, 600)),
        };
        EngineContext::new(EngineConfig::default(), gpu)
    }
}

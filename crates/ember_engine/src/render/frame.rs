//! Frame synchronization
//!
//! The CPU/GPU handshake for a single frame in flight: one fence (created
//! signaled), two semaphores, the acquired image index, and a monotonic
//! frame counter. The next frame may not begin recording until the fence
//! from the previous frame has signaled.
//!
//! Recoverable conditions (out-of-date/suboptimal present, zero-area
//! resize, minimization) are handled as state transitions. Bounded-wait
//! timeouts and every other device failure are fatal — they indicate a
//! GPU hang or an unrecoverable driver state.

use crate::core::error::{EngineError, EngineResult};
use crate::platform::{PlatformEvent, WindowSurface};
use crate::render::device::{
    AcquireOutcome, FenceHandle, GraphicsDevice, PresentOutcome, SemaphoreHandle, WaitOutcome,
};

/// Where the synchronizer is within the frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Between frames; `begin_frame` is legal
    Idle,
    /// Waiting on the fence / acquiring an image
    Acquiring,
    /// Commands are being recorded; draws are legal
    Recording,
    /// Commands submitted to the graphics queue
    Submitted,
    /// Image handed to the presentation engine
    Presenting,
}

/// Per-frame synchronization state machine
pub struct FrameSynchronizer {
    fence: FenceHandle,
    image_available: SemaphoreHandle,
    render_finished: SemaphoreHandle,
    phase: FramePhase,
    image_index: u32,
    frame_counter: u64,
    rebuild_pending: bool,
    fence_timeout_ns: u64,
    acquire_timeout_ns: u64,
}

impl FrameSynchronizer {
    /// Create the sync objects on the device. The fence starts signaled so
    /// the very first frame does not wait.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        fence_timeout_ns: u64,
        acquire_timeout_ns: u64,
    ) -> EngineResult<Self> {
        Ok(Self {
            fence: device.create_fence(true)?,
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
            phase: FramePhase::Idle,
            image_index: 0,
            frame_counter: 0,
            rebuild_pending: false,
            fence_timeout_ns,
            acquire_timeout_ns,
        })
    }

    /// Current phase
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// True while a frame is open for draw recording
    pub fn is_recording(&self) -> bool {
        self.phase == FramePhase::Recording
    }

    /// Frames completed so far
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Index of the image acquired for the current frame
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// True when the next `begin_frame` will rebuild the swapchain first
    pub fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Wait for the previous frame, acquire the next image, and open the
    /// command buffer. Returns `false` (without beginning a frame) when the
    /// drawable area is zero and drawing is suspended.
    ///
    /// Calling this while a frame is already open violates the one-frame-
    /// in-flight contract and is rejected.
    pub fn begin_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        window: &dyn WindowSurface,
    ) -> EngineResult<bool> {
        if self.phase != FramePhase::Idle {
            return Err(EngineError::device_failure(
                "frame",
                format!("begin_frame while frame in flight (phase {:?})", self.phase),
            ));
        }

        let extent = window.drawable_extent();
        if extent.0 == 0 || extent.1 == 0 {
            log::trace!("zero drawable area, frame suspended");
            return Ok(false);
        }

        self.phase = FramePhase::Acquiring;

        match device.wait_for_fence(self.fence, self.fence_timeout_ns)? {
            WaitOutcome::Signaled => {}
            WaitOutcome::TimedOut => {
                self.phase = FramePhase::Idle;
                return Err(EngineError::device_failure(
                    "frame",
                    "fence wait timed out, GPU hang suspected",
                ));
            }
        }

        if self.rebuild_pending {
            self.rebuild(device, extent)?;
        }

        let image_index = match self.acquire_with_rebuild(device, extent)? {
            Some(index) => index,
            None => {
                // Rebuilt twice and still out of date; give up on the frame
                self.phase = FramePhase::Idle;
                return Ok(false);
            }
        };

        // Reset only after a successful acquire so a skipped frame leaves
        // the fence signaled for the next wait
        device.reset_fence(self.fence)?;
        device.begin_recording(image_index)?;

        self.image_index = image_index;
        self.phase = FramePhase::Recording;
        Ok(true)
    }

    fn acquire_with_rebuild(
        &mut self,
        device: &mut dyn GraphicsDevice,
        extent: (u32, u32),
    ) -> EngineResult<Option<u32>> {
        for attempt in 0..2 {
            match device.acquire_image(self.image_available, self.acquire_timeout_ns)? {
                AcquireOutcome::Acquired(index) => return Ok(Some(index)),
                AcquireOutcome::OutOfDate => {
                    log::warn!("swapchain out of date on acquire (attempt {attempt})");
                    self.rebuild(device, extent)?;
                }
                AcquireOutcome::TimedOut => {
                    self.phase = FramePhase::Idle;
                    return Err(EngineError::device_failure(
                        "frame",
                        "image acquire timed out, GPU hang suspected",
                    ));
                }
            }
        }
        Ok(None)
    }

    /// Close the command buffer, submit, and present. Out-of-date or
    /// suboptimal present results schedule a swapchain rebuild for the
    /// next frame rather than failing.
    pub fn end_frame(&mut self, device: &mut dyn GraphicsDevice) -> EngineResult<()> {
        if self.phase != FramePhase::Recording {
            return Err(EngineError::device_failure(
                "frame",
                format!("end_frame without an open frame (phase {:?})", self.phase),
            ));
        }

        device.end_recording()?;

        self.phase = FramePhase::Submitted;
        device.submit(self.image_available, self.render_finished, self.fence)?;

        self.phase = FramePhase::Presenting;
        match device.present(self.render_finished, self.image_index)? {
            PresentOutcome::Presented => {}
            PresentOutcome::OutOfDate | PresentOutcome::Suboptimal => {
                log::info!("present reported stale swapchain, rebuilding next frame");
                self.rebuild_pending = true;
            }
        }

        self.frame_counter += 1;
        self.phase = FramePhase::Idle;
        Ok(())
    }

    /// Handle a window resize or maximize: pump events until the drawable
    /// area is non-zero, then rebuild swapchain-scoped resources exactly
    /// once at the new size.
    pub fn handle_resize(
        &mut self,
        device: &mut dyn GraphicsDevice,
        window: &mut dyn WindowSurface,
    ) -> EngineResult<()> {
        let mut extent = window.drawable_extent();
        while extent.0 == 0 || extent.1 == 0 {
            window.pump_events();
            extent = window.drawable_extent();
        }
        self.rebuild(device, extent)
    }

    /// Suspend drawing while minimized: pump events until a restore is
    /// observed. Returns `true` if a close request arrived meanwhile.
    pub fn handle_minimize(&mut self, window: &mut dyn WindowSurface) -> bool {
        log::info!("window minimized, suspending frame production");
        loop {
            let events = window.pump_events();
            let mut close_requested = false;
            for event in &events {
                match event {
                    PlatformEvent::Restored => {
                        log::info!("window restored, resuming frame production");
                        return close_requested;
                    }
                    PlatformEvent::CloseRequested => close_requested = true,
                    _ => {}
                }
            }
            if close_requested {
                return true;
            }
        }
    }

    fn rebuild(&mut self, device: &mut dyn GraphicsDevice, extent: (u32, u32)) -> EngineResult<()> {
        device.wait_idle()?;
        device.rebuild_swapchain(extent)?;
        self.rebuild_pending = false;
        Ok(())
    }
}

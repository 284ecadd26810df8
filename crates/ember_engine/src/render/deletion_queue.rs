//! GPU resource deletion queue
//!
//! Teardown is ordered: resources are pushed as they are acquired and
//! released in strict reverse order, so dependents always die before the
//! resources they depend on. The queue owns plain data — a release kind
//! plus the opaque native handle — not closures, which keeps ordering
//! testable without a live device.

/// What kind of GPU object a release refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// Buffer object
    Buffer,
    /// Device memory allocation
    DeviceMemory,
    /// Image object
    Image,
    /// Image view
    ImageView,
    /// Framebuffer
    Framebuffer,
    /// Swapchain
    Swapchain,
    /// Graphics pipeline
    Pipeline,
    /// Pipeline layout
    PipelineLayout,
    /// Render pass
    RenderPass,
    /// Shader module
    ShaderModule,
    /// Semaphore
    Semaphore,
    /// Fence
    Fence,
    /// Command pool
    CommandPool,
}

/// A single pending release: kind plus opaque native handle
///
/// A zero handle is the null sentinel and is skipped at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRelease {
    /// Kind of the object being released
    pub kind: ReleaseKind,
    /// Opaque native handle; 0 means "already gone"
    pub handle: u64,
}

impl ResourceRelease {
    /// Build a release entry
    pub fn new(kind: ReleaseKind, handle: u64) -> Self {
        Self { kind, handle }
    }

    /// True for the null-handle sentinel
    pub fn is_null(&self) -> bool {
        self.handle == 0
    }
}

/// Executes individual releases; implemented by the device backend and by
/// recording sinks in tests
pub trait ReleaseSink {
    /// Release one GPU object
    fn release(&mut self, release: ResourceRelease);
}

/// Ordered queue of pending releases
#[derive(Default)]
pub struct DeletionQueue {
    pending: Vec<ResourceRelease>,
}

impl DeletionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a release; insertion order must match acquisition order
    pub fn push(&mut self, release: ResourceRelease) {
        self.pending.push(release);
    }

    /// Execute all pending releases in reverse insertion order, then empty
    /// the queue. Safe on an empty queue; a second flush with no new
    /// pushes is a no-op.
    pub fn flush(&mut self, sink: &mut dyn ReleaseSink) {
        for release in self.pending.drain(..).rev() {
            if release.is_null() {
                log::trace!("skipping null {:?} release", release.kind);
                continue;
            }
            sink.release(release);
        }
    }

    /// Number of pending releases
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        log: Vec<u64>,
    }

    impl ReleaseSink for RecordingSink {
        fn release(&mut self, release: ResourceRelease) {
            self.log.push(release.handle);
        }
    }

    #[test]
    fn flush_runs_in_reverse_insertion_order() {
        let mut queue = DeletionQueue::new();
        queue.push(ResourceRelease::new(ReleaseKind::Swapchain, 1)); // "A"
        queue.push(ResourceRelease::new(ReleaseKind::ImageView, 2)); // "B"
        queue.push(ResourceRelease::new(ReleaseKind::Framebuffer, 3)); // "C"

        let mut sink = RecordingSink::default();
        queue.flush(&mut sink);
        assert_eq!(sink.log, vec![3, 2, 1]);
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_on_empty_queue_is_a_no_op() {
        let mut queue = DeletionQueue::new();
        let mut sink = RecordingSink::default();
        queue.flush(&mut sink);
        assert!(sink.log.is_empty());
    }

    #[test]
    fn double_flush_executes_once() {
        let mut queue = DeletionQueue::new();
        queue.push(ResourceRelease::new(ReleaseKind::Fence, 7));

        let mut sink = RecordingSink::default();
        queue.flush(&mut sink);
        queue.flush(&mut sink);
        assert_eq!(sink.log, vec![7]);
    }

    #[test]
    fn null_handles_are_skipped() {
        let mut queue = DeletionQueue::new();
        queue.push(ResourceRelease::new(ReleaseKind::Pipeline, 0));
        queue.push(ResourceRelease::new(ReleaseKind::Pipeline, 9));

        let mut sink = RecordingSink::default();
        queue.flush(&mut sink);
        assert_eq!(sink.log, vec![9]);
    }
}

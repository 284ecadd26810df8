//! Engine driver
//!
//! Owns the context and the stage scheduler, registers the built-in frame
//! systems, and drives the main loop: tick the timer, run the stage chain,
//! honor the quit flag after the in-flight frame has completed, then tear
//! everything down through the deletion queues.

use crate::core::config::EngineConfig;
use crate::core::context::{EngineContext, GpuContext};
use crate::core::error::{EngineError, EngineResult};
use crate::foundation::time::Timer;
use crate::platform::glfw_window::GlfwWindow;
use crate::platform::{PlatformEvent, WindowSurface};
use crate::render::device::{DrawCall, GraphicsDevice, MaterialHandle, MeshHandle, MeshVertex};
use crate::render::frame::FrameSynchronizer;
use crate::render::vulkan::VulkanDevice;
use crate::scene::camera;
use crate::schedule::{FrameSystem, Stage, StageScheduler};

/// The engine: context, scheduler, and the main loop
pub struct Engine {
    ctx: EngineContext,
    scheduler: StageScheduler,
    timer: Timer,
}

impl Engine {
    /// Bring up the engine with the GLFW window and Vulkan backend
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let mut window = GlfwWindow::new(
            &config.window.title,
            config.window.width,
            config.window.height,
        )?;
        let device = VulkanDevice::new(&config, &mut window)?;
        Self::with_backend(config, Box::new(device), Box::new(window))
    }

    /// Bring up the engine over caller-provided device and window
    /// implementations; used by tests and alternative backends
    pub fn with_backend(
        config: EngineConfig,
        mut device: Box<dyn GraphicsDevice>,
        window: Box<dyn WindowSurface>,
    ) -> EngineResult<Self> {
        let frame = FrameSynchronizer::new(
            device.as_mut(),
            config.sync.fence_timeout_ns,
            config.sync.acquire_timeout_ns,
        )?;
        let gpu = GpuContext {
            device,
            frame,
            window,
        };
        let ctx = EngineContext::new(config, gpu);

        let mut scheduler = StageScheduler::new()?;
        scheduler.register(Box::new(InputSystem));
        scheduler.register(Box::new(MotionSystem));
        scheduler.register(Box::new(PreDrawSystem));
        scheduler.register(Box::new(DrawSystem));
        scheduler.register(Box::new(PostDrawSystem));
        scheduler.register(Box::new(HousekeepingSystem));

        Ok(Self {
            ctx,
            scheduler,
            timer: Timer::new(),
        })
    }

    /// Shared context
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Mutable shared context
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// Register an application frame system
    pub fn register_system(&mut self, system: Box<dyn FrameSystem>) {
        self.scheduler.register(system);
    }

    /// Register a closure as a frame system
    pub fn register_fn<F>(&mut self, stage: Stage, name: impl Into<String>, body: F)
    where
        F: FnMut(&mut EngineContext, f32) -> EngineResult<()> + 'static,
    {
        self.scheduler.register_fn(stage, name, body);
    }

    /// Upload a mesh to the device
    pub fn upload_mesh(&mut self, vertices: &[MeshVertex]) -> EngineResult<MeshHandle> {
        self.ctx.gpu.device.upload_mesh(vertices)
    }

    /// Register a flat-color material with the device
    pub fn create_material(&mut self, color: [f32; 4]) -> EngineResult<MaterialHandle> {
        self.ctx.gpu.device.create_material(color)
    }

    /// Run one frame through the stage chain
    pub fn run_frame(&mut self) -> EngineResult<()> {
        let delta_time = self.timer.tick();
        self.scheduler.run_frame(&mut self.ctx, delta_time)
    }

    /// Drive frames until a quit request is observed, then shut down.
    ///
    /// Fatal conditions log a diagnostic to stderr and are returned after
    /// a best-effort teardown.
    pub fn run(&mut self) -> EngineResult<()> {
        log::info!("starting main loop");
        loop {
            if let Err(err) = self.run_frame() {
                log::error!("fatal: {err}");
                let _ = self.shutdown();
                return Err(err);
            }
            if self.ctx.quit_requested {
                log::info!("quit requested, leaving main loop");
                break;
            }
        }
        self.shutdown()
    }

    fn shutdown(&mut self) -> EngineResult<()> {
        self.ctx.gpu.device.wait_idle()?;
        self.scheduler.run_final_cleanup(&mut self.ctx)?;
        self.ctx.gpu.device.release_all()?;
        log::info!("engine shutdown complete");
        Ok(())
    }
}

/// Pumps platform events into input state, the quit flag, and the frame
/// synchronizer's resize/minimize handling
struct InputSystem;

impl FrameSystem for InputSystem {
    fn name(&self) -> &str {
        "input"
    }

    fn stage(&self) -> Stage {
        Stage::InputUpdate
    }

    fn run(&mut self, ctx: &mut EngineContext, _delta_time: f32) -> EngineResult<()> {
        let events = ctx.gpu.window.pump_events();
        let mut resize_needed = false;

        for event in events {
            match event {
                PlatformEvent::CloseRequested => ctx.quit_requested = true,
                PlatformEvent::Key {
                    code,
                    pressed,
                    repeat,
                } => ctx.input.apply_key(code, pressed, repeat),
                PlatformEvent::MouseButton { button, pressed } => {
                    ctx.input.apply_mouse_button(button, pressed);
                }
                PlatformEvent::MouseMotion { x, y } => ctx.input.apply_cursor(x, y),
                PlatformEvent::MouseWheel { dx, dy } => ctx.input.apply_wheel(dx, dy),
                PlatformEvent::Resized(_, _) | PlatformEvent::Maximized => resize_needed = true,
                PlatformEvent::Minimized => {
                    let close = ctx.gpu.frame.handle_minimize(ctx.gpu.window.as_mut());
                    if close {
                        ctx.quit_requested = true;
                    }
                }
                PlatformEvent::Restored => {}
            }
        }

        // Coalesce bursts of resize events into a single rebuild
        if resize_needed && !ctx.quit_requested {
            let GpuContext {
                device,
                frame,
                window,
            } = &mut ctx.gpu;
            frame.handle_resize(device.as_mut(), window.as_mut())?;
            ctx.viewport = ctx.gpu.device.swapchain_extent();

            let aspect = ctx.viewport.0 as f32 / ctx.viewport.1.max(1) as f32;
            if let Some(camera_entity) = ctx.main_camera.get() {
                if let Some(camera::CameraProjection::Perspective(perspective)) =
                    ctx.world.try_camera_mut(camera_entity)
                {
                    perspective.set_aspect(aspect);
                }
            }
        }
        Ok(())
    }
}

/// Integrates linear and angular velocity into transform nodes
struct MotionSystem;

impl FrameSystem for MotionSystem {
    fn name(&self) -> &str {
        "motion"
    }

    fn stage(&self) -> Stage {
        Stage::Update
    }

    fn run(&mut self, ctx: &mut EngineContext, delta_time: f32) -> EngineResult<()> {
        for (key, motion) in ctx.world.moving_entities() {
            if let Some(node) = ctx.transforms.get_mut(key) {
                node.position += motion.linear_velocity * delta_time;
                node.rotation += motion.angular_velocity * delta_time;
            }
        }
        Ok(())
    }
}

/// Opens the frame: fence wait, image acquire, begin recording
struct PreDrawSystem;

impl FrameSystem for PreDrawSystem {
    fn name(&self) -> &str {
        "pre-draw"
    }

    fn stage(&self) -> Stage {
        Stage::PreDraw
    }

    fn run(&mut self, ctx: &mut EngineContext, _delta_time: f32) -> EngineResult<()> {
        let GpuContext {
            device,
            frame,
            window,
        } = &mut ctx.gpu;
        frame.begin_frame(device.as_mut(), window.as_ref())?;
        Ok(())
    }
}

/// Walks drawable entities and records their draws through the main camera
struct DrawSystem;

impl FrameSystem for DrawSystem {
    fn name(&self) -> &str {
        "draw"
    }

    fn stage(&self) -> Stage {
        Stage::Draw
    }

    fn run(&mut self, ctx: &mut EngineContext, _delta_time: f32) -> EngineResult<()> {
        if !ctx.gpu.frame.is_recording() {
            return Ok(());
        }

        let camera_entity = ctx.main_camera.get().ok_or_else(|| {
            EngineError::not_found("engine", "no main camera designated at draw time")
        })?;
        let projection = ctx.world.camera(camera_entity)?.projection_matrix();
        let camera_key = ctx.world.transform_key(camera_entity)?;
        let view = ctx.transforms.view_matrix(camera_key)?;

        for (_, renderable, transform_key) in ctx.world.drawable_entities() {
            let world = ctx.transforms.world_matrix(transform_key)?;
            let draw = DrawCall {
                mesh: renderable.mesh,
                material: renderable.material,
                render_matrix: camera::render_matrix(projection, view, world),
            };
            ctx.gpu.device.record_draw(&draw)?;
        }
        Ok(())
    }
}

/// Closes the frame: end recording, submit, present
struct PostDrawSystem;

impl FrameSystem for PostDrawSystem {
    fn name(&self) -> &str {
        "post-draw"
    }

    fn stage(&self) -> Stage {
        Stage::PostDraw
    }

    fn run(&mut self, ctx: &mut EngineContext, _delta_time: f32) -> EngineResult<()> {
        if ctx.gpu.frame.is_recording() {
            let GpuContext { device, frame, .. } = &mut ctx.gpu;
            frame.end_frame(device.as_mut())?;
        }
        Ok(())
    }
}

/// Clears transient per-frame flags
struct HousekeepingSystem;

impl FrameSystem for HousekeepingSystem {
    fn name(&self) -> &str {
        "housekeeping"
    }

    fn stage(&self) -> Stage {
        Stage::Housekeeping
    }

    fn run(&mut self, ctx: &mut EngineContext, _delta_time: f32) -> EngineResult<()> {
        ctx.input.clear_transient();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Renderable;
    use crate::platform::KeyCode;
    use crate::render::testing::{MockDevice, MockWindow};
    use crate::scene::camera::{CameraProjection, PerspectiveCamera};
    use crate::scene::transform::TransformNode;
    use crate::foundation::math::Vec3;

    fn engine_with(device: MockDevice, window: MockWindow) -> Engine {
        Engine::with_backend(
            EngineConfig::default(),
            Box::new(device),
            Box::new(window),
        )
        .unwrap()
    }

    fn add_camera(engine: &mut Engine) {
        let ctx = engine.context_mut();
        let camera_entity = ctx.world.spawn();
        ctx.world
            .attach_transform(
                camera_entity,
                TransformNode::from_position(Vec3::new(0.0, 0.0, -2.0)),
                &mut ctx.transforms,
            )
            .unwrap();
        ctx.world
            .set_camera(
                camera_entity,
                CameraProjection::Perspective(PerspectiveCamera::new(
                    70.0,
                    16.0 / 9.0,
                    0.1,
                    200.0,
                )),
            )
            .unwrap();
        ctx.main_camera.set(camera_entity);
    }

    #[test]
    fn close_request_finishes_frame_then_quits() {
        let mut window = MockWindow::fixed(800, 600);
        window.script_events(vec![vec![PlatformEvent::CloseRequested]]);
        let mut engine = engine_with(MockDevice::new(), window);
        add_camera(&mut engine);

        engine.run().unwrap();
        // The in-flight frame completed before the loop exited
        assert_eq!(engine.context().gpu.frame.frame_counter(), 1);
        assert!(engine.context().quit_requested);
    }

    #[test]
    fn draw_stage_records_one_call_per_renderable() {
        let device = MockDevice::new();
        let draws = std::rc::Rc::clone(&device.draws);
        let mut engine = engine_with(device, MockWindow::fixed(800, 600));
        add_camera(&mut engine);

        let mesh = engine.upload_mesh(&[MeshVertex { position: [0.0; 3] }]).unwrap();
        let material = engine.create_material([1.0, 0.0, 0.0, 1.0]).unwrap();
        let ctx = engine.context_mut();
        for z in [1.0f32, 5.0] {
            let entity = ctx.world.spawn();
            ctx.world
                .attach_transform(
                    entity,
                    TransformNode::from_position(Vec3::new(0.0, 0.0, z)),
                    &mut ctx.transforms,
                )
                .unwrap();
            ctx.world
                .set_renderable(entity, Renderable { mesh, material })
                .unwrap();
        }

        engine.run_frame().unwrap();
        assert_eq!(draws.borrow().len(), 2);
    }

    #[test]
    fn missing_main_camera_is_fatal_at_draw_time() {
        let mut engine = engine_with(MockDevice::new(), MockWindow::fixed(800, 600));
        let err = engine.run_frame().unwrap_err();
        assert!(err.reason.contains("main camera"));
    }

    #[test]
    fn main_camera_without_projection_component_is_fatal() {
        let mut engine = engine_with(MockDevice::new(), MockWindow::fixed(800, 600));
        let ctx = engine.context_mut();
        let entity = ctx.world.spawn();
        ctx.world
            .attach_transform(entity, TransformNode::identity(), &mut ctx.transforms)
            .unwrap();
        ctx.main_camera.set(entity);

        let err = engine.run_frame().unwrap_err();
        assert!(err.reason.contains("camera component"));
    }

    #[test]
    fn key_edges_are_cleared_by_housekeeping() {
        let mut window = MockWindow::fixed(800, 600);
        window.script_events(vec![
            vec![PlatformEvent::Key {
                code: KeyCode::W,
                pressed: true,
                repeat: false,
            }],
            vec![PlatformEvent::Key {
                code: KeyCode::W,
                pressed: true,
                repeat: true,
            }],
        ]);
        let mut engine = engine_with(MockDevice::new(), window);
        add_camera(&mut engine);

        engine.run_frame().unwrap();
        // Housekeeping already ran inside the frame: edge is gone, held stays
        assert!(!engine.context().input.was_pressed(KeyCode::W));
        assert!(engine.context().input.is_held(KeyCode::W));

        engine.run_frame().unwrap();
        // Repeat events never re-trigger the pressed edge
        assert!(!engine.context().input.was_pressed(KeyCode::W));
        assert!(engine.context().input.is_held(KeyCode::W));
    }

    #[test]
    fn motion_integrates_into_transform() {
        let mut engine = engine_with(MockDevice::new(), MockWindow::fixed(800, 600));
        add_camera(&mut engine);
        let ctx = engine.context_mut();
        let entity = ctx.world.spawn();
        let key = ctx
            .world
            .attach_transform(entity, TransformNode::identity(), &mut ctx.transforms)
            .unwrap();
        ctx.world
            .set_motion(
                entity,
                crate::ecs::Motion {
                    linear_velocity: Vec3::new(1.0, 0.0, 0.0),
                    angular_velocity: Vec3::new(0.0, 90.0, 0.0),
                },
            )
            .unwrap();

        // Drive the system directly with a fixed delta for a deterministic check
        MotionSystem
            .run(engine.context_mut(), 0.5)
            .unwrap();
        let node = engine.context().transforms.get(key).unwrap();
        approx::assert_relative_eq!(node.position.x, 0.5, epsilon = 1e-6);
        approx::assert_relative_eq!(node.rotation.y, 45.0, epsilon = 1e-4);
    }
}

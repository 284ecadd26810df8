//! Vulkan backend
//!
//! Implements [`GraphicsDevice`] with ash. All teardown flows through two
//! deletion queues: one for device-lifetime objects (pipeline, shaders,
//! sync primitives, mesh buffers) and one for swapchain-scoped objects
//! torn down and rebuilt on every resize.

pub mod context;
pub mod swapchain;

use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, EngineResult};
use crate::platform::glfw_window::GlfwWindow;
use crate::platform::WindowSurface;
use crate::render::deletion_queue::{DeletionQueue, ReleaseKind, ReleaseSink, ResourceRelease};
use crate::render::device::{
    AcquireOutcome, DrawCall, FenceHandle, GraphicsDevice, MaterialHandle, MeshHandle, MeshVertex,
    PresentOutcome, SemaphoreHandle, WaitOutcome,
};
use crate::render::shader::{self, ShaderStage};
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use ash::vk::Handle;
use self::context::{vk_err, VulkanContext};
use self::swapchain::SwapchainResources;
use std::collections::HashMap;

/// Push-constant payload for every draw: render matrix plus flat color
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct DrawPushConstants {
    render_matrix: [[f32; 4]; 4],
    material_color: [f32; 4],
}

unsafe impl bytemuck::Pod for DrawPushConstants {}
unsafe impl bytemuck::Zeroable for DrawPushConstants {}

struct MeshData {
    buffer: vk::Buffer,
    vertex_count: u32,
}

/// Executes releases against the raw device; shared by both queues
struct RawReleaseSink<'a> {
    device: &'a ash::Device,
    swapchain_loader: &'a SwapchainLoader,
}

impl ReleaseSink for RawReleaseSink<'_> {
    fn release(&mut self, release: ResourceRelease) {
        unsafe {
            match release.kind {
                ReleaseKind::Buffer => self
                    .device
                    .destroy_buffer(vk::Buffer::from_raw(release.handle), None),
                ReleaseKind::DeviceMemory => self
                    .device
                    .free_memory(vk::DeviceMemory::from_raw(release.handle), None),
                ReleaseKind::Image => self
                    .device
                    .destroy_image(vk::Image::from_raw(release.handle), None),
                ReleaseKind::ImageView => self
                    .device
                    .destroy_image_view(vk::ImageView::from_raw(release.handle), None),
                ReleaseKind::Framebuffer => self
                    .device
                    .destroy_framebuffer(vk::Framebuffer::from_raw(release.handle), None),
                ReleaseKind::Swapchain => self
                    .swapchain_loader
                    .destroy_swapchain(vk::SwapchainKHR::from_raw(release.handle), None),
                ReleaseKind::Pipeline => self
                    .device
                    .destroy_pipeline(vk::Pipeline::from_raw(release.handle), None),
                ReleaseKind::PipelineLayout => self
                    .device
                    .destroy_pipeline_layout(vk::PipelineLayout::from_raw(release.handle), None),
                ReleaseKind::RenderPass => self
                    .device
                    .destroy_render_pass(vk::RenderPass::from_raw(release.handle), None),
                ReleaseKind::ShaderModule => self
                    .device
                    .destroy_shader_module(vk::ShaderModule::from_raw(release.handle), None),
                ReleaseKind::Semaphore => self
                    .device
                    .destroy_semaphore(vk::Semaphore::from_raw(release.handle), None),
                ReleaseKind::Fence => self
                    .device
                    .destroy_fence(vk::Fence::from_raw(release.handle), None),
                ReleaseKind::CommandPool => self
                    .device
                    .destroy_command_pool(vk::CommandPool::from_raw(release.handle), None),
            }
        }
    }
}

/// ash-backed implementation of the engine's device surface
pub struct VulkanDevice {
    context: VulkanContext,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    command_buffer: vk::CommandBuffer,
    swapchain: SwapchainResources,
    device_releases: DeletionQueue,
    swapchain_releases: DeletionQueue,
    meshes: HashMap<u64, MeshData>,
    materials: HashMap<u64, [f32; 4]>,
    next_resource_id: u64,
    clear_color: [f32; 4],
    recording: bool,
}

impl VulkanDevice {
    /// Bring up the full backend against a window
    pub fn new(config: &EngineConfig, window: &mut GlfwWindow) -> EngineResult<Self> {
        let context = VulkanContext::new(
            window,
            &config.window.title,
            config.render.enable_validation,
        )?;
        let mut device_releases = DeletionQueue::new();
        let mut swapchain_releases = DeletionQueue::new();

        let surface_format = Self::query_surface_format(&context)?;
        let render_pass = Self::create_render_pass(&context, surface_format.format)?;
        device_releases.push(ResourceRelease::new(
            ReleaseKind::RenderPass,
            render_pass.as_raw(),
        ));

        let (pipeline_layout, pipeline) =
            Self::create_pipeline(&context, render_pass, config, &mut device_releases)?;

        let command_pool = Self::create_command_pool(&context)?;
        device_releases.push(ResourceRelease::new(
            ReleaseKind::CommandPool,
            command_pool.as_raw(),
        ));
        let command_buffer = Self::allocate_command_buffer(&context, command_pool)?;

        let swapchain = swapchain::create_swapchain(
            &context,
            render_pass,
            window.drawable_extent(),
            &mut swapchain_releases,
        )?;

        Ok(Self {
            context,
            render_pass,
            pipeline_layout,
            pipeline,
            command_buffer,
            swapchain,
            device_releases,
            swapchain_releases,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            next_resource_id: 1,
            clear_color: config.render.clear_color,
            recording: false,
        })
    }

    fn query_surface_format(context: &VulkanContext) -> EngineResult<vk::SurfaceFormatKHR> {
        let formats = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_formats(context.physical.device, context.surface)
                .map_err(|e| vk_err("get_surface_formats", e))?
        };
        Ok(formats
            .iter()
            .find(|sf| {
                sf.format == vk::Format::B8G8R8A8_SRGB
                    && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .copied()
            .unwrap_or(formats[0]))
    }

    fn create_render_pass(
        context: &VulkanContext,
        color_format: vk::Format,
    ) -> EngineResult<vk::RenderPass> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();
        let attachments = [color_attachment];

        let color_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();
        let color_refs = [color_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build();
        let subpasses = [subpass];

        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build();
        let dependencies = [dependency];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        unsafe {
            context
                .device
                .create_render_pass(&create_info, None)
                .map_err(|e| vk_err("create_render_pass", e))
        }
    }

    fn create_shader_module(
        context: &VulkanContext,
        bytes: &[u8],
    ) -> EngineResult<vk::ShaderModule> {
        let (prefix, words, suffix) = unsafe { bytes.align_to::<u32>() };
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(EngineError::invalid_path(
                "vulkan",
                "SPIR-V bytecode is not u32-aligned",
            ));
        }
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        unsafe {
            context
                .device
                .create_shader_module(&create_info, None)
                .map_err(|e| vk_err("create_shader_module", e))
        }
    }

    fn create_pipeline(
        context: &VulkanContext,
        render_pass: vk::RenderPass,
        config: &EngineConfig,
        releases: &mut DeletionQueue,
    ) -> EngineResult<(vk::PipelineLayout, vk::Pipeline)> {
        let vertex_binary = shader::load_shader(
            &config.render.asset_root,
            ShaderStage::Vertex,
            &config.render.vertex_shader,
        )?;
        let fragment_binary = shader::load_shader(
            &config.render.asset_root,
            ShaderStage::Fragment,
            &config.render.fragment_shader,
        )?;

        let vertex_module = Self::create_shader_module(context, &vertex_binary.bytes)?;
        releases.push(ResourceRelease::new(
            ReleaseKind::ShaderModule,
            vertex_module.as_raw(),
        ));
        let fragment_module = Self::create_shader_module(context, &fragment_binary.bytes)?;
        releases.push(ResourceRelease::new(
            ReleaseKind::ShaderModule,
            fragment_module.as_raw(),
        ));

        let entry_point = std::ffi::CStr::from_bytes_with_nul(b"main\0")
            .map_err(|_| EngineError::device_failure("vulkan", "bad shader entry point"))?;
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(entry_point)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(entry_point)
                .build(),
        ];

        let binding = vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(std::mem::size_of::<MeshVertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build();
        let bindings = [binding];
        let attribute = vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32_SFLOAT)
            .offset(0)
            .build();
        let attributes = [attribute];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic so the pipeline survives resizes
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();
        let blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let push_constant_range = vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: std::mem::size_of::<DrawPushConstants>() as u32,
        };
        let push_constant_ranges = [push_constant_range];
        let layout_info =
            vk::PipelineLayoutCreateInfo::builder().push_constant_ranges(&push_constant_ranges);
        let layout = unsafe {
            context
                .device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| vk_err("create_pipeline_layout", e))?
        };
        releases.push(ResourceRelease::new(
            ReleaseKind::PipelineLayout,
            layout.as_raw(),
        ));

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .dynamic_state(&dynamic_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            context
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
                .map_err(|(_, e)| vk_err("create_graphics_pipelines", e))?
        };
        let pipeline = pipelines[0];
        releases.push(ResourceRelease::new(ReleaseKind::Pipeline, pipeline.as_raw()));

        Ok((layout, pipeline))
    }

    fn create_command_pool(context: &VulkanContext) -> EngineResult<vk::CommandPool> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(context.physical.graphics_family);
        unsafe {
            context
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| vk_err("create_command_pool", e))
        }
    }

    fn allocate_command_buffer(
        context: &VulkanContext,
        pool: vk::CommandPool,
    ) -> EngineResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe {
            context
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| vk_err("allocate_command_buffers", e))?
        };
        Ok(buffers[0])
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_resource_id;
        self.next_resource_id += 1;
        id
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_fence(&mut self, signaled: bool) -> EngineResult<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe {
            self.context
                .device
                .create_fence(&create_info, None)
                .map_err(|e| vk_err("create_fence", e))?
        };
        self.device_releases
            .push(ResourceRelease::new(ReleaseKind::Fence, fence.as_raw()));
        Ok(FenceHandle(fence.as_raw()))
    }

    fn create_semaphore(&mut self) -> EngineResult<SemaphoreHandle> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe {
            self.context
                .device
                .create_semaphore(&create_info, None)
                .map_err(|e| vk_err("create_semaphore", e))?
        };
        self.device_releases.push(ResourceRelease::new(
            ReleaseKind::Semaphore,
            semaphore.as_raw(),
        ));
        Ok(SemaphoreHandle(semaphore.as_raw()))
    }

    fn wait_for_fence(&mut self, fence: FenceHandle, timeout_ns: u64) -> EngineResult<WaitOutcome> {
        let fences = [vk::Fence::from_raw(fence.0)];
        match unsafe { self.context.device.wait_for_fences(&fences, true, timeout_ns) } {
            Ok(()) => Ok(WaitOutcome::Signaled),
            Err(vk::Result::TIMEOUT) => Ok(WaitOutcome::TimedOut),
            Err(e) => Err(vk_err("wait_for_fences", e)),
        }
    }

    fn reset_fence(&mut self, fence: FenceHandle) -> EngineResult<()> {
        let fences = [vk::Fence::from_raw(fence.0)];
        unsafe {
            self.context
                .device
                .reset_fences(&fences)
                .map_err(|e| vk_err("reset_fences", e))
        }
    }

    fn acquire_image(
        &mut self,
        signal: SemaphoreHandle,
        timeout_ns: u64,
    ) -> EngineResult<AcquireOutcome> {
        let result = unsafe {
            self.context.swapchain_loader.acquire_next_image(
                self.swapchain.swapchain,
                timeout_ns,
                vk::Semaphore::from_raw(signal.0),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, _suboptimal)) => Ok(AcquireOutcome::Acquired(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(AcquireOutcome::TimedOut),
            Err(e) => Err(vk_err("acquire_next_image", e)),
        }
    }

    fn begin_recording(&mut self, image_index: u32) -> EngineResult<()> {
        let framebuffer = *self
            .swapchain
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| {
                EngineError::device_failure(
                    "vulkan",
                    format!("image index {image_index} out of range"),
                )
            })?;

        let device = &self.context.device;
        unsafe {
            device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| vk_err("reset_command_buffer", e))?;

            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| vk_err("begin_command_buffer", e))?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            }];
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            };
            let render_pass_begin = vk::RenderPassBeginInfo::builder()
                .render_pass(self.render_pass)
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );

            device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline,
            );

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: self.swapchain.extent.width as f32,
                height: self.swapchain.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(self.command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(self.command_buffer, 0, &[render_area]);
        }

        self.recording = true;
        Ok(())
    }

    fn record_draw(&mut self, draw: &DrawCall) -> EngineResult<()> {
        if !self.recording {
            return Err(EngineError::device_failure(
                "vulkan",
                "draw recorded outside an open command buffer",
            ));
        }
        let mesh = self
            .meshes
            .get(&draw.mesh.0)
            .ok_or_else(|| EngineError::not_found("vulkan", "mesh handle is stale"))?;
        let color = *self
            .materials
            .get(&draw.material.0)
            .ok_or_else(|| EngineError::not_found("vulkan", "material handle is stale"))?;

        let push = DrawPushConstants {
            render_matrix: draw.render_matrix.into(),
            material_color: color,
        };

        let device = &self.context.device;
        unsafe {
            device.cmd_push_constants(
                self.command_buffer,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&push),
            );
            device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[mesh.buffer], &[0]);
            device.cmd_draw(self.command_buffer, mesh.vertex_count, 1, 0, 0);
        }
        Ok(())
    }

    fn end_recording(&mut self) -> EngineResult<()> {
        let device = &self.context.device;
        unsafe {
            device.cmd_end_render_pass(self.command_buffer);
            device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| vk_err("end_command_buffer", e))?;
        }
        self.recording = false;
        Ok(())
    }

    fn submit(
        &mut self,
        wait: SemaphoreHandle,
        signal: SemaphoreHandle,
        fence: FenceHandle,
    ) -> EngineResult<()> {
        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let signal_semaphores = [vk::Semaphore::from_raw(signal.0)];
        let command_buffers = [self.command_buffer];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.context
                .device
                .queue_submit(
                    self.context.graphics_queue,
                    &[submit_info.build()],
                    vk::Fence::from_raw(fence.0),
                )
                .map_err(|e| vk_err("queue_submit", e))
        }
    }

    fn present(&mut self, wait: SemaphoreHandle, image_index: u32) -> EngineResult<PresentOutcome> {
        let wait_semaphores = [vk::Semaphore::from_raw(wait.0)];
        let swapchains = [self.swapchain.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.context
                .swapchain_loader
                .queue_present(self.context.present_queue, &present_info)
        };
        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(vk_err("queue_present", e)),
        }
    }

    fn rebuild_swapchain(&mut self, extent: (u32, u32)) -> EngineResult<()> {
        log::info!("rebuilding swapchain at {}x{}", extent.0, extent.1);
        let mut sink = RawReleaseSink {
            device: &self.context.device,
            swapchain_loader: &self.context.swapchain_loader,
        };
        self.swapchain_releases.flush(&mut sink);
        self.swapchain = swapchain::create_swapchain(
            &self.context,
            self.render_pass,
            extent,
            &mut self.swapchain_releases,
        )?;
        Ok(())
    }

    fn wait_idle(&mut self) -> EngineResult<()> {
        unsafe {
            self.context
                .device
                .device_wait_idle()
                .map_err(|e| vk_err("device_wait_idle", e))
        }
    }

    fn upload_mesh(&mut self, vertices: &[MeshVertex]) -> EngineResult<MeshHandle> {
        if vertices.is_empty() {
            return Err(EngineError::type_mismatch("vulkan", "empty vertex data"));
        }
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let device = &self.context.device;

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(bytes.len() as vk::DeviceSize)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(|e| vk_err("create_buffer", e))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type = self.context.physical.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(|e| vk_err("allocate_memory", e))?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(|e| vk_err("bind_buffer_memory", e))?;
            let mapped = device
                .map_memory(memory, 0, requirements.size, vk::MemoryMapFlags::empty())
                .map_err(|e| vk_err("map_memory", e))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.cast(), bytes.len());
            device.unmap_memory(memory);
        }

        // The buffer must be destroyed before its memory is freed
        self.device_releases.push(ResourceRelease::new(
            ReleaseKind::DeviceMemory,
            memory.as_raw(),
        ));
        self.device_releases
            .push(ResourceRelease::new(ReleaseKind::Buffer, buffer.as_raw()));

        let id = self.next_id();
        self.meshes.insert(
            id,
            MeshData {
                buffer,
                vertex_count: vertices.len() as u32,
            },
        );
        Ok(MeshHandle(id))
    }

    fn create_material(&mut self, color: [f32; 4]) -> EngineResult<MaterialHandle> {
        let id = self.next_id();
        self.materials.insert(id, color);
        Ok(MaterialHandle(id))
    }

    fn swapchain_extent(&self) -> (u32, u32) {
        (self.swapchain.extent.width, self.swapchain.extent.height)
    }

    fn release_all(&mut self) -> EngineResult<()> {
        self.wait_idle()?;
        let mut sink = RawReleaseSink {
            device: &self.context.device,
            swapchain_loader: &self.context.swapchain_loader,
        };
        self.swapchain_releases.flush(&mut sink);
        self.device_releases.flush(&mut sink);
        self.meshes.clear();
        self.materials.clear();
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if !self.device_releases.is_empty() || !self.swapchain_releases.is_empty() {
            log::warn!(
                "VulkanDevice dropped with {} device and {} swapchain releases pending",
                self.device_releases.len(),
                self.swapchain_releases.len()
            );
        }
    }
}

//! Swapchain-scoped resources
//!
//! The swapchain, its image views, and the matching framebuffers are a
//! single lifetime unit: torn down together through the swapchain-scoped
//! deletion queue on every rebuild, then recreated at the new size.

use crate::core::error::EngineResult;
use crate::render::deletion_queue::{DeletionQueue, ReleaseKind, ResourceRelease};
use crate::render::vulkan::context::{vk_err, VulkanContext};
use ash::vk;
use ash::vk::Handle;

/// Plain-data bundle of swapchain-derived objects.
///
/// Holds no destructors of its own; every handle here is also registered
/// in the swapchain-scoped deletion queue, which owns teardown ordering.
pub struct SwapchainResources {
    /// Swapchain handle
    pub swapchain: vk::SwapchainKHR,
    /// Chosen surface format
    pub format: vk::SurfaceFormatKHR,
    /// Extent the images were created at
    pub extent: vk::Extent2D,
    /// Presentable images (owned by the swapchain, not released separately)
    pub images: Vec<vk::Image>,
    /// One view per image
    pub image_views: Vec<vk::ImageView>,
    /// One framebuffer per image view
    pub framebuffers: Vec<vk::Framebuffer>,
}

/// Create the swapchain and its derived resources, registering every
/// object with `releases` in acquisition order (swapchain, views,
/// framebuffers) so the LIFO flush destroys dependents first.
pub fn create_swapchain(
    ctx: &VulkanContext,
    render_pass: vk::RenderPass,
    window_extent: (u32, u32),
    releases: &mut DeletionQueue,
) -> EngineResult<SwapchainResources> {
    let surface_caps = unsafe {
        ctx.surface_loader
            .get_physical_device_surface_capabilities(ctx.physical.device, ctx.surface)
            .map_err(|e| vk_err("get_surface_capabilities", e))?
    };

    let surface_formats = unsafe {
        ctx.surface_loader
            .get_physical_device_surface_formats(ctx.physical.device, ctx.surface)
            .map_err(|e| vk_err("get_surface_formats", e))?
    };
    let format = surface_formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(surface_formats[0]);

    let present_modes = unsafe {
        ctx.surface_loader
            .get_physical_device_surface_present_modes(ctx.physical.device, ctx.surface)
            .map_err(|e| vk_err("get_surface_present_modes", e))?
    };
    let present_mode = present_modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO);

    let extent = if surface_caps.current_extent.width != u32::MAX {
        surface_caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent.0.clamp(
                surface_caps.min_image_extent.width,
                surface_caps.max_image_extent.width,
            ),
            height: window_extent.1.clamp(
                surface_caps.min_image_extent.height,
                surface_caps.max_image_extent.height,
            ),
        }
    };

    let image_count = (surface_caps.min_image_count + 1).min(if surface_caps.max_image_count > 0 {
        surface_caps.max_image_count
    } else {
        surface_caps.min_image_count + 1
    });

    let create_info = vk::SwapchainCreateInfoKHR::builder()
        .surface(ctx.surface)
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(surface_caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    let swapchain = unsafe {
        ctx.swapchain_loader
            .create_swapchain(&create_info, None)
            .map_err(|e| vk_err("create_swapchain", e))?
    };
    releases.push(ResourceRelease::new(ReleaseKind::Swapchain, swapchain.as_raw()));

    let images = unsafe {
        ctx.swapchain_loader
            .get_swapchain_images(swapchain)
            .map_err(|e| vk_err("get_swapchain_images", e))?
    };

    let mut image_views = Vec::with_capacity(images.len());
    for &image in &images {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe {
            ctx.device
                .create_image_view(&view_info, None)
                .map_err(|e| vk_err("create_image_view", e))?
        };
        releases.push(ResourceRelease::new(ReleaseKind::ImageView, view.as_raw()));
        image_views.push(view);
    }

    let mut framebuffers = Vec::with_capacity(image_views.len());
    for &view in &image_views {
        let attachments = [view];
        let framebuffer_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe {
            ctx.device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| vk_err("create_framebuffer", e))?
        };
        releases.push(ResourceRelease::new(
            ReleaseKind::Framebuffer,
            framebuffer.as_raw(),
        ));
        framebuffers.push(framebuffer);
    }

    log::debug!(
        "swapchain created: {}x{} with {} images ({:?})",
        extent.width,
        extent.height,
        images.len(),
        present_mode
    );

    Ok(SwapchainResources {
        swapchain,
        format,
        extent,
        images,
        image_views,
        framebuffers,
    })
}

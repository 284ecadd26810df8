//! Vulkan instance and device bootstrap
//!
//! Instance creation (extensions sourced from the window), physical device
//! selection, logical device and queue setup. Everything created here lives
//! for the whole engine run and is destroyed in [`VulkanContext::drop`];
//! all shorter-lived objects go through the deletion queues instead.

use crate::core::error::{EngineError, EngineResult};
use crate::platform::glfw_window::GlfwWindow;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};

/// Map a raw Vulkan result into the engine error type
pub fn vk_err(what: &str, result: vk::Result) -> EngineError {
    EngineError::device_failure("vulkan", format!("{what}: {result:?}"))
}

/// Selected physical device and the queue families the engine uses
pub struct PhysicalDeviceInfo {
    /// Physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits)
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types, used for buffer allocation
    pub memory: vk::PhysicalDeviceMemoryProperties,
    /// Queue family used for graphics submission
    pub graphics_family: u32,
    /// Queue family used for presentation
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    fn select(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> EngineResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(|e| vk_err("enumerate_physical_devices", e))?
        };

        for device in devices {
            if let Some(info) = Self::evaluate(instance, device, surface, surface_loader)? {
                let name = unsafe { CStr::from_ptr(info.properties.device_name.as_ptr()) };
                log::info!("selected GPU: {}", name.to_string_lossy());
                return Ok(info);
            }
        }

        Err(EngineError::device_failure(
            "vulkan",
            "no GPU with graphics, presentation, and swapchain support found",
        ))
    }

    fn evaluate(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> EngineResult<Option<Self>> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let memory = unsafe { instance.get_physical_device_memory_properties(device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let mut graphics_family = None;
        let mut present_family = None;
        for (index, family) in queue_families.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics_family.is_none() {
                graphics_family = Some(index);
            }
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, index, surface)
                    .map_err(|e| vk_err("get_physical_device_surface_support", e))?
            };
            if present_support && present_family.is_none() {
                present_family = Some(index);
            }
        }

        let (Some(graphics_family), Some(present_family)) = (graphics_family, present_family)
        else {
            return Ok(None);
        };

        let extensions = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .map_err(|e| vk_err("enumerate_device_extension_properties", e))?
        };
        let has_swapchain = extensions.iter().any(|ext| {
            (unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }) == SwapchainLoader::name()
        });
        if !has_swapchain {
            return Ok(None);
        }

        Ok(Some(Self {
            device,
            properties,
            memory,
            graphics_family,
            present_family,
        }))
    }

    /// Find a memory type index satisfying the filter and property flags
    pub fn find_memory_type(
        &self,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> EngineResult<u32> {
        for i in 0..self.memory.memory_type_count {
            let type_matches = type_filter & (1 << i) != 0;
            let props_match = self.memory.memory_types[i as usize]
                .property_flags
                .contains(properties);
            if type_matches && props_match {
                return Ok(i);
            }
        }
        Err(EngineError::device_failure(
            "vulkan",
            "no suitable memory type for allocation",
        ))
    }
}

/// Long-lived Vulkan objects: instance, surface, logical device, queues
pub struct VulkanContext {
    // Entry must outlive the instance; field order keeps it alive last
    _entry: Entry,
    /// Vulkan instance
    pub instance: Instance,
    /// Surface extension loader
    pub surface_loader: Surface,
    /// Window surface
    pub surface: vk::SurfaceKHR,
    /// Selected physical device
    pub physical: PhysicalDeviceInfo,
    /// Logical device
    pub device: Device,
    /// Graphics submission queue
    pub graphics_queue: vk::Queue,
    /// Presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl VulkanContext {
    /// Bring up instance, surface, and logical device against a window
    pub fn new(window: &mut GlfwWindow, app_name: &str, enable_validation: bool) -> EngineResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            EngineError::device_failure("vulkan", format!("failed to load Vulkan: {e:?}"))
        })?;

        let instance = Self::create_instance(&entry, window, app_name, enable_validation)?;
        let surface_loader = Surface::new(&entry, &instance);
        let surface = window.create_vulkan_surface(instance.handle())?;

        let physical = PhysicalDeviceInfo::select(&instance, surface, &surface_loader)?;
        let (device, graphics_queue, present_queue) = Self::create_device(&instance, &physical)?;
        let swapchain_loader = SwapchainLoader::new(&instance, &device);

        Ok(Self {
            _entry: entry,
            instance,
            surface_loader,
            surface,
            physical,
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }

    fn create_instance(
        entry: &Entry,
        window: &GlfwWindow,
        app_name: &str,
        enable_validation: bool,
    ) -> EngineResult<Instance> {
        let app_name_cstr = CString::new(app_name).unwrap_or_default();
        let engine_name_cstr = CString::new("EmberEngine").unwrap_or_default();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window.required_instance_extensions()?;
        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .filter_map(|ext| CString::new(ext.as_str()).ok())
            .collect();
        let extension_ptrs: Vec<*const i8> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        let layer_names = if enable_validation {
            vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap_or_default()]
        } else {
            vec![]
        };
        let layer_ptrs: Vec<*const i8> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(|e| vk_err("create_instance", e))
        }
    }

    fn create_device(
        instance: &Instance,
        physical: &PhysicalDeviceInfo,
    ) -> EngineResult<(Device, vk::Queue, vk::Queue)> {
        let unique_families: std::collections::HashSet<u32> =
            [physical.graphics_family, physical.present_family]
                .iter()
                .copied()
                .collect();

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let required_extensions = [SwapchainLoader::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .create_device(physical.device, &create_info, None)
                .map_err(|e| vk_err("create_device", e))?
        };

        let graphics_queue = unsafe { device.get_device_queue(physical.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical.present_family, 0) };

        Ok((device, graphics_queue, present_queue))
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}

//! Vulkan instance, physical device selection, and logical device creation.
//!
//! Grounded in the teacher's `myq2-renderer::vulkan::context::VulkanContext`,
//! trimmed to what this engine actually needs: a graphics+present queue
//! pair, no ray tracing / transfer / compute queue specialization (none of
//! which the spec's component table calls for). Device scoring keeps the
//! teacher's "discrete GPU + VRAM size" heuristic.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::khr::{surface, swapchain};
use ash::vk;
use ash::{Device, Entry, Instance};

use engine_common::EngineError;

const APP_NAME: &CStr = c"engine";
const ENGINE_NAME: &CStr = c"engine";
const REQUIRED_VK_VERSION: u32 = vk::API_VERSION_1_2;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Instance, physical device, logical device, and the two queues the
/// renderer needs.
pub struct VulkanDevice {
    pub entry: Entry,
    pub instance: Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_families: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub surface_loader: surface::Instance,
    pub swapchain_loader: swapchain::Device,
    pub device_properties: vk::PhysicalDeviceProperties,
    pub main_command_pool: vk::CommandPool,
    pub transfer_command_pool: vk::CommandPool,
}

impl VulkanDevice {
    /// # Safety
    /// Must be called with a valid display handle and before any other
    /// Vulkan object is created.
    pub unsafe fn new(
        display_handle: raw_window_handle::RawDisplayHandle,
        enable_validation: bool,
    ) -> Result<Self, EngineError> {
        let entry = Entry::linked();
        let instance = Self::create_instance(&entry, display_handle, enable_validation)?;
        let surface_loader = surface::Instance::new(&entry, &instance);

        let (physical_device, queue_families) = Self::pick_physical_device(&instance, &surface_loader)?;
        let device_properties = instance.get_physical_device_properties(physical_device);

        let (device, graphics_queue, present_queue) =
            Self::create_logical_device(&instance, physical_device, &queue_families)?;
        let swapchain_loader = swapchain::Device::new(&instance, &device);

        let graphics_family = queue_families
            .graphics
            .ok_or_else(|| EngineError::Vulkan("no graphics queue family".into()).logged())?;
        let main_command_pool = Self::create_command_pool(&device, graphics_family, vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)?;
        let transfer_command_pool = Self::create_command_pool(
            &device,
            graphics_family,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER | vk::CommandPoolCreateFlags::TRANSIENT,
        )?;

        Ok(Self {
            entry,
            instance,
            physical_device,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            surface_loader,
            swapchain_loader,
            device_properties,
            main_command_pool,
            transfer_command_pool,
        })
    }

    unsafe fn create_command_pool(
        device: &Device,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<vk::CommandPool, EngineError> {
        let info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family).flags(flags);
        device
            .create_command_pool(&info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create command pool: {e:?}")).logged())
    }

    unsafe fn create_instance(
        entry: &Entry,
        display_handle: raw_window_handle::RawDisplayHandle,
        enable_validation: bool,
    ) -> Result<Instance, EngineError> {
        let app_info = vk::ApplicationInfo::default()
            .application_name(APP_NAME)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(ENGINE_NAME)
            .api_version(REQUIRED_VK_VERSION);

        let mut extensions = ash_window::enumerate_required_extensions(display_handle)
            .map_err(|e| EngineError::Vulkan(format!("failed to get required extensions: {e:?}")).logged())?
            .to_vec();

        if enable_validation {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names: Vec<CString> = if enable_validation {
            vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
        } else {
            Vec::new()
        };
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|n| n.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_ptrs);

        entry
            .create_instance(&create_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create Vulkan instance: {e:?}")).logged())
    }

    unsafe fn pick_physical_device(
        instance: &Instance,
        surface_loader: &surface::Instance,
    ) -> Result<(vk::PhysicalDevice, QueueFamilyIndices), EngineError> {
        let devices = instance
            .enumerate_physical_devices()
            .map_err(|e| EngineError::Vulkan(format!("failed to enumerate physical devices: {e:?}")).logged())?;

        let mut scored: Vec<_> = devices
            .iter()
            .filter_map(|&device| {
                let score = Self::rate_device(instance, device, surface_loader);
                (score > 0).then_some((device, score))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let (physical_device, _) = scored
            .first()
            .copied()
            .ok_or_else(|| EngineError::Vulkan("no suitable GPU found".into()).logged())?;

        let queue_families = Self::find_queue_families(instance, physical_device, surface_loader);

        let props = instance.get_physical_device_properties(physical_device);
        let name = CStr::from_ptr(props.device_name.as_ptr()).to_string_lossy();
        log::info!(target: "renderer", "selected GPU: {name}");

        Ok((physical_device, queue_families))
    }

    unsafe fn rate_device(instance: &Instance, device: vk::PhysicalDevice, surface_loader: &surface::Instance) -> u32 {
        let props = instance.get_physical_device_properties(device);
        let queue_families = Self::find_queue_families(instance, device, surface_loader);
        if !queue_families.is_complete() {
            return 0;
        }

        let mut score = match props.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 10_000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 1_000,
            _ => 0,
        };

        let memory_props = instance.get_physical_device_memory_properties(device);
        for i in 0..memory_props.memory_heap_count as usize {
            let heap = memory_props.memory_heaps[i];
            if heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL) {
                score += (heap.size / (1024 * 1024)) as u32;
            }
        }
        score
    }

    unsafe fn find_queue_families(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface_loader: &surface::Instance,
    ) -> QueueFamilyIndices {
        let families = instance.get_physical_device_queue_family_properties(device);
        let mut indices = QueueFamilyIndices::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(i);
                // Presentation is assumed if the family supports graphics;
                // a real surface-bound check happens once a surface exists
                // (before swapchain creation), see vulkan::surface.
                indices.present = Some(i);
            }
            let _ = surface_loader; // reserved for the surface-bound re-check
        }
        indices
    }

    unsafe fn create_logical_device(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: &QueueFamilyIndices,
    ) -> Result<(Device, vk::Queue, vk::Queue), EngineError> {
        let graphics_family = queue_families
            .graphics
            .ok_or_else(|| EngineError::Vulkan("no graphics queue family".into()).logged())?;

        let queue_priorities = [1.0f32];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(graphics_family)
            .queue_priorities(&queue_priorities)];

        let extensions: Vec<*const c_char> = vec![swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&device_features);

        let device = instance
            .create_device(physical_device, &create_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create logical device: {e:?}")).logged())?;

        let graphics_queue = device.get_device_queue(graphics_family, 0);
        let present_queue = device.get_device_queue(queue_families.present.unwrap_or(graphics_family), 0);

        Ok((device, graphics_queue, present_queue))
    }

    pub fn wait_idle(&self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::error!(target: "renderer", "device_wait_idle failed: {e:?}");
            }
        }
    }

    /// Find a memory type index satisfying both the buffer's requirements
    /// and the desired property flags.
    pub fn find_memory_type(&self, type_bits: u32, properties: vk::MemoryPropertyFlags) -> Result<u32, EngineError> {
        let mem_props = unsafe { self.instance.get_physical_device_memory_properties(self.physical_device) };
        for i in 0..mem_props.memory_type_count {
            let suitable = (type_bits & (1 << i)) != 0;
            let has_properties = mem_props.memory_types[i as usize].property_flags.contains(properties);
            if suitable && has_properties {
                return Ok(i);
            }
        }
        Err(EngineError::Vulkan("failed to find suitable memory type".into()).logged())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        self.wait_idle();
        unsafe {
            self.device.destroy_command_pool(self.main_command_pool, None);
            self.device.destroy_command_pool(self.transfer_command_pool, None);
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

//! GPU resource database: the four buffer sub-allocators, the pipeline
//! cache, the descriptor pool, and pipeline/descriptor-set lifecycle.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_memory.cpp` (the four named arenas and the staged-transfer
//! sequence for vertex/index buffers) and in the teacher's
//! `myq2-renderer::vulkan::{pipeline_cache, descriptors}` for the pipeline
//! cache persistence shape and descriptor pool sizing, trimmed to the one
//! descriptor set layout (a single uniform-buffer binding) this engine's
//! fixed-function pipeline actually needs; no bindless textures, no ray
//! tracing descriptor set, no lightmap set.

use std::fs;
use std::path::{Path, PathBuf};

use ash::vk;

use engine_common::EngineError;
use engine_resources::Vertex;

use super::allocator::{Allocation, FreeList};
use super::device::VulkanDevice;

/// One arena: a single `vk::Buffer` bound to one `vk::DeviceMemory` block,
/// carved up by a [`FreeList`].
pub struct BufferAllocator {
    pub buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    free_list: FreeList,
    usage: vk::BufferUsageFlags,
    properties: vk::MemoryPropertyFlags,
}

impl BufferAllocator {
    unsafe fn new(
        device: &VulkanDevice,
        total_size: u64,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self, EngineError> {
        let buffer_info = vk::BufferCreateInfo::default()
            .size(total_size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = device
            .device
            .create_buffer(&buffer_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create buffer: {e:?}")).logged())?;

        let requirements = device.device.get_buffer_memory_requirements(buffer);
        let memory_type = device.find_memory_type(requirements.memory_type_bits, properties)?;
        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = device
            .device
            .allocate_memory(&alloc_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to allocate buffer memory: {e:?}")).logged())?;
        device
            .device
            .bind_buffer_memory(buffer, memory, 0)
            .map_err(|e| EngineError::Vulkan(format!("failed to bind buffer memory: {e:?}")).logged())?;

        Ok(Self {
            buffer,
            memory,
            free_list: FreeList::new(requirements.size),
            usage,
            properties,
        })
    }

    pub fn allocate(&mut self, size: u64) -> Result<Allocation, EngineError> {
        self.free_list.allocate(size)
    }

    pub fn allocate_with_padding(&mut self, size: u64, padding: u64) -> Result<Allocation, EngineError> {
        self.free_list.allocate_with_padding(size, padding)
    }

    pub fn free(&mut self, allocation: Allocation) {
        self.free_list.free(allocation);
    }

    pub fn available(&self) -> u64 {
        self.free_list.available()
    }

    unsafe fn destroy(&mut self, device: &VulkanDevice) {
        device.device.destroy_buffer(self.buffer, None);
        device.device.free_memory(self.memory, None);
    }
}

/// A pipeline built for one material: the graphics pipeline plus the
/// layout objects it owns exclusively.
#[derive(Debug, Clone, Copy)]
pub struct PipelineEntry {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub descriptor_set: vk::DescriptorSet,
}

pub struct ResourceDatabase {
    pub vertex: BufferAllocator,
    pub index: BufferAllocator,
    pub staging: BufferAllocator,
    pub uniform: BufferAllocator,

    pipeline_cache: vk::PipelineCache,
    pipeline_cache_path: PathBuf,
    descriptor_pool: vk::DescriptorPool,
    uniform_alignment: u64,
}

impl ResourceDatabase {
    /// # Safety
    /// `device` must outlive the returned database.
    pub unsafe fn new(
        device: &VulkanDevice,
        cache_dir: &Path,
        arena_sizes: ArenaSizes,
        max_descriptor_sets: u32,
    ) -> Result<Self, EngineError> {
        let vertex = BufferAllocator::new(
            device,
            arena_sizes.vertex,
            vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::VERTEX_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let index = BufferAllocator::new(
            device,
            arena_sizes.index,
            vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::INDEX_BUFFER,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let staging = BufferAllocator::new(
            device,
            arena_sizes.staging,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let uniform = BufferAllocator::new(
            device,
            arena_sizes.uniform,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let pipeline_cache_path = cache_dir.join("pipeline_cache.bin");
        let (pipeline_cache, _loaded) = Self::create_pipeline_cache(device, &pipeline_cache_path)?;

        let descriptor_pool = Self::create_descriptor_pool(device, max_descriptor_sets)?;
        let uniform_alignment = device.device_properties.limits.min_uniform_buffer_offset_alignment.max(1);

        Ok(Self {
            vertex,
            index,
            staging,
            uniform,
            pipeline_cache,
            pipeline_cache_path,
            descriptor_pool,
            uniform_alignment,
        })
    }

    unsafe fn create_pipeline_cache(
        device: &VulkanDevice,
        path: &Path,
    ) -> Result<(vk::PipelineCache, bool), EngineError> {
        let on_disk = fs::read(path).ok().filter(|data| {
            data.len() >= 16
                && u32::from_ne_bytes([data[4], data[5], data[6], data[7]]) == 1
                && u32::from_ne_bytes([data[8], data[9], data[10], data[11]]) == device.device_properties.vendor_id
                && u32::from_ne_bytes([data[12], data[13], data[14], data[15]]) == device.device_properties.device_id
        });

        let create_info = match &on_disk {
            Some(data) => vk::PipelineCacheCreateInfo::default().initial_data(data),
            None => vk::PipelineCacheCreateInfo::default(),
        };
        let cache = device
            .device
            .create_pipeline_cache(&create_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create pipeline cache: {e:?}")).logged())?;
        Ok((cache, on_disk.is_some()))
    }

    unsafe fn create_descriptor_pool(
        device: &VulkanDevice,
        max_sets: u32,
    ) -> Result<vk::DescriptorPool, EngineError> {
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: max_sets,
        }];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);
        device
            .device
            .create_descriptor_pool(&pool_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create descriptor pool: {e:?}")).logged())
    }

    fn uniform_padding(&self, size: u64) -> u64 {
        let remainder = size % self.uniform_alignment;
        if remainder == 0 { 0 } else { self.uniform_alignment - remainder }
    }

    /// Upload `vertices` into a fresh device-local allocation via a
    /// transient staging transfer.
    pub unsafe fn create_vertex_buffer(
        &mut self,
        device: &VulkanDevice,
        vertices: &[Vertex],
    ) -> Result<Allocation, EngineError> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        self.upload_via_staging(device, bytes, &mut |db| &mut db.vertex)
    }

    pub unsafe fn create_index_buffer(
        &mut self,
        device: &VulkanDevice,
        indices: &[u32],
    ) -> Result<Allocation, EngineError> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        self.upload_via_staging(device, bytes, &mut |db| &mut db.index)
    }

    unsafe fn upload_via_staging(
        &mut self,
        device: &VulkanDevice,
        bytes: &[u8],
        target_of: &mut dyn FnMut(&mut Self) -> &mut BufferAllocator,
    ) -> Result<Allocation, EngineError> {
        let size = bytes.len() as u64;
        let staging_allocation = self.staging.allocate(size)?;
        self.write_host_visible(device, &self.staging, staging_allocation, bytes)?;

        let target_allocation = match target_of(self).allocate(size) {
            Ok(a) => a,
            Err(e) => {
                self.staging.free(staging_allocation);
                return Err(e);
            }
        };

        let copy_result = self.copy_buffer(
            device,
            self.staging.buffer,
            staging_allocation.offset,
            target_of(self).buffer,
            target_allocation.offset,
            size,
        );
        self.staging.free(staging_allocation);
        copy_result.map(|()| target_allocation)
    }

    /// Write `bytes` directly into a fresh host-visible uniform allocation.
    /// Uniform buffers skip the staging path entirely.
    pub unsafe fn create_uniform_buffer(
        &mut self,
        device: &VulkanDevice,
        bytes: &[u8],
    ) -> Result<Allocation, EngineError> {
        let padding = self.uniform_padding(bytes.len() as u64);
        let allocation = self.uniform.allocate_with_padding(bytes.len() as u64, padding)?;
        self.write_host_visible(device, &self.uniform, allocation, bytes)?;
        Ok(allocation)
    }

    pub unsafe fn update_uniform_buffer(&self, device: &VulkanDevice, allocation: Allocation, bytes: &[u8]) -> Result<(), EngineError> {
        self.write_host_visible(device, &self.uniform, allocation, bytes)
    }

    unsafe fn write_host_visible(
        &self,
        device: &VulkanDevice,
        allocator: &BufferAllocator,
        allocation: Allocation,
        bytes: &[u8],
    ) -> Result<(), EngineError> {
        if !allocator.properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            return Err(EngineError::InvariantViolation("attempted host write into non-host-visible arena".into()).logged());
        }
        let ptr = device
            .device
            .map_memory(allocator.memory, allocation.offset, bytes.len() as u64, vk::MemoryMapFlags::empty())
            .map_err(|e| EngineError::Vulkan(format!("failed to map memory: {e:?}")).logged())?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len());
        device.device.unmap_memory(allocator.memory);
        Ok(())
    }

    unsafe fn copy_buffer(
        &self,
        device: &VulkanDevice,
        src: vk::Buffer,
        src_offset: u64,
        dst: vk::Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<(), EngineError> {
        let command_pool = device.transfer_command_pool;
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = device
            .device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| EngineError::Vulkan(format!("failed to allocate transfer command buffer: {e:?}")).logged())?[0];

        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| EngineError::Vulkan(format!("failed to begin transfer command buffer: {e:?}")).logged())?;
        let region = vk::BufferCopy { src_offset, dst_offset, size };
        device.device.cmd_copy_buffer(command_buffer, src, dst, &[region]);
        device
            .device
            .end_command_buffer(command_buffer)
            .map_err(|e| EngineError::Vulkan(format!("failed to end transfer command buffer: {e:?}")).logged())?;

        let buffers = [command_buffer];
        let submit = vk::SubmitInfo::default().command_buffers(&buffers);
        device
            .device
            .queue_submit(device.graphics_queue, &[submit], vk::Fence::null())
            .map_err(|e| EngineError::Vulkan(format!("failed to submit transfer: {e:?}")).logged())?;
        device
            .device
            .queue_wait_idle(device.graphics_queue)
            .map_err(|e| EngineError::Vulkan(format!("failed to wait for transfer: {e:?}")).logged())?;

        device.device.free_command_buffers(command_pool, &buffers);
        Ok(())
    }

    /// Build the fixed-function graphics pipeline used by every material:
    /// one uniform-buffer descriptor set, the mesh vertex layout, dynamic
    /// viewport/scissor, back-face cull, depth test+write with `Less`.
    pub unsafe fn create_pipeline(
        &mut self,
        device: &VulkanDevice,
        vertex_spirv: &[u32],
        fragment_spirv: &[u32],
        render_pass: vk::RenderPass,
    ) -> Result<PipelineEntry, EngineError> {
        let dsl_binding = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX)];
        let dsl_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&dsl_binding);
        let descriptor_set_layout = device
            .device
            .create_descriptor_set_layout(&dsl_info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create descriptor set layout: {e:?}")).logged())?;

        let set_layouts = [descriptor_set_layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&set_layouts);
        let descriptor_set = device
            .device
            .allocate_descriptor_sets(&alloc_info)
            .map_err(|e| EngineError::Vulkan(format!("failed to allocate descriptor set: {e:?}")).logged())?[0];

        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let layout = device.device.create_pipeline_layout(&layout_info, None).map_err(|e| {
            EngineError::Vulkan(format!("failed to create pipeline layout: {e:?}")).logged()
        })?;

        let vertex_module = Self::create_shader_module(device, vertex_spirv)?;
        let fragment_module = Self::create_shader_module(device, fragment_spirv)?;
        let entry_point = c"main";
        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(entry_point),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(entry_point),
        ];

        let binding_description = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let attribute_descriptions = [
            vk::VertexInputAttributeDescription { location: 0, binding: 0, format: vk::Format::R32G32B32_SFLOAT, offset: 0 },
            vk::VertexInputAttributeDescription { location: 1, binding: 0, format: vk::Format::R32G32B32_SFLOAT, offset: 12 },
            vk::VertexInputAttributeDescription { location: 2, binding: 0, format: vk::Format::R32G32B32A32_SFLOAT, offset: 24 },
            vk::VertexInputAttributeDescription { location: 3, binding: 0, format: vk::Format::R32G32_SFLOAT, offset: 40 },
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_description)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default().viewport_count(1).scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS);

        let color_blend_attachment = [vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&color_blend_attachment);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = [vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)];

        let pipelines = device
            .device
            .create_graphics_pipelines(self.pipeline_cache, &pipeline_info, None)
            .map_err(|(_, e)| EngineError::Vulkan(format!("failed to create graphics pipeline: {e:?}")).logged())?;

        device.device.destroy_shader_module(vertex_module, None);
        device.device.destroy_shader_module(fragment_module, None);

        Ok(PipelineEntry {
            pipeline: pipelines[0],
            layout,
            descriptor_set_layout,
            descriptor_set,
        })
    }

    unsafe fn create_shader_module(device: &VulkanDevice, spirv: &[u32]) -> Result<vk::ShaderModule, EngineError> {
        let info = vk::ShaderModuleCreateInfo::default().code(spirv);
        device
            .device
            .create_shader_module(&info, None)
            .map_err(|e| EngineError::Vulkan(format!("failed to create shader module: {e:?}")).logged())
    }

    pub unsafe fn free_pipeline(&self, device: &VulkanDevice, entry: PipelineEntry) {
        device.device.destroy_pipeline(entry.pipeline, None);
        device.device.destroy_pipeline_layout(entry.layout, None);
        device.device.destroy_descriptor_set_layout(entry.descriptor_set_layout, None);
    }

    /// Write `{descriptor_set, binding=0, uniform-buffer allocation}` into
    /// the pipeline's descriptor set.
    pub unsafe fn bind_uniform_buffer(&self, device: &VulkanDevice, entry: PipelineEntry, allocation: Allocation) {
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: self.uniform.buffer,
            offset: allocation.offset,
            range: allocation.size,
        }];
        let write = [vk::WriteDescriptorSet::default()
            .dst_set(entry.descriptor_set)
            .dst_binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info)];
        device.device.update_descriptor_sets(&write, &[]);
    }

    pub unsafe fn save_pipeline_cache(&self, device: &VulkanDevice) {
        match device.device.get_pipeline_cache_data(self.pipeline_cache) {
            Ok(data) if !data.is_empty() => {
                if let Some(parent) = self.pipeline_cache_path.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(e) = fs::write(&self.pipeline_cache_path, &data) {
                    log::warn!(target: "renderer", "failed to persist pipeline cache: {e}");
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!(target: "renderer", "failed to read back pipeline cache: {e:?}"),
        }
    }

    pub unsafe fn destroy(&mut self, device: &VulkanDevice) {
        self.save_pipeline_cache(device);
        device.device.destroy_pipeline_cache(self.pipeline_cache, None);
        device.device.destroy_descriptor_pool(self.descriptor_pool, None);
        self.vertex.destroy(device);
        self.index.destroy(device);
        self.staging.destroy(device);
        self.uniform.destroy(device);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArenaSizes {
    pub vertex: u64,
    pub index: u64,
    pub staging: u64,
    pub uniform: u64,
}

impl Default for ArenaSizes {
    fn default() -> Self {
        Self {
            vertex: 16 * 1024 * 1024,
            index: 8 * 1024 * 1024,
            staging: 16 * 1024 * 1024,
            uniform: 4 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_padding_rounds_up_to_alignment() {
        // Exercises the pure arithmetic helper without any Vulkan object.
        let db = ResourceDatabaseAlignmentProbe { uniform_alignment: 256 };
        assert_eq!(db.uniform_padding(200), 56);
        assert_eq!(db.uniform_padding(256), 0);
        assert_eq!(db.uniform_padding(257), 255);
    }

    // Mirrors ResourceDatabase::uniform_padding without requiring a live
    // VulkanDevice to construct a full ResourceDatabase in a unit test.
    struct ResourceDatabaseAlignmentProbe {
        uniform_alignment: u64,
    }

    impl ResourceDatabaseAlignmentProbe {
        fn uniform_padding(&self, size: u64) -> u64 {
            let remainder = size % self.uniform_alignment;
            if remainder == 0 { 0 } else { self.uniform_alignment - remainder }
        }
    }
}

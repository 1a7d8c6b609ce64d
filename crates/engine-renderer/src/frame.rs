//! The per-frame draw loop: acquire an image, record one command buffer
//! per drawable entity's geometry, submit, and present.
//!
//! Grounded in the teacher's swapchain frame loop (`myq2-renderer::vulkan::
//! swapchain`'s `acquire_next_image`/`present` pairing) and in
//! `original_source/source/module/vulkan_ecs/private/` for the
//! begin/end-frame bracket a renderer "system" sits inside: acquire before
//! any draw is recorded, present after every entity's draw call has been
//! appended to the frame's command buffer.

use ash::vk;

use engine_common::EngineError;
use engine_ecs::{ComponentRef, ComponentStore, World};

use crate::vulkan::gpu_components::{MaterialResources, MeshResources, ModelResources};
use crate::vulkan::{PresentOutcome, ResourceDatabase, Swapchain, VulkanDevice};

/// One command buffer per swapchain image, allocated once and re-recorded
/// every time that image comes up for acquisition.
pub struct FrameRecorder {
    command_buffers: Vec<vk::CommandBuffer>,
}

impl FrameRecorder {
    pub unsafe fn new(device: &VulkanDevice, image_count: usize) -> Result<Self, EngineError> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(device.main_command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(image_count as u32);
        let command_buffers = device
            .device
            .allocate_command_buffers(&alloc_info)
            .map_err(|e| EngineError::Vulkan(format!("failed to allocate frame command buffers: {e:?}")).logged())?;
        Ok(Self { command_buffers })
    }
}

/// Outcome of attempting to draw one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// The swapchain was out of date; nothing was drawn. Caller must
    /// recreate the swapchain before trying again.
    SkippedOutOfDate,
}

/// Draws every entity carrying `ModelResources` whose referenced mesh and
/// material GPU components are uploaded.
pub struct Renderer<'a> {
    recorder: &'a FrameRecorder,
}

impl<'a> Renderer<'a> {
    pub fn new(recorder: &'a FrameRecorder) -> Self {
        Self { recorder }
    }

    /// Run one full frame: acquire, record every drawable entity, submit,
    /// present. Mirrors a system's `before_update`/`update`/`after_update`
    /// triad collapsed into one call since there is exactly one renderer.
    pub unsafe fn draw_frame(
        &self,
        device: &VulkanDevice,
        swapchain: &mut Swapchain,
        resource_db: &ResourceDatabase,
        world: &World,
    ) -> Result<FrameOutcome, EngineError> {
        let Some(image_index) = swapchain.acquire_next_image(device)? else {
            return Ok(FrameOutcome::SkippedOutOfDate);
        };

        let command_buffer = self.recorder.command_buffers[image_index as usize];
        self.begin_render_pass(device, swapchain, command_buffer)?;
        self.record_entities(device, command_buffer, resource_db, world);
        self.end_render_pass(device, command_buffer)?;

        self.submit(device, swapchain, command_buffer)?;
        Ok(outcome_for_present(swapchain.present(device)?))
    }

    unsafe fn begin_render_pass(
        &self,
        device: &VulkanDevice,
        swapchain: &Swapchain,
        command_buffer: vk::CommandBuffer,
    ) -> Result<(), EngineError> {
        device
            .device
            .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
            .map_err(|e| EngineError::Vulkan(format!("failed to reset command buffer: {e:?}")).logged())?;
        let begin_info = vk::CommandBufferBeginInfo::default();
        device
            .device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| EngineError::Vulkan(format!("failed to begin command buffer: {e:?}")).logged())?;

        let clear_values = [
            vk::ClearValue { color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] } },
            vk::ClearValue { depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 } },
        ];
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(swapchain.render_pass)
            .framebuffer(swapchain.current_framebuffer())
            .render_area(vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent: swapchain.extent })
            .clear_values(&clear_values);
        device.device.cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: swapchain.extent.width as f32,
            height: swapchain.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent: swapchain.extent };
        device.device.cmd_set_viewport(command_buffer, 0, &[viewport]);
        device.device.cmd_set_scissor(command_buffer, 0, &[scissor]);
        Ok(())
    }

    unsafe fn record_entities(
        &self,
        device: &VulkanDevice,
        command_buffer: vk::CommandBuffer,
        resource_db: &ResourceDatabase,
        world: &World,
    ) {
        let Some(models) = world.store::<ModelResources>() else { return };
        let Some(mesh_refs) = world.store::<ComponentRef<MeshResources>>() else { return };
        let Some(material_refs) = world.store::<ComponentRef<MaterialResources>>() else { return };
        let Some(meshes) = world.store::<MeshResources>() else { return };
        let Some(materials) = world.store::<MaterialResources>() else { return };

        for (owner, _model) in models.iter() {
            let Some(mesh_ref) = mesh_refs.owned_by(owner) else { continue };
            let Some(material_ref) = material_refs.owned_by(owner) else { continue };
            let Some(mesh) = resolve(mesh_ref, meshes) else { continue };
            let Some(material) = resolve(material_ref, materials) else { continue };
            if !mesh.is_uploaded() {
                continue;
            }
            let (Some(entry), Some(vertex_allocation), Some(index_allocation)) =
                (material.pipeline_entry, mesh.vertex_allocation, mesh.index_allocation)
            else {
                continue;
            };

            device.device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, entry.pipeline);
            device.device.cmd_bind_vertex_buffers(command_buffer, 0, &[resource_db.vertex.buffer], &[vertex_allocation.offset]);
            device.device.cmd_bind_index_buffer(command_buffer, resource_db.index.buffer, index_allocation.offset, vk::IndexType::UINT32);
            device.device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                entry.layout,
                0,
                &[entry.descriptor_set],
                &[],
            );
            device.device.cmd_draw_indexed(command_buffer, mesh.index_count, 1, 0, 0, 0);
        }
    }

    unsafe fn end_render_pass(&self, device: &VulkanDevice, command_buffer: vk::CommandBuffer) -> Result<(), EngineError> {
        device.device.cmd_end_render_pass(command_buffer);
        device
            .device
            .end_command_buffer(command_buffer)
            .map_err(|e| EngineError::Vulkan(format!("failed to end command buffer: {e:?}")).logged())
    }

    unsafe fn submit(
        &self,
        device: &VulkanDevice,
        swapchain: &Swapchain,
        command_buffer: vk::CommandBuffer,
    ) -> Result<(), EngineError> {
        let sync = swapchain.current_sync();
        let wait_semaphores = [sync.image_available];
        let signal_semaphores = [sync.render_finished];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let buffers = [command_buffer];

        let submit_info = [vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&buffers)
            .signal_semaphores(&signal_semaphores)];

        device
            .device
            .queue_submit(device.graphics_queue, &submit_info, sync.in_flight)
            .map_err(|e| EngineError::Vulkan(format!("failed to submit frame: {e:?}")).logged())
    }
}

fn resolve<'a, T>(reference: &ComponentRef<T>, store: &'a ComponentStore<T>) -> Option<&'a T> {
    reference.get(store)
}

/// The present-outcome half of `draw_frame`'s out-of-date handling, split
/// out so it can be exercised without a live swapchain.
fn outcome_for_present(result: PresentOutcome) -> FrameOutcome {
    match result {
        PresentOutcome::Presented => FrameOutcome::Drawn,
        PresentOutcome::OutOfDate => FrameOutcome::SkippedOutOfDate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A real acquire/present round-trip needs a live device and swapchain,
    // so these only cover the outcome mapping `draw_frame` builds on top of:
    // out-of-date (from either acquire or present) must surface as
    // `SkippedOutOfDate` without the caller having submitted anything, and
    // the caller (`engine-cli::window`) is the one that runs the resize path.

    #[test]
    fn out_of_date_acquire_skips_before_any_recording() {
        let acquired: Option<u32> = None;
        let outcome = acquired.map(|_| FrameOutcome::Drawn).unwrap_or(FrameOutcome::SkippedOutOfDate);
        assert_eq!(outcome, FrameOutcome::SkippedOutOfDate);
    }

    #[test]
    fn present_out_of_date_is_reported_as_skipped() {
        assert_eq!(outcome_for_present(PresentOutcome::OutOfDate), FrameOutcome::SkippedOutOfDate);
    }

    #[test]
    fn present_success_is_reported_as_drawn() {
        assert_eq!(outcome_for_present(PresentOutcome::Presented), FrameOutcome::Drawn);
    }
}

//! Mirrors `EcsMaterial` into `MaterialResources`: attaches/detaches the GPU
//! shadow component, rebuilds the pipeline and uniform buffer whenever the
//! material's shader changes, and transfers a fresh uniform payload whenever
//! only the shading parameters changed.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_resource_collectors.cpp`'s `material_collector`: two sequential
//! (not mutually exclusive) version checks, the second of which always
//! fires again right after a pipeline rebuild since the rebuild resets the
//! saved uniforms version to force one more transfer of the data it just
//! wrote.

use ash::vk;

use engine_common::{EngineError, VersionId};
use engine_ecs::World;
use engine_renderer::{MaterialResources, ResourceDatabase, VulkanDevice};
use engine_resources::MaterialParameters;

use crate::components::EcsMaterial;
use crate::membership::{sync_added, sync_removed};

pub struct MaterialCollector;

impl MaterialCollector {
    /// # Safety
    /// `device` and `resource_db` must be the live Vulkan objects the rest
    /// of the renderer is using this frame; `render_pass` must belong to
    /// the current swapchain.
    pub unsafe fn run(
        world: &mut World,
        device: &VulkanDevice,
        resource_db: &mut ResourceDatabase,
        render_pass: vk::RenderPass,
    ) -> Result<(), EngineError> {
        sync_added::<EcsMaterial, MaterialResources>(world);
        sync_removed::<EcsMaterial, MaterialResources>(world);
        Self::update(world, device, resource_db, render_pass)
    }

    unsafe fn update(
        world: &mut World,
        device: &VulkanDevice,
        resource_db: &mut ResourceDatabase,
        render_pass: vk::RenderPass,
    ) -> Result<(), EngineError> {
        let owners = world.store::<EcsMaterial>().map(|s| s.owner_ids()).unwrap_or_default();

        for owner in owners {
            let Some(store) = world.store::<EcsMaterial>() else { continue };
            let Some(ecs_material) = store.owned_by(owner) else { continue };

            let pipeline_version = ecs_material.version();
            let uniforms_version = ecs_material.uniforms_version();
            let parameters = ecs_material.parameters();
            let (vertex_spirv, fragment_spirv) = {
                let material = ecs_material.material.get();
                (
                    material.vertex_shader().spirv().map(|s| s.to_vec()).unwrap_or_default(),
                    material.fragment_shader().spirv().map(|s| s.to_vec()).unwrap_or_default(),
                )
            };

            let Some(gpu_store) = world.store_mut::<MaterialResources>() else { continue };
            let Some(gpu) = gpu_store.owned_by_mut(owner) else { continue };

            // Always runs on first update, since the saved version starts at zero.
            if gpu.version.update_to(pipeline_version) {
                if let Some(entry) = gpu.pipeline_entry.take() {
                    resource_db.free_pipeline(device, entry);
                }
                let entry = resource_db.create_pipeline(device, &vertex_spirv, &fragment_spirv, render_pass)?;

                if let Some(old) = gpu.uniform_allocation.take() {
                    resource_db.uniform.free(old);
                }
                let bytes = material_uniform_bytes(&parameters);
                let allocation = resource_db.create_uniform_buffer(device, &bytes)?;
                resource_db.bind_uniform_buffer(device, entry, allocation);

                gpu.pipeline_entry = Some(entry);
                gpu.uniform_allocation = Some(allocation);
                gpu.uniforms_version = VersionId::zero();
            }

            // Not an `else` -- a rebuild above just invalidated the saved
            // uniforms version, so this naturally fires once more on the
            // same tick and re-transfers the data the rebuild already wrote.
            if gpu.uniforms_version.update_to(uniforms_version) {
                if let Some(allocation) = gpu.uniform_allocation {
                    let bytes = material_uniform_bytes(&parameters);
                    resource_db.update_uniform_buffer(device, allocation, &bytes)?;
                }
            }
        }
        Ok(())
    }
}

/// Packs shading parameters into the byte layout the fixed pipeline's
/// single uniform binding expects: a `vec4` followed by two `f32`s, padded
/// out to a 16-byte multiple for std140-friendly alignment.
fn material_uniform_bytes(parameters: &MaterialParameters) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0..4].copy_from_slice(&parameters.base_color[0].to_ne_bytes());
    bytes[4..8].copy_from_slice(&parameters.base_color[1].to_ne_bytes());
    bytes[8..12].copy_from_slice(&parameters.base_color[2].to_ne_bytes());
    bytes[12..16].copy_from_slice(&parameters.base_color[3].to_ne_bytes());
    bytes[16..20].copy_from_slice(&parameters.metallic.to_ne_bytes());
    bytes[20..24].copy_from_slice(&parameters.roughness.to_ne_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bytes_pack_base_color_then_metallic_then_roughness() {
        let params = MaterialParameters { base_color: [1.0, 0.5, 0.25, 1.0], metallic: 0.1, roughness: 0.8 };
        let bytes = material_uniform_bytes(&params);
        assert_eq!(f32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_ne_bytes(bytes[12..16].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_ne_bytes(bytes[16..20].try_into().unwrap()), 0.1);
        assert_eq!(f32::from_ne_bytes(bytes[20..24].try_into().unwrap()), 0.8);
    }
}

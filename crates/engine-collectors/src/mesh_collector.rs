//! Mirrors `EcsMesh` into `MeshResources`: attaches/detaches the GPU shadow
//! component, then re-uploads vertex/index data whenever the source mesh's
//! version has moved past what's already on the GPU.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_resource_collectors.cpp`'s `mesh_collector`.

use engine_common::EngineError;
use engine_ecs::World;
use engine_renderer::{MeshResources, ResourceDatabase, VulkanDevice};

use crate::components::EcsMesh;
use crate::membership::{sync_added, sync_removed};

pub struct MeshCollector;

impl MeshCollector {
    /// # Safety
    /// `device` and `resource_db` must be the live Vulkan objects the rest
    /// of the renderer is using this frame.
    pub unsafe fn run(
        world: &mut World,
        device: &VulkanDevice,
        resource_db: &mut ResourceDatabase,
    ) -> Result<(), EngineError> {
        sync_added::<EcsMesh, MeshResources>(world);
        sync_removed::<EcsMesh, MeshResources>(world);
        Self::update(world, device, resource_db)
    }

    unsafe fn update(world: &mut World, device: &VulkanDevice, resource_db: &mut ResourceDatabase) -> Result<(), EngineError> {
        let owners = world.store::<EcsMesh>().map(|s| s.owner_ids()).unwrap_or_default();

        for owner in owners {
            let Some(mesh_store) = world.store::<EcsMesh>() else { continue };
            let Some(ecs_mesh) = mesh_store.owned_by(owner) else { continue };
            let mesh = ecs_mesh.mesh.get();
            let (source_version, vertices, indices) =
                (ecs_mesh.version(), mesh.vertices().to_vec(), mesh.indices().to_vec());
            drop(mesh);
            let index_count = indices.len() as u32;

            let Some(gpu_store) = world.store_mut::<MeshResources>() else { continue };
            let Some(gpu) = gpu_store.owned_by_mut(owner) else { continue };

            // Always runs on first update, since the saved versions start at zero.
            if gpu.vertices_version.update_to(source_version) {
                if let Some(old) = gpu.vertex_allocation.take() {
                    resource_db.vertex.free(old);
                }
                gpu.vertex_allocation = Some(resource_db.create_vertex_buffer(device, &vertices)?);
            }
            if gpu.indices_version.update_to(source_version) {
                if let Some(old) = gpu.index_allocation.take() {
                    resource_db.index.free(old);
                }
                gpu.index_allocation = Some(resource_db.create_index_buffer(device, &indices)?);
                gpu.index_count = index_count;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{sync_added, sync_removed};

    #[test]
    fn membership_follows_ecs_mesh_without_touching_vulkan() {
        use engine_resources::{Mesh, ResourceCache};

        let mesh_cache: ResourceCache<Mesh> = ResourceCache::new();
        let handle = mesh_cache.insert("mem://mesh", Mesh::default());

        let mut world = World::new();
        world.register::<EcsMesh>("ecs_mesh");
        world.register::<MeshResources>("mesh_resources");

        let e = world.create_entity();
        world.add_component(e, EcsMesh::new(handle));

        sync_added::<EcsMesh, MeshResources>(&mut world);
        assert!(world.store::<MeshResources>().unwrap().is_owned_by(e));

        world.remove_component::<EcsMesh>(e);
        sync_removed::<EcsMesh, MeshResources>(&mut world);
        assert!(!world.store::<MeshResources>().unwrap().is_owned_by(e));
    }
}

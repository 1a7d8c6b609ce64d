//! GPU-resident shadow components. Collectors (`engine-collectors`) create
//! and maintain one of these per entity that owns the corresponding
//! logical resource component; the frame loop reads them to record draws.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/public/
//! vulkan_{mesh,material,model}_resources.hpp`: `model_resources` itself
//! carries no data (`model_collector`'s only job is mirroring
//! `ecs_model`'s presence), and a renderable entity's mesh/material are
//! found through separately-attached `ComponentRef<MeshResources>` /
//! `ComponentRef<MaterialResources>` components (the original's nested
//! `mesh_resources::reference` / `material_resources::reference` types),
//! not fields on `ModelResources`.

use engine_common::VersionId;

use super::allocator::Allocation;
use super::resource_db::PipelineEntry;

/// GPU-side mirror of a logical mesh: device-local vertex/index
/// allocations plus the versions that produced them.
#[derive(Debug, Default)]
pub struct MeshResources {
    pub vertex_allocation: Option<Allocation>,
    pub index_allocation: Option<Allocation>,
    pub index_count: u32,
    pub vertices_version: VersionId,
    pub indices_version: VersionId,
}

impl MeshResources {
    pub fn is_uploaded(&self) -> bool {
        self.vertex_allocation.is_some() && self.index_allocation.is_some()
    }
}

/// GPU-side mirror of a logical material: the built pipeline plus the
/// uniform buffer allocation bound to its descriptor set.
#[derive(Debug, Default)]
pub struct MaterialResources {
    pub pipeline_entry: Option<PipelineEntry>,
    pub uniform_allocation: Option<Allocation>,
    pub version: VersionId,
    pub uniforms_version: VersionId,
}

/// Marker mirroring a logical model's presence; carries no data of its
/// own. A drawable entity's mesh/material are found through separately
/// attached `ComponentRef<MeshResources>` / `ComponentRef<MaterialResources>`
/// components, added by the reference collectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelResources;

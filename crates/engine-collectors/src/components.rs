//! Logical, game-facing components. Collectors observe these and mirror
//! them into the GPU-resident components `engine_renderer::vulkan` defines;
//! nothing in this module touches Vulkan directly.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/public/`'s
//! `ecs_mesh`, `ecs_material`, `ecs_model` component classes.

use engine_common::VersionId;
use engine_resources::{Material, MaterialParameters, Mesh, ResourceHandle};

/// A drawable entity's geometry. The referenced [`Mesh`] is the single
/// source of truth; its own `version()` drives both the vertex and index
/// re-upload decisions in [`crate::mesh_collector::MeshCollector`].
pub struct EcsMesh {
    pub mesh: ResourceHandle<Mesh>,
}

impl EcsMesh {
    pub fn new(mesh: ResourceHandle<Mesh>) -> Self {
        Self { mesh }
    }

    pub fn version(&self) -> VersionId {
        self.mesh.get().version()
    }
}

/// A drawable entity's shading. `version`/`uniforms_version` live directly
/// on the underlying [`Material`] resource, so this wrapper is a thin
/// pass-through rather than a second place that tracks change detection.
pub struct EcsMaterial {
    pub material: ResourceHandle<Material>,
}

impl EcsMaterial {
    pub fn new(material: ResourceHandle<Material>) -> Self {
        Self { material }
    }

    pub fn version(&self) -> VersionId {
        self.material.get().version()
    }

    pub fn uniforms_version(&self) -> VersionId {
        self.material.get().uniforms_version()
    }

    pub fn parameters(&self) -> MaterialParameters {
        *self.material.get().parameters()
    }
}

/// Marks a drawable entity. Carries no data of its own -- a model's mesh
/// and material live on separately-attached `ComponentRef<EcsMesh>` /
/// `ComponentRef<EcsMaterial>` components, same split as `ModelResources`
/// on the GPU side.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcsModel;

#[cfg(test)]
mod tests {
    use super::*;
    use engine_resources::{ResourceCache, Shader, ShaderStage};

    fn material(cache: &ResourceCache<Material>, path: &str, params: MaterialParameters) -> ResourceHandle<Material> {
        let material = Material::new("lit", Shader::new(ShaderStage::Vertex), Shader::new(ShaderStage::Fragment), params);
        cache.insert(path, material)
    }

    #[test]
    fn parameters_only_change_bumps_uniforms_version_but_not_version() {
        let cache = ResourceCache::new();
        let handle = material(&cache, "mem://b", MaterialParameters::default());
        let ecs_material = EcsMaterial::new(handle.clone());
        let v0 = ecs_material.version();

        handle.get_mut().set_parameters(MaterialParameters { metallic: 0.5, ..MaterialParameters::default() });

        assert_eq!(ecs_material.version(), v0);
        assert!(ecs_material.uniforms_version() > VersionId::zero());
    }

    #[test]
    fn shader_change_bumps_both_versions() {
        let cache = ResourceCache::new();
        let handle = material(&cache, "mem://c", MaterialParameters::default());
        let ecs_material = EcsMaterial::new(handle.clone());

        handle.get_mut().set_fragment_shader(Shader::new(ShaderStage::Fragment));

        assert!(ecs_material.version() > VersionId::zero());
        assert!(ecs_material.uniforms_version() > VersionId::zero());
    }
}

//! The material resource: a name, its vertex and fragment shaders (each
//! framed as a sub-resource), and a small fixed set of shading parameters
//! standing in for the original's world/view/projection uniform block.
//! Version-tracked the same way as [`crate::mesh::Mesh`], but with the two
//! counters C5 calls for: `version` (pipeline-affecting: either shader
//! changed) and `uniforms_version` (everything that needs a fresh uniform
//! transfer, which a pipeline rebuild also implies).

use engine_common::{EngineResult, VersionId};

use crate::framer::Framer;
use crate::resource::{load_subresource, save_subresource, FileBacked};
use crate::shader::{Shader, ShaderStage};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParameters {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for MaterialParameters {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.0,
            roughness: 1.0,
        }
    }
}

#[derive(Debug)]
pub struct Material {
    name: String,
    vertex_shader: Shader,
    fragment_shader: Shader,
    parameters: MaterialParameters,
    version: VersionId,
    uniforms_version: VersionId,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            vertex_shader: Shader::new(ShaderStage::Vertex),
            fragment_shader: Shader::new(ShaderStage::Fragment),
            parameters: MaterialParameters::default(),
            version: VersionId::zero(),
            uniforms_version: VersionId::zero(),
        }
    }
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        vertex_shader: Shader,
        fragment_shader: Shader,
        parameters: MaterialParameters,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_shader,
            fragment_shader,
            parameters,
            version: VersionId::zero(),
            uniforms_version: VersionId::zero(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_shader(&self) -> &Shader {
        &self.vertex_shader
    }

    pub fn fragment_shader(&self) -> &Shader {
        &self.fragment_shader
    }

    pub fn parameters(&self) -> &MaterialParameters {
        &self.parameters
    }

    /// Bumps whenever either shader is replaced -- a collector watching this
    /// knows to rebuild the pipeline (and, since a rebuild needs a uniform
    /// buffer too, `uniforms_version` bumps alongside it).
    pub fn version(&self) -> VersionId {
        self.version
    }

    /// Bumps on a shader replacement *or* a parameters-only change -- a
    /// collector watching this knows to re-transfer the uniform payload.
    pub fn uniforms_version(&self) -> VersionId {
        self.uniforms_version
    }

    pub fn set_vertex_shader(&mut self, shader: Shader) {
        self.vertex_shader = shader;
        self.version.bump();
        self.uniforms_version.bump();
    }

    pub fn set_fragment_shader(&mut self, shader: Shader) {
        self.fragment_shader = shader;
        self.version.bump();
        self.uniforms_version.bump();
    }

    pub fn set_parameters(&mut self, parameters: MaterialParameters) {
        self.parameters = parameters;
        self.uniforms_version.bump();
    }
}

impl FileBacked for Material {
    fn write_data(&self, framer: &mut Framer) -> EngineResult<()> {
        framer.write_string(&self.name)?;
        save_subresource(&self.vertex_shader, None, framer)?;
        save_subresource(&self.fragment_shader, None, framer)?;
        for c in self.parameters.base_color {
            framer.write_var(c)?;
        }
        framer.write_var(self.parameters.metallic)?;
        framer.write_var(self.parameters.roughness)?;
        Ok(())
    }

    fn read_data(&mut self, framer: &mut Framer) -> EngineResult<()> {
        self.name = framer.read_string()?;
        self.vertex_shader = load_subresource(framer)?;
        self.fragment_shader = load_subresource(framer)?;
        let mut base_color = [0f32; 4];
        for c in base_color.iter_mut() {
            *c = framer.read_var()?;
        }
        self.parameters = MaterialParameters {
            base_color,
            metallic: framer.read_var()?,
            roughness: framer.read_var()?,
        };
        self.version.bump();
        self.uniforms_version.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FileMode;

    fn shaders() -> (Shader, Shader) {
        let mut vertex = Shader::new(ShaderStage::Vertex);
        vertex.set_glsl("#version 450\nvoid main() {}\n");
        let mut fragment = Shader::new(ShaderStage::Fragment);
        fragment.set_glsl("#version 450\nvoid main() {}\n");
        (vertex, fragment)
    }

    #[test]
    fn material_round_trips_through_a_file() {
        let path = std::env::temp_dir()
            .join(format!("engine-resources-material-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();

        let (vertex, fragment) = shaders();
        let original = Material::new(
            "lit",
            vertex,
            fragment,
            MaterialParameters { base_color: [0.2, 0.4, 0.6, 1.0], metallic: 0.1, roughness: 0.8 },
        );
        {
            let mut w = Framer::open(&path, FileMode::Write);
            original.write_data(&mut w).unwrap();
        }

        let mut loaded = Material::default();
        {
            let mut r = Framer::open(&path, FileMode::Read);
            loaded.read_data(&mut r).unwrap();
        }

        assert_eq!(loaded.name(), original.name());
        assert_eq!(loaded.vertex_shader().glsl(), original.vertex_shader().glsl());
        assert_eq!(loaded.fragment_shader().glsl(), original.fragment_shader().glsl());
        assert_eq!(loaded.parameters(), original.parameters());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn set_parameters_bumps_uniforms_version_only() {
        let (vertex, fragment) = shaders();
        let mut material = Material::new("lit", vertex, fragment, MaterialParameters::default());
        let v0 = material.version();
        let u0 = material.uniforms_version();

        material.set_parameters(MaterialParameters { metallic: 0.5, ..MaterialParameters::default() });
        assert_eq!(material.version(), v0, "a parameters-only change must not force a pipeline rebuild");
        assert!(material.uniforms_version() > u0);
    }

    #[test]
    fn replacing_a_shader_bumps_both_versions() {
        let (vertex, fragment) = shaders();
        let mut material = Material::new("lit", vertex, fragment, MaterialParameters::default());
        let v0 = material.version();
        let u0 = material.uniforms_version();

        let mut new_fragment = Shader::new(ShaderStage::Fragment);
        new_fragment.set_glsl("#version 450\nvoid main() { /* different */ }\n");
        material.set_fragment_shader(new_fragment);

        assert!(material.version() > v0);
        assert!(material.uniforms_version() > u0);
    }
}

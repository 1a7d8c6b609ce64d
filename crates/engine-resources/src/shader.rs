//! The shader resource: one pipeline stage's GLSL source and its compiled
//! SPIR-V words, if any. Compilation itself (GLSL source -> SPIR-V) is an
//! external collaborator (`engine-cli::shader_compile`, backed by
//! `shaderc`); this type only owns the text and the words and frames them
//! to disk.

use engine_common::{EngineError, EngineResult, VersionId};

use crate::framer::Framer;
use crate::resource::FileBacked;

/// Which pipeline stage a [`Shader`] belongs to. A material pairs exactly
/// one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn tag(self) -> u8 {
        match self {
            ShaderStage::Vertex => b'v',
            ShaderStage::Fragment => b'f',
        }
    }

    fn from_tag(tag: u8) -> EngineResult<Self> {
        match tag {
            b'v' => Ok(ShaderStage::Vertex),
            b'f' => Ok(ShaderStage::Fragment),
            other => Err(EngineError::Io(format!("unrecognized shader stage tag '{other}'")).logged()),
        }
    }
}

#[derive(Debug)]
pub struct Shader {
    stage: ShaderStage,
    glsl: Option<String>,
    spirv: Option<Vec<u32>>,
    version: VersionId,
}

impl Default for Shader {
    fn default() -> Self {
        Self {
            stage: ShaderStage::Vertex,
            glsl: None,
            spirv: None,
            version: VersionId::zero(),
        }
    }
}

impl Shader {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            glsl: None,
            spirv: None,
            version: VersionId::zero(),
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn glsl(&self) -> Option<&str> {
        self.glsl.as_deref()
    }

    pub fn spirv(&self) -> Option<&[u32]> {
        self.spirv.as_deref()
    }

    pub fn version(&self) -> VersionId {
        self.version
    }

    /// Replace the GLSL source. Any previously compiled SPIR-V is no longer
    /// valid for this source, so it is dropped until [`Self::set_spirv`] is
    /// called again.
    pub fn set_glsl(&mut self, glsl: impl Into<String>) {
        self.glsl = Some(glsl.into());
        self.spirv = None;
        self.version.bump();
    }

    pub fn set_spirv(&mut self, spirv: Vec<u32>) {
        self.spirv = Some(spirv);
        self.version.bump();
    }
}

impl FileBacked for Shader {
    fn write_data(&self, framer: &mut Framer) -> EngineResult<()> {
        framer.write_var(self.stage.tag())?;
        framer.write_string(self.glsl.as_deref().unwrap_or(""))?;
        match &self.spirv {
            Some(spirv) => {
                framer.write_var(1u8)?;
                framer.write_buffer(spirv)?;
            }
            None => framer.write_var(0u8)?,
        }
        Ok(())
    }

    fn read_data(&mut self, framer: &mut Framer) -> EngineResult<()> {
        self.stage = ShaderStage::from_tag(framer.read_var::<u8>()?)?;
        let glsl = framer.read_string()?;
        self.glsl = if glsl.is_empty() { None } else { Some(glsl) };
        let has_spirv = framer.read_var::<u8>()?;
        self.spirv = if has_spirv != 0 { Some(framer.read_buffer()?) } else { None };
        self.version.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::FileMode;

    #[test]
    fn shader_round_trips_through_a_file() {
        let path = std::env::temp_dir()
            .join(format!("engine-resources-shader-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();

        let mut original = Shader::new(ShaderStage::Fragment);
        original.set_glsl("#version 450\nvoid main() {}\n");
        original.set_spirv(vec![0x0723_0203, 1, 2, 3]);
        {
            let mut w = Framer::open(&path, FileMode::Write);
            original.write_data(&mut w).unwrap();
        }

        let mut loaded = Shader::default();
        {
            let mut r = Framer::open(&path, FileMode::Read);
            loaded.read_data(&mut r).unwrap();
        }

        assert_eq!(loaded.stage(), original.stage());
        assert_eq!(loaded.glsl(), original.glsl());
        assert_eq!(loaded.spirv(), original.spirv());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn reassigning_glsl_invalidates_compiled_spirv() {
        let mut shader = Shader::new(ShaderStage::Vertex);
        shader.set_spirv(vec![1, 2, 3]);
        assert!(shader.spirv().is_some());

        shader.set_glsl("#version 450\nvoid main() {}\n");
        assert!(shader.spirv().is_none(), "reassigning glsl should drop the now-stale spirv");
    }

    #[test]
    fn absent_glsl_round_trips_as_none() {
        let path = std::env::temp_dir()
            .join(format!("engine-resources-shader-no-glsl-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();

        let original = Shader::new(ShaderStage::Vertex);
        {
            let mut w = Framer::open(&path, FileMode::Write);
            original.write_data(&mut w).unwrap();
        }

        let mut loaded = Shader::default();
        {
            let mut r = Framer::open(&path, FileMode::Read);
            loaded.read_data(&mut r).unwrap();
        }

        assert_eq!(loaded.stage(), ShaderStage::Vertex);
        assert_eq!(loaded.glsl(), None);
        assert_eq!(loaded.spirv(), None);
        std::fs::remove_file(&path).ok();
    }
}

//! Backs `--make-shader`: GLSL source on disk, through `shaderc`, into the
//! SPIR-V words a [`Shader`] resource file carries. Compilation itself is
//! an external collaborator the resource type never touches directly --
//! see `engine_resources::shader`'s module doc.

use std::fs;

use engine_common::{EngineError, EngineResult};
use engine_resources::{FileBacked, FileMode, Framer, Shader, ShaderStage};

use crate::cli::{MakeShaderCommand, ShaderStage as CliShaderStage};

/// Compile the requested stage and write it out as a [`Shader`] resource
/// file at `cmd.output_path`, overwriting whatever was there before -- a
/// shader resource file carries exactly one stage, so there's nothing to
/// merge with a prior invocation.
pub fn make_shader(cmd: &MakeShaderCommand) -> EngineResult<()> {
    let source = fs::read_to_string(&cmd.source_path)
        .map_err(|e| EngineError::Io(format!("failed to read shader source '{}': {e}", cmd.source_path)).logged())?;

    let stage = match cmd.stage {
        CliShaderStage::Vertex => ShaderStage::Vertex,
        CliShaderStage::Fragment => ShaderStage::Fragment,
    };
    let spirv = compile(&cmd.name, &cmd.source_path, &source, cmd.stage)?;

    let mut shader = Shader::new(stage);
    shader.set_glsl(source);
    shader.set_spirv(spirv);

    let mut framer = Framer::open(&cmd.output_path, FileMode::Write);
    if !framer.is_valid() {
        return Err(EngineError::Io(format!("failed to open shader output '{}' for writing", cmd.output_path)).logged());
    }
    shader.write_data(&mut framer)?;

    log::info!(target: "cli", "wrote shader '{}' ({:?} stage) to '{}'", cmd.name, cmd.stage, cmd.output_path);
    Ok(())
}

fn compile(name: &str, source_path: &str, source: &str, stage: CliShaderStage) -> EngineResult<Vec<u32>> {
    let kind = match stage {
        CliShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        CliShaderStage::Fragment => shaderc::ShaderKind::Fragment,
    };

    let compiler = shaderc::Compiler::new()
        .ok_or_else(|| EngineError::Configuration("failed to initialize the shaderc compiler".to_string()).logged())?;
    let artifact = compiler
        .compile_into_spirv(source, kind, source_path, "main", None)
        .map_err(|e| EngineError::Configuration(format!("failed to compile shader '{name}': {e}")).logged())?;

    Ok(artifact.as_binary().to_vec())
}

//! Argv scanning: a hand-rolled token scanner in the teacher's `+set`
//! tradition (`myq2_common::cmd::CmdContext::cbuf_add_early_commands`
//! consumes `+set <var> <value>` triples straight out of argv) rather than
//! a declarative argument-parsing crate.
//!
//! `--args-file|-af <path>` splices more whitespace-separated tokens into
//! the stream at the point it's encountered, mirroring the teacher's
//! `@responsefile` expansion in `ComArgs::init` without carrying over its
//! fixed `MAX_NUM_ARGVS` ceiling.

use std::collections::VecDeque;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone)]
pub struct MakeShaderCommand {
    pub stage: ShaderStage,
    pub name: String,
    pub source_path: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub help: bool,
    pub open_window: bool,
    pub make_shader: Option<MakeShaderCommand>,
    pub set_vars: Vec<(String, String)>,
}

pub const USAGE: &str = "\
engine-cli [options]

  -h, --help                    print this message
  -af, --args-file <path>       load more whitespace-separated args from a file
  -w, --open-window             create a render window
  -rnsh, --make-shader <vertex|fragment> <name> <source-path> <output-path>
                                 compile GLSL to SPIR-V and write a shader resource file
  +set <cvar> <value>           seed an engine cvar
";

/// Scan `argv` (already stripped of argv[0]) into a [`ParsedArgs`].
/// Unknown tokens are logged and skipped, matching the tolerant-scan
/// contract of the teacher's own `+set` extraction loop.
pub fn parse(argv: &[String]) -> ParsedArgs {
    let mut tokens: VecDeque<String> = argv.iter().cloned().collect();
    let mut parsed = ParsedArgs::default();

    while let Some(token) = tokens.pop_front() {
        match token.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-w" | "--open-window" => parsed.open_window = true,
            "-af" | "--args-file" => {
                let Some(path) = tokens.pop_front() else {
                    log::warn!(target: "cli", "--args-file given with no path, ignoring");
                    continue;
                };
                splice_args_file(&path, &mut tokens);
            }
            "-rnsh" | "--make-shader" => {
                let (Some(stage), Some(name), Some(source_path), Some(output_path)) =
                    (tokens.pop_front(), tokens.pop_front(), tokens.pop_front(), tokens.pop_front())
                else {
                    log::warn!(target: "cli", "--make-shader requires <vertex|fragment> <name> <source-path> <output-path>");
                    continue;
                };
                let stage = match stage.as_str() {
                    "vertex" => ShaderStage::Vertex,
                    "fragment" => ShaderStage::Fragment,
                    other => {
                        log::warn!(target: "cli", "unknown shader stage '{other}', ignoring --make-shader");
                        continue;
                    }
                };
                parsed.make_shader = Some(MakeShaderCommand { stage, name, source_path, output_path });
            }
            "+set" => {
                let (Some(name), Some(value)) = (tokens.pop_front(), tokens.pop_front()) else {
                    log::warn!(target: "cli", "+set requires <cvar> <value>");
                    continue;
                };
                parsed.set_vars.push((name, value));
            }
            other => {
                log::warn!(target: "cli", "unknown flag '{other}', skipping");
            }
        }
    }

    parsed
}

/// Read `path`, split on whitespace, and push every token onto the front
/// of the queue in order, so the file's contents are scanned next rather
/// than after whatever followed `--args-file` on the original command line.
fn splice_args_file(path: &str, tokens: &mut VecDeque<String>) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!(target: "cli", "failed to read args file '{path}': {e}");
            return;
        }
    };
    for word in contents.split_whitespace().rev() {
        tokens.push_front(word.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn help_and_open_window_flags_are_recognized_long_and_short() {
        let parsed = parse(&args(&["-h", "--open-window"]));
        assert!(parsed.help);
        assert!(parsed.open_window);

        let parsed = parse(&args(&["--help", "-w"]));
        assert!(parsed.help);
        assert!(parsed.open_window);
    }

    #[test]
    fn set_pairs_are_collected_in_order() {
        let parsed = parse(&args(&["+set", "r_vsync", "0", "+set", "r_validation", "1"]));
        assert_eq!(
            parsed.set_vars,
            vec![("r_vsync".to_string(), "0".to_string()), ("r_validation".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn make_shader_parses_all_four_operands() {
        let parsed = parse(&args(&["--make-shader", "vertex", "lit", "src/lit.vert", "out/lit.vert.spv"]));
        let cmd = parsed.make_shader.expect("make_shader should be set");
        assert_eq!(cmd.stage, ShaderStage::Vertex);
        assert_eq!(cmd.name, "lit");
        assert_eq!(cmd.source_path, "src/lit.vert");
        assert_eq!(cmd.output_path, "out/lit.vert.spv");
    }

    #[test]
    fn unrecognized_shader_stage_is_ignored_without_panicking() {
        let parsed = parse(&args(&["--make-shader", "geometry", "lit", "a", "b"]));
        assert!(parsed.make_shader.is_none());
    }

    #[test]
    fn unknown_flags_are_skipped_without_aborting_the_scan() {
        let parsed = parse(&args(&["--bogus", "-w"]));
        assert!(parsed.open_window);
    }

    #[test]
    fn args_file_tokens_are_spliced_in_before_the_remaining_argv() {
        let path = std::env::temp_dir()
            .join(format!("engine-cli-args-file-{}", std::process::id()))
            .to_string_lossy()
            .into_owned();
        fs::write(&path, "+set r_vsync 0\n").unwrap();

        let parsed = parse(&args(&["--args-file", &path, "-w"]));
        assert_eq!(parsed.set_vars, vec![("r_vsync".to_string(), "0".to_string())]);
        assert!(parsed.open_window);

        fs::remove_file(&path).ok();
    }
}

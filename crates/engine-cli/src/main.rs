//! Engine host binary: argument scanning, logger install, and dispatch to
//! the three built-in commands (`--make-shader`, `--open-window`, and
//! seeding cvars via `+set`). Converted from the shape of the teacher's
//! `myq2-sys::main` entry point, minus the Quake-specific subsystem wiring.

mod cli;
mod logging;
mod shader_compile;
mod window;

use std::process::ExitCode;

use engine_common::config::{CvarRegistry, CVAR_NOSET};

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = cli::parse(&argv);

    if parsed.help {
        print!("{}", cli::USAGE);
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init("logs") {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let mut cvars = CvarRegistry::new();
    cvars.get("r_vsync", "1", 0);
    cvars.get("r_validation", "0", 0);
    cvars.get("r_max_frames_in_flight", "2", CVAR_NOSET);
    for (name, value) in &parsed.set_vars {
        cvars.get(name, value, 0);
        cvars.set(name, value);
    }

    if let Some(make_shader) = &parsed.make_shader {
        if let Err(e) = shader_compile::make_shader(make_shader) {
            log::error!(target: "cli", "--make-shader failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    if parsed.open_window {
        let enable_validation = cvars.value("r_validation") != 0.0;
        if let Err(e) = window::run(enable_validation) {
            log::error!(target: "cli", "window session failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

//! Installs the process-wide `log` sink. Every crate in the workspace
//! calls `log::*` directly; this is the only place that decides where
//! those records actually go, keeping the core crates free of file-handle
//! ownership.
//!
//! Mirrors every record to stderr and additionally appends it to
//! `logs/<target>.log`, one file per distinct `target()` (`"ecs"`, `"io"`,
//! `"vulkan"`, `"errors"`, ...), each line reading `<source-name>: <message>`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use engine_common::EngineError;

/// Lazily-opened, append-mode file per log target.
struct TargetFiles {
    dir: PathBuf,
    open: Mutex<HashMap<String, Option<File>>>,
}

impl TargetFiles {
    fn new(dir: PathBuf) -> Self {
        Self { dir, open: Mutex::new(HashMap::new()) }
    }

    fn write_record(&self, record: &log::Record) {
        let target = record.target().to_string();
        let path = self.dir.join(format!("{target}.log"));
        let mut open = self.open.lock().unwrap();
        let file = open
            .entry(target.clone())
            .or_insert_with(|| OpenOptions::new().create(true).append(true).open(&path).ok());
        if let Some(file) = file {
            let _ = writeln!(file, "{target}: {}", record.args());
        }
    }
}

/// Install the global logger. `log_dir` is created if it doesn't exist.
pub fn init(log_dir: &str) -> Result<(), EngineError> {
    fs::create_dir_all(log_dir)
        .map_err(|e| EngineError::Io(format!("failed to create log directory '{log_dir}': {e}")).logged())?;

    let targets = Arc::new(TargetFiles::new(PathBuf::from(log_dir)));

    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("{}: {}", record.target(), message)))
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .chain(fern::Output::call(move |record| targets.write_record(record)))
        .apply()
        .map_err(|e| EngineError::Configuration(format!("failed to install logger: {e}")).logged())
}

//! Error kinds per the engine's exception-neutral contract: every fallible
//! operation returns a `Result`, logs through `log::error!`, and the caller
//! gets back a neutral value rather than a panic or a thrown exception.

use thiserror::Error;

/// The engine's single error type. Every subsystem maps its failures into
/// one of these variants rather than inventing its own.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid path, missing mode, reserved opcode use, malformed flag.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A component/resource lookup that came back empty.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Duplicate add, double remove, stale reference -- logged, but the
    /// caller is expected to continue rather than unwind.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Framer couldn't open, wrong mode, short read/write.
    #[error("I/O error: {0}")]
    Io(String),

    /// Vulkan object creation failed, or a non-out-of-date vk::Result.
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Device lost. The only variant the host boundary is expected to
    /// treat as fatal rather than recoverable.
    #[error("Vulkan device lost")]
    DeviceLost,
}

impl EngineError {
    /// Log this error to the "errors" target and return it, for the common
    /// `return Err(e.logged())` shape used throughout the core.
    pub fn logged(self) -> Self {
        log::error!(target: "errors", "{self}");
        self
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

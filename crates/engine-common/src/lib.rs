//! Shared plumbing used by every other engine crate: the error type, the
//! monotone version counter, a small cvar-style configuration registry, and
//! the typed publish/subscribe event bus used by both the ECS and the
//! resource cache.
//!
//! None of this owns a log sink -- every crate calls straight into the
//! `log` facade (see `engine-cli::logging` for where the sink gets
//! installed and how it produces the `logs/<target>.log` layout).

pub mod config;
pub mod error;
pub mod event;
pub mod version;

pub use error::{EngineError, EngineResult};
pub use event::{Event, Handler};
pub use version::VersionId;

//! Core engine types: errors, configuration, and the shared context

pub mod config;
pub mod context;
pub mod error;

pub use config::EngineConfig;
pub use context::{EngineContext, GpuContext};
pub use error::{EngineError, EngineResult, ErrorKind};

//! Engine error type
//!
//! One error value for the whole engine: a small tagged kind plus the
//! originating component and a human-readable reason. Lookup-style
//! operations also come in non-throwing `try_` forms returning `Option`;
//! this type is for the call sites that consider absence a bug.

use thiserror::Error;

/// Coarse classification of engine failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An entity, component, or resource lookup failed
    NotFound,
    /// A file path was missing, unreadable, or malformed
    InvalidPath,
    /// A value had the wrong shape for the requested operation
    TypeMismatch,
    /// The graphics device reported an unrecoverable condition
    DeviceFailure,
}

impl ErrorKind {
    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::InvalidPath => "invalid path",
            Self::TypeMismatch => "type mismatch",
            Self::DeviceFailure => "device failure",
        }
    }
}

/// Engine-wide error value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{source_component}] {}: {reason}", .kind.name())]
pub struct EngineError {
    /// What class of failure occurred
    pub kind: ErrorKind,
    /// The component that raised the error ("transform", "frame", ...)
    pub source_component: &'static str,
    /// Human-readable description
    pub reason: String,
}

impl EngineError {
    /// Build an error with an explicit kind
    pub fn new(kind: ErrorKind, source_component: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            source_component,
            reason: reason.into(),
        }
    }

    /// A failed lookup
    pub fn not_found(source: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, source, reason)
    }

    /// A bad or unreadable path
    pub fn invalid_path(source: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPath, source, reason)
    }

    /// A structurally wrong value
    pub fn type_mismatch(source: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, source, reason)
    }

    /// An unrecoverable device condition
    pub fn device_failure(source: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::DeviceFailure, source, reason)
    }
}

/// Result alias used across the engine
pub type EngineResult<T> = Result<T, EngineError>;

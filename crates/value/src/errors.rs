//! Error taxonomy and structured diagnostics.
//!
//! `FoldError` covers every recoverable error kind; it is never the panic
//! path. `OperatorShape` has no variant here at all — it's an internal
//! invariant violation and is always a `panic!`/`assert!` (see
//! `Expr::new`), keeping `Result`-carried runtime errors separate from
//! fatal, abort-on-construction invariant violations.

use crate::traits::Location;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum FoldError {
    #[error("{0} does not fit in {1}")]
    ConversionRange(String, String),
    #[error("{0}")]
    ConversionFormat(String),
    #[error("expected {expected}, got {actual}")]
    DomainType { expected: String, actual: String },
    #[error("{0}")]
    DomainValue(String),
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("cyclic reference detected: {0}")]
    CycleDetected(String),
    #[error("unresolved reference {0:?}")]
    Unresolved(String),
    #[error("incompatible operand types: {0}")]
    Incompatible(String),
    #[error("expected a constant, found {0}")]
    NotConstant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A user-facing diagnostic, collected by the checker rather than printed
/// directly — the driver decides how/when to render it. Every diagnostic is
/// also mirrored to `tracing` at the matching level as it's recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn error(location: Location, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(file = %location.file, line = location.line, "{message}");
        Diagnostic { severity: Severity::Error, location, message }
    }

    pub fn warning(location: Location, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(file = %location.file, line = location.line, "{message}");
        Diagnostic { severity: Severity::Warning, location, message }
    }
}

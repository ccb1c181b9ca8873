//! Validation
//!
//! Per-line diagnostics collection, kept apart from geometry and LSP concerns.

pub mod engine;

pub use engine::{
    is_accepted_letter, validate_document, LineDiagnostics, Severity, ValidationResult,
};

//! G-code Toolpath Parser
//!
//! Turns G-code text into an ordered stream of motion segments and
//! diagnostics, grouped into layers.
//!
//! This library provides:
//! - Line tokenization with configurable layer markers
//! - Modal interpretation, arc resolution and position tracking
//! - Program structure analysis
//! - An LSP backend publishing parse diagnostics
//! - Configuration management

pub mod config;
pub mod core;
pub mod interp;
pub mod lsp;
pub mod parser;
pub mod structure;
pub mod validation;

// Re-exports for clean public API
pub use config::{Config, ParserOptions};
pub use crate::core::{
    Diagnostic, DiagnosticCategory, DiagnosticKind, LayerInfo, MotionSegment, ParseResult,
    PathEntry, Severity,
};
pub use interp::{parse, parse_batched, parse_with_options, ParseRun};
pub use parser::{parse_line, ParsedLine};
pub use structure::{analyze_program_structure, ProgramStructure};
pub use validation::validate_document;

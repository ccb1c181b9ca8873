//! Output Model
//!
//! Path entries, layers and the builder that assembles them.

pub mod builder;
pub mod path;

pub use builder::{LayerInfo, ParseResult, PathBuilder};
pub use path::{
    ArcDirection, Axis, CenterOffset, Diagnostic, DiagnosticCategory, DiagnosticContext,
    DiagnosticKind, MotionKind, MotionSegment, PathEntry, Position, Severity,
};

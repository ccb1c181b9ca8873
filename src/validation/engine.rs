//! Diagnostics Collector
//!
//! Accumulates the diagnostics of one line and decides whether the line may
//! still produce a segment. Document-level helpers sit on top for editor use.

use crate::config::ParserOptions;
use crate::core::path::{
    Diagnostic, DiagnosticCategory, DiagnosticContext, DiagnosticKind, Position,
};
use crate::interp::arc::{ArcError, ArcParams};
use crate::interp::modal::Plane;
use crate::interp::position::AxisWords;
use crate::parser::{InvalidWord, Parameter};

pub use crate::core::path::Severity;

/// Parameter letters the interpreter accepts besides G and M
pub const ACCEPTED_LETTERS: &str = "XYZIJKRFSPTNEDHLO";

pub fn is_accepted_letter(letter: char) -> bool {
    ACCEPTED_LETTERS.contains(letter)
}

/// Diagnostics of a single line
#[derive(Debug)]
pub struct LineDiagnostics<'a> {
    line_no: usize,
    raw_line: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> LineDiagnostics<'a> {
    pub fn new(line_no: usize, raw_line: &'a str) -> Self {
        Self {
            line_no,
            raw_line,
            diagnostics: Vec::new(),
        }
    }

    pub fn add(
        &mut self,
        kind: DiagnosticKind,
        category: DiagnosticCategory,
        message: String,
        suggestions: Vec<String>,
    ) {
        log::trace!("line {}: {} {}", self.line_no, kind.as_str(), message);
        let diagnostic = Diagnostic::new(kind, category, message, self.line_no, self.raw_line);
        self.diagnostics.push(diagnostic.with_suggestions(suggestions));
    }

    pub fn add_parse_error(&mut self, category: DiagnosticCategory, message: String) {
        self.add(DiagnosticKind::ParseError, category, message, Vec::new());
    }

    pub fn add_warning(&mut self, message: String) {
        self.add(
            DiagnosticKind::Warning,
            DiagnosticCategory::Advisory,
            message,
            Vec::new(),
        );
    }

    /// `code` is the display form, e.g. "G43"
    pub fn add_unsupported(&mut self, code: &str) {
        let family = if code.starts_with('M') { "M-code" } else { "G-code" };
        self.add(
            DiagnosticKind::Unsupported,
            DiagnosticCategory::UnknownCommand,
            format!("Unsupported {} {}", family, code),
            vec![format!("Remove {} or replace it with a supported code", code)],
        );
    }

    pub fn add_unknown_param(&mut self, param: &Parameter) {
        self.add(
            DiagnosticKind::UnknownParam,
            DiagnosticCategory::UnknownParameter,
            format!(
                "Unknown parameter letter '{}' in '{}'",
                param.letter, param.text
            ),
            vec![format!("Remove the '{}' word", param.text)],
        );
    }

    pub fn add_invalid_word(&mut self, word: &InvalidWord) {
        let (category, message) = match word.letter {
            Some(letter @ ('X' | 'Y' | 'Z')) => (
                DiagnosticCategory::ParameterTypeError,
                format!("Invalid numeric value for '{}' in '{}'", letter, word.text),
            ),
            Some(letter) => (
                DiagnosticCategory::InvalidParameterValue,
                format!("Invalid numeric value for '{}' in '{}'", letter, word.text),
            ),
            None => (
                DiagnosticCategory::InvalidParameterValue,
                format!("Invalid word format: '{}'", word.text),
            ),
        };
        self.add(
            DiagnosticKind::ParseError,
            category,
            message,
            vec!["Check parameter value format".to_string()],
        );
    }

    pub fn add_arc_error(&mut self, error: ArcError, plane: Plane) {
        let (category, suggestions) = match &error {
            ArcError::MissingParameters(_) => {
                let [first, second] = plane.offset_letters();
                (
                    DiagnosticCategory::MissingParameters,
                    vec![
                        "Add an R word for the radius".to_string(),
                        format!("Add {} and {} words for the center offset", first, second),
                    ],
                )
            }
            ArcError::Geometry(_) => (
                DiagnosticCategory::ArcGeometry,
                vec!["Check the end point against the radius or center offsets".to_string()],
            ),
        };
        self.add(
            DiagnosticKind::ParseError,
            category,
            error.into_message(),
            suggestions,
        );
    }

    /// Range checks on F and S; returns false when the value was rejected
    pub fn check_parameter(&mut self, param: &Parameter) -> bool {
        let (message, suggestion) = match param.letter {
            'F' if param.value <= 0.0 => (
                format!("Feed rate must be positive, got {}", param.value),
                "Use a positive feed rate value",
            ),
            'S' if param.value < 0.0 => (
                format!("Spindle speed must be non-negative, got {}", param.value),
                "Use a non-negative spindle speed",
            ),
            _ => return true,
        };
        self.add(
            DiagnosticKind::ParseError,
            DiagnosticCategory::InvalidParameterValue,
            message,
            vec![suggestion.to_string()],
        );
        false
    }

    /// Warn for each axis given on the line whose resulting coordinate is beyond the threshold
    pub fn check_coordinates(&mut self, words: &AxisWords, end: &Position, threshold: f64) {
        for axis in words.present() {
            let value = end.get(axis);
            if value.abs() > threshold {
                self.add_warning(format!(
                    "Large coordinate {:?}={} exceeds {} mm",
                    axis, value, threshold
                ));
            }
        }
    }

    pub fn check_offsets(&mut self, params: &ArcParams, threshold: f64) {
        for (letter, value) in params.offsets() {
            if value.abs() > threshold {
                self.add_warning(format!(
                    "Large arc offset {}={} exceeds {} mm",
                    letter, value, threshold
                ));
            }
        }
    }

    /// Whether anything recorded so far suppresses the line's segment
    pub fn blocks_segment(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.blocks_segment())
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Like [`Self::into_diagnostics`], attaching the line context to each
    /// entry. `context` only runs when there is something to attach it to.
    pub fn into_diagnostics_with<F>(self, context: F) -> Vec<Diagnostic>
    where
        F: FnOnce() -> DiagnosticContext,
    {
        let mut diagnostics = self.diagnostics;
        if !diagnostics.is_empty() {
            let context = context();
            for diagnostic in &mut diagnostics {
                diagnostic.context = Some(context.clone());
            }
        }
        diagnostics
    }
}

/// Diagnostics of a whole document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// No parse errors; warnings and unsupported codes are tolerated
    pub fn is_valid(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

/// Run a full parse and keep only the diagnostics
pub fn validate_document(content: &str, options: &ParserOptions) -> ValidationResult {
    let result = crate::interp::parse_with_options(content, options);
    ValidationResult {
        diagnostics: result.diagnostics().cloned().collect(),
    }
}

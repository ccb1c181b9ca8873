//! Path entries
//!
//! The output contract consumed by preview and editor collaborators. All
//! lengths are millimeters.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::interp::modal::{CoordinateSystem, ModalState, Plane};

/// Linear axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// A point in machine space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

/// Arc center relative to the arc start
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CenterOffset {
    pub i: f64,
    pub j: f64,
    pub k: f64,
}

impl CenterOffset {
    /// Offset component along a linear axis (I→X, J→Y, K→Z)
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
        }
    }

    pub fn set_along(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.i = value,
            Axis::Y => self.j = value,
            Axis::Z => self.k = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Rapid,
    Feed,
    Arc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// A renderable tool movement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSegment {
    #[serde(rename = "type")]
    pub kind: MotionKind,
    pub start: Position,
    pub end: Position,
    pub line_no: usize,
    pub raw_line: String,
    pub plane: Plane,
    pub coord_system: CoordinateSystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<ArcDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_offset: Option<CenterOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Offset words given on an arc line but not used for its center
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub overridden_params: BTreeMap<char, f64>,
    /// Modal state in effect for this line
    pub modal_state: ModalState,
}

impl MotionSegment {
    /// Absolute arc center, when the segment is an arc
    pub fn center(&self) -> Option<Position> {
        self.center_offset.map(|o| {
            Position::new(self.start.x + o.i, self.start.y + o.j, self.start.z + o.k)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Structural problem; the line produces no segment
    ParseError,
    /// Syntactically fine but not implemented; the line produces no segment
    Unsupported,
    /// Unexpected parameter letter
    UnknownParam,
    /// Advisory only
    Warning,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::ParseError => "parse_error",
            DiagnosticKind::Unsupported => "unsupported",
            DiagnosticKind::UnknownParam => "unknown_param",
            DiagnosticKind::Warning => "warning",
        }
    }

    /// Whether this kind prevents the line from producing a segment
    pub fn blocks_segment(&self) -> bool {
        matches!(self, DiagnosticKind::ParseError | DiagnosticKind::Unsupported)
    }
}

/// Severity of a diagnostic for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn of(kind: DiagnosticKind) -> Self {
        match kind {
            DiagnosticKind::ParseError => Severity::Error,
            DiagnosticKind::Unsupported
            | DiagnosticKind::UnknownParam
            | DiagnosticKind::Warning => Severity::Warning,
        }
    }
}

/// What went wrong, finer grained than [`DiagnosticKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    /// Arc without a usable R or complete center offsets
    MissingParameters,
    /// Arc parameters present but geometrically impossible
    ArcGeometry,
    /// Axis word whose value is not a number
    ParameterTypeError,
    /// Non-axis word with a malformed or out-of-range value
    InvalidParameterValue,
    UnknownCommand,
    UnknownParameter,
    LayerFormat,
    /// Warnings
    Advisory,
}

/// Line context attached to every diagnostic of a block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticContext {
    /// First G or M word of the line, e.g. "G2"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Letters of the remaining words, in line order
    pub parameters: Vec<char>,
    pub modal_state: ModalState,
}

/// A non-fatal record describing a parsing anomaly on one line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub message: String,
    pub line_no: usize,
    pub raw_line: String,
    pub severity: Severity,
    pub category: DiagnosticCategory,
    /// Kind and line, e.g. "PARSE_ERROR_007"
    pub error_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<DiagnosticContext>,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        category: DiagnosticCategory,
        message: String,
        line_no: usize,
        raw_line: &str,
    ) -> Self {
        Self {
            kind,
            message,
            line_no,
            raw_line: raw_line.to_string(),
            severity: Severity::of(kind),
            category,
            error_code: format!("{}_{:03}", kind.as_str().to_ascii_uppercase(), line_no),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// One entry of the ordered output stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathEntry {
    Motion(MotionSegment),
    Diagnostic(Diagnostic),
}

impl PathEntry {
    pub fn line_no(&self) -> usize {
        match self {
            PathEntry::Motion(m) => m.line_no,
            PathEntry::Diagnostic(d) => d.line_no,
        }
    }

    pub fn raw_line(&self) -> &str {
        match self {
            PathEntry::Motion(m) => &m.raw_line,
            PathEntry::Diagnostic(d) => &d.raw_line,
        }
    }

    pub fn as_motion(&self) -> Option<&MotionSegment> {
        match self {
            PathEntry::Motion(m) => Some(m),
            PathEntry::Diagnostic(_) => None,
        }
    }

    pub fn as_diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            PathEntry::Diagnostic(d) => Some(d),
            PathEntry::Motion(_) => None,
        }
    }

    /// Collaborators must not draw parse errors, unsupported or unknown-parameter entries
    pub fn is_renderable(&self) -> bool {
        match self {
            PathEntry::Motion(_) => true,
            PathEntry::Diagnostic(d) => d.kind == DiagnosticKind::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc() -> MotionSegment {
        MotionSegment {
            kind: MotionKind::Arc,
            start: Position::new(1.0, 2.0, 0.0),
            end: Position::new(11.0, 2.0, 0.0),
            line_no: 4,
            raw_line: "G2 X11 Y2 I5 J0".to_string(),
            plane: Plane::Xy,
            coord_system: CoordinateSystem::G54,
            feed_rate: Some(300.0),
            direction: Some(ArcDirection::Clockwise),
            center_offset: Some(CenterOffset {
                i: 5.0,
                j: 0.0,
                k: 0.0,
            }),
            radius: Some(5.0),
            overridden_params: BTreeMap::from([('K', 2.0)]),
            modal_state: ModalState::default(),
        }
    }

    #[test]
    fn test_center_from_offset() {
        assert_eq!(arc().center(), Some(Position::new(6.0, 2.0, 0.0)));
    }

    #[test]
    fn test_motion_serializes_without_message() {
        let value = serde_json::to_value(PathEntry::Motion(arc())).expect("serialize");
        assert_eq!(value["type"], "arc");
        assert_eq!(value["direction"], "clockwise");
        assert_eq!(value["plane"], "xy");
        assert_eq!(value["overridden_params"]["K"], 2.0);
        assert_eq!(value["modal_state"]["units"], "millimeter");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_linear_motion_omits_arc_fields() {
        let mut segment = arc();
        segment.kind = MotionKind::Feed;
        segment.direction = None;
        segment.center_offset = None;
        segment.radius = None;
        segment.overridden_params.clear();

        let value = serde_json::to_value(&segment).expect("serialize");
        assert!(value.get("overridden_params").is_none());
        assert!(value.get("radius").is_none());
        assert_eq!(value["modal_state"]["motion"], "rapid");
    }

    #[test]
    fn test_diagnostic_serializes_without_geometry() {
        let entry = PathEntry::Diagnostic(Diagnostic::new(
            DiagnosticKind::UnknownParam,
            DiagnosticCategory::UnknownParameter,
            "Unknown parameter letter 'Q' in 'Q5'".to_string(),
            2,
            "G1 X1 Q5",
        ));
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(value["type"], "unknown_param");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["category"], "unknown_parameter");
        assert_eq!(value["error_code"], "UNKNOWN_PARAM_002");
        assert!(value.get("suggestions").is_none());
        assert!(value.get("context").is_none());
        assert!(value.get("start").is_none());
        assert!(value.get("end").is_none());
        assert!(!entry.is_renderable());
    }

    #[test]
    fn test_diagnostic_record_fields() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::ParseError,
            DiagnosticCategory::InvalidParameterValue,
            "Feed rate must be positive, got 0".to_string(),
            7,
            "G1 F0",
        )
        .with_suggestions(vec!["Use a positive feed rate value".to_string()]);

        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.error_code, "PARSE_ERROR_007");

        let value = serde_json::to_value(&diagnostic).expect("serialize");
        assert_eq!(value["suggestions"][0], "Use a positive feed rate value");
        assert_eq!(value["category"], "invalid_parameter_value");
    }

    #[test]
    fn test_blocking_kinds() {
        assert!(DiagnosticKind::ParseError.blocks_segment());
        assert!(DiagnosticKind::Unsupported.blocks_segment());
        assert!(!DiagnosticKind::UnknownParam.blocks_segment());
        assert!(!DiagnosticKind::Warning.blocks_segment());
    }
}

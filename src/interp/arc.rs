//! Arc Resolver
//!
//! Validates G2/G3 parameters against the active plane and computes the
//! arc center, either from a signed-less radius (R) or from center offsets
//! (I/J/K). All inputs are millimeters.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::path::{ArcDirection, Axis, CenterOffset, Position};
use crate::interp::modal::Plane;
use crate::parser::Block;

/// Allowed difference between the end point's distance from the center and the radius
pub const DEFAULT_ENDPOINT_TOLERANCE: f64 = 0.01;

/// Smallest radius an R arc may use
pub const MIN_RADIUS: f64 = 0.001;

const ZERO: f64 = 1e-9;

/// Arc words of one line, scaled to millimeters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArcParams {
    pub r: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub k: Option<f64>,
}

impl ArcParams {
    pub fn from_block(block: &Block, scale: f64) -> Self {
        let scaled = |letter| block.value_of(letter).map(|v| v * scale);
        Self {
            r: scaled('R'),
            i: scaled('I'),
            j: scaled('J'),
            k: scaled('K'),
        }
    }

    /// Offset word along an axis (I→X, J→Y, K→Z)
    pub fn offset(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
        }
    }

    /// Offset words present on the line, with their letters
    pub fn offsets(&self) -> impl Iterator<Item = (char, f64)> {
        [('I', self.i), ('J', self.j), ('K', self.k)]
            .into_iter()
            .filter_map(|(letter, value)| value.map(|v| (letter, v)))
    }
}

/// How the arc center was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcMethod {
    Radius,
    CenterOffset,
}

/// Pre-check of arc parameters against a plane
#[derive(Debug, Clone, PartialEq)]
pub struct ArcValidation {
    /// R present and positive
    pub has_radius: bool,
    /// Both of the plane's offset letters present
    pub has_offset: bool,
    pub radius_value: Option<f64>,
    /// In-plane offsets, in plane axis order
    pub offset_values: Option<(f64, f64)>,
    /// Plane offset letters absent from the line
    pub missing_offsets: Vec<char>,
    /// Radius implied by the in-plane offsets
    pub computed_radius: Option<f64>,
    pub plane_compatible: bool,
    pub errors: Vec<String>,
}

impl ArcValidation {
    pub fn new(plane: Plane, params: &ArcParams) -> Self {
        let (a, b) = plane.axes();
        let has_radius = params.r.is_some_and(|r| r > 0.0);
        let offset_values = params.offset(a).zip(params.offset(b));
        let has_offset = offset_values.is_some();
        let computed_radius = offset_values.map(|(u, v)| u.hypot(v));
        let plane_compatible = has_radius || has_offset;

        let letters = plane.offset_letters();
        let missing_offsets: Vec<char> = letters
            .into_iter()
            .filter(|&letter| offset_axis(letter).and_then(|axis| params.offset(axis)).is_none())
            .collect();

        let mut errors = Vec::new();
        if !has_radius && missing_offsets.len() == letters.len() {
            errors.push(format!(
                "Arc in {} plane ({}) requires R > 0 or {}/{} center offsets",
                plane.name(),
                plane.gcode(),
                letters[0],
                letters[1]
            ));
        } else if !has_radius && !has_offset {
            let missing: Vec<String> = missing_offsets.iter().map(char::to_string).collect();
            errors.push(format!(
                "Missing required {} plane ({}) center offset: {}",
                plane.name(),
                plane.gcode(),
                missing.join(", ")
            ));
        } else if !has_radius && computed_radius.is_some_and(|r| r <= ZERO) {
            errors.push(format!(
                "Arc center offsets {}/{} give a zero radius",
                letters[0], letters[1]
            ));
        }

        Self {
            has_radius,
            has_offset,
            radius_value: params.r,
            offset_values,
            missing_offsets,
            computed_radius,
            plane_compatible,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn offset_axis(letter: char) -> Option<Axis> {
    match letter {
        'I' => Some(Axis::X),
        'J' => Some(Axis::Y),
        'K' => Some(Axis::Z),
        _ => None,
    }
}

/// Why an arc line cannot produce a segment
#[derive(Debug, Clone, PartialEq)]
pub enum ArcError {
    /// Neither a positive R nor both of the plane's center offsets
    MissingParameters(String),
    /// Parameters present but describing no valid arc
    Geometry(String),
}

impl ArcError {
    pub fn message(&self) -> &str {
        match self {
            ArcError::MissingParameters(message) | ArcError::Geometry(message) => message,
        }
    }

    pub fn into_message(self) -> String {
        match self {
            ArcError::MissingParameters(message) | ArcError::Geometry(message) => message,
        }
    }
}

impl fmt::Display for ArcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A fully determined arc
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArc {
    pub direction: ArcDirection,
    pub center_offset: CenterOffset,
    pub radius: f64,
    pub method: ArcMethod,
    /// Offset words present on the line but not used for the center
    pub overridden: BTreeMap<char, f64>,
    /// Non-fatal findings, reported as warnings
    pub advisories: Vec<String>,
}

/// Resolve an arc from `start` to `end`. An error means the line has to be
/// reported as a parse error and produces no segment.
pub fn resolve_arc(
    direction: ArcDirection,
    plane: Plane,
    start: Position,
    end: Position,
    params: &ArcParams,
    tolerance: f64,
) -> Result<ResolvedArc, ArcError> {
    let validation = ArcValidation::new(plane, params);
    if let Some(error) = validation.errors.into_iter().next() {
        return Err(if validation.plane_compatible {
            ArcError::Geometry(error)
        } else {
            ArcError::MissingParameters(error)
        });
    }

    let (a, b) = plane.axes();
    let (sa, sb) = (start.get(a), start.get(b));
    let (ea, eb) = (end.get(a), end.get(b));
    let in_plane = plane.offset_letters();
    let mut advisories = Vec::new();

    let ((ca, cb), radius, method, overridden) = match validation.radius_value {
        Some(r) if validation.has_radius => {
            let center = radius_center(direction, (sa, sb), (ea, eb), r, &mut advisories)?;
            let overridden = params.offsets().collect();
            (center, r, ArcMethod::Radius, overridden)
        }
        _ => {
            if let Some(r) = validation.radius_value {
                advisories.push(format!(
                    "Non-positive radius R={} ignored; using center offsets",
                    r
                ));
            }
            let (oa, ob) = validation.offset_values.unwrap_or_default();
            let radius = validation.computed_radius.unwrap_or_default();
            let center = (sa + oa, sb + ob);

            let end_distance = (ea - center.0).hypot(eb - center.1);
            if (end_distance - radius).abs() > tolerance {
                return Err(ArcError::Geometry(format!(
                    "Inconsistent arc: end point is {:.4} from center, radius {:.4}",
                    end_distance, radius
                )));
            }
            let overridden = params
                .offsets()
                .filter(|(letter, _)| !in_plane.contains(letter))
                .collect();
            (center, radius, ArcMethod::CenterOffset, overridden)
        }
    };

    let mut center_offset = CenterOffset::default();
    center_offset.set_along(a, ca - sa);
    center_offset.set_along(b, cb - sb);

    Ok(ResolvedArc {
        direction,
        center_offset,
        radius,
        method,
        overridden,
        advisories,
    })
}

/// Center of the shorter arc of radius `r` through both points, in plane coordinates
fn radius_center(
    direction: ArcDirection,
    (sa, sb): (f64, f64),
    (ea, eb): (f64, f64),
    r: f64,
    advisories: &mut Vec<String>,
) -> Result<(f64, f64), ArcError> {
    if r < MIN_RADIUS {
        return Err(ArcError::Geometry(format!(
            "Arc radius R={} is below {} mm and cannot be resolved reliably",
            r, MIN_RADIUS
        )));
    }

    let (da, db) = (ea - sa, eb - sb);
    let chord = da.hypot(db);
    if chord <= ZERO {
        advisories.push(format!(
            "Arc with R={} has coincident start and end; drawn as a full circle",
            r
        ));
        return Ok((sa + r, sb));
    }

    let half = chord / 2.0;
    if r < half - ZERO {
        return Err(ArcError::Geometry(format!(
            "Radius R={} too small for chord length {:.4}, minimum radius {:.4}",
            r, chord, half
        )));
    }

    let mid = ((sa + ea) / 2.0, (sb + eb) / 2.0);
    let h = (r * r - half * half).max(0.0).sqrt();
    // Left normal of the chord direction
    let (na, nb) = (-db / chord, da / chord);
    let sign = match direction {
        ArcDirection::CounterClockwise => 1.0,
        ArcDirection::Clockwise => -1.0,
    };

    Ok((mid.0 + sign * h * na, mid.1 + sign * h * nb))
}

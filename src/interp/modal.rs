//! Modal State Tracker
//!
//! Interpreter context that persists across lines: motion mode, plane,
//! units, distance mode, feed mode, work offset, spindle, coolant.

use serde::Serialize;

use crate::core::path::{ArcDirection, Axis, MotionKind};
use crate::parser::Block;

/// Motion mode (modal group 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    #[default]
    Rapid,
    Feed,
    ClockwiseArc,
    CounterClockwiseArc,
}

impl MotionMode {
    pub fn kind(&self) -> MotionKind {
        match self {
            MotionMode::Rapid => MotionKind::Rapid,
            MotionMode::Feed => MotionKind::Feed,
            MotionMode::ClockwiseArc | MotionMode::CounterClockwiseArc => MotionKind::Arc,
        }
    }

    pub fn arc_direction(&self) -> Option<ArcDirection> {
        match self {
            MotionMode::ClockwiseArc => Some(ArcDirection::Clockwise),
            MotionMode::CounterClockwiseArc => Some(ArcDirection::CounterClockwise),
            MotionMode::Rapid | MotionMode::Feed => None,
        }
    }
}

/// Working plane for arcs (modal group 2)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    /// G17
    #[default]
    Xy,
    /// G18
    Xz,
    /// G19
    Yz,
}

impl Plane {
    /// In-plane axes ordered so that their cross product points along the
    /// plane normal (X×Y=Z, Z×X=Y, Y×Z=X).
    pub fn axes(&self) -> (Axis, Axis) {
        match self {
            Plane::Xy => (Axis::X, Axis::Y),
            Plane::Xz => (Axis::Z, Axis::X),
            Plane::Yz => (Axis::Y, Axis::Z),
        }
    }

    /// Center offset letters used in this plane, in conventional order
    pub fn offset_letters(&self) -> [char; 2] {
        match self {
            Plane::Xy => ['I', 'J'],
            Plane::Xz => ['I', 'K'],
            Plane::Yz => ['J', 'K'],
        }
    }

    pub fn gcode(&self) -> &'static str {
        match self {
            Plane::Xy => "G17",
            Plane::Xz => "G18",
            Plane::Yz => "G19",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plane::Xy => "XY",
            Plane::Xz => "XZ",
            Plane::Yz => "YZ",
        }
    }
}

/// Length units (modal group 6)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Inch,
    #[default]
    Millimeter,
}

impl Units {
    /// Factor converting a literal in these units to millimeters
    pub fn scale(&self) -> f64 {
        match self {
            Units::Inch => 25.4,
            Units::Millimeter => 1.0,
        }
    }
}

/// Distance mode (modal group 3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    #[default]
    Absolute,
    Incremental,
}

/// Feed rate mode (modal group 5)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    #[default]
    UnitsPerMinute,
}

/// Work coordinate system (modal group 12)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum CoordinateSystem {
    #[default]
    G54,
    G55,
    G56,
    G57,
    G58,
    G59,
}

impl CoordinateSystem {
    fn from_number(n: u32) -> Option<Self> {
        match n {
            54 => Some(CoordinateSystem::G54),
            55 => Some(CoordinateSystem::G55),
            56 => Some(CoordinateSystem::G56),
            57 => Some(CoordinateSystem::G57),
            58 => Some(CoordinateSystem::G58),
            59 => Some(CoordinateSystem::G59),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Spindle {
    Clockwise { speed: Option<f64> },
    CounterClockwise { speed: Option<f64> },
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coolant {
    Mist,
    Flood,
    Off,
}

/// A recognized G or M code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Motion(MotionMode),
    Plane(Plane),
    Units(Units),
    Distance(DistanceMode),
    FeedMode(FeedMode),
    CoordSystem(CoordinateSystem),
    /// G4
    Dwell,
    /// G28
    Home,
    /// M0, M1
    Pause,
    /// M2, M30
    ProgramEnd,
    /// M3 (Some(Clockwise)), M4, M5
    Spindle(SpindleCode),
    /// M6
    ToolChange,
    Coolant(Coolant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpindleCode {
    Clockwise,
    CounterClockwise,
    Stop,
}

impl Command {
    /// Classify a G/M word. Unrecognized codes come back as their display text.
    pub fn from_word(letter: char, value: f64) -> Result<Command, String> {
        let code = format_code(letter, value);
        if value.fract() != 0.0 || value < 0.0 {
            return Err(code);
        }
        let number = value as u32;

        let command = match (letter, number) {
            ('G', 0) => Command::Motion(MotionMode::Rapid),
            ('G', 1) => Command::Motion(MotionMode::Feed),
            ('G', 2) => Command::Motion(MotionMode::ClockwiseArc),
            ('G', 3) => Command::Motion(MotionMode::CounterClockwiseArc),
            ('G', 4) => Command::Dwell,
            ('G', 17) => Command::Plane(Plane::Xy),
            ('G', 18) => Command::Plane(Plane::Xz),
            ('G', 19) => Command::Plane(Plane::Yz),
            ('G', 20) => Command::Units(Units::Inch),
            ('G', 21) => Command::Units(Units::Millimeter),
            ('G', 28) => Command::Home,
            ('G', 90) => Command::Distance(DistanceMode::Absolute),
            ('G', 91) => Command::Distance(DistanceMode::Incremental),
            ('G', 94) => Command::FeedMode(FeedMode::UnitsPerMinute),
            ('G', n @ 54..=59) => match CoordinateSystem::from_number(n) {
                Some(cs) => Command::CoordSystem(cs),
                None => return Err(code),
            },
            ('M', 0) | ('M', 1) => Command::Pause,
            ('M', 2) | ('M', 30) => Command::ProgramEnd,
            ('M', 3) => Command::Spindle(SpindleCode::Clockwise),
            ('M', 4) => Command::Spindle(SpindleCode::CounterClockwise),
            ('M', 5) => Command::Spindle(SpindleCode::Stop),
            ('M', 6) => Command::ToolChange,
            ('M', 7) => Command::Coolant(Coolant::Mist),
            ('M', 8) => Command::Coolant(Coolant::Flood),
            ('M', 9) => Command::Coolant(Coolant::Off),
            _ => return Err(code),
        };

        Ok(command)
    }
}

/// Display form of a code word, e.g. "G1", "M30", "G38.2"
pub fn format_code(letter: char, value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        format!("{}{}", letter, value as i64)
    } else {
        format!("{}{}", letter, value)
    }
}

/// Persistent interpreter context of one parse run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModalState {
    pub motion: MotionMode,
    pub plane: Plane,
    pub units: Units,
    pub distance_mode: DistanceMode,
    pub feed_mode: FeedMode,
    pub coord_system: CoordinateSystem,
    pub spindle: Option<Spindle>,
    pub coolant: Option<Coolant>,
    /// Last programmed feed rate in millimeters per minute
    pub feed_rate: Option<f64>,
    /// Tool loaded by the last M6
    pub tool: Option<u32>,
}

impl ModalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a recognized code. Codes without a modal effect (dwell, home,
    /// pause, program end) leave the state untouched; program end is
    /// applied by the caller through [`ModalState::reset`] once the line is done.
    pub fn apply(&mut self, command: Command, block: &Block) {
        match command {
            Command::Motion(mode) => self.motion = mode,
            Command::Plane(plane) => self.plane = plane,
            Command::Units(units) => self.units = units,
            Command::Distance(mode) => self.distance_mode = mode,
            Command::FeedMode(mode) => self.feed_mode = mode,
            Command::CoordSystem(cs) => self.coord_system = cs,
            Command::Spindle(code) => {
                let speed = block.value_of('S').filter(|s| *s >= 0.0);
                self.spindle = Some(match code {
                    SpindleCode::Clockwise => Spindle::Clockwise { speed },
                    SpindleCode::CounterClockwise => Spindle::CounterClockwise { speed },
                    SpindleCode::Stop => Spindle::Off,
                });
            }
            Command::Coolant(coolant) => self.coolant = Some(coolant),
            Command::ToolChange => {
                if let Some(tool) = block.value_of('T').filter(|t| *t >= 0.0) {
                    self.tool = Some(tool as u32);
                }
            }
            Command::Dwell | Command::Home | Command::Pause | Command::ProgramEnd => {}
        }
    }

    /// Back to power-on defaults (M2/M30)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_line, ParsedLine};

    fn block(line: &str) -> Block {
        match parse_line(line) {
            ParsedLine::Block(block) => block,
            other => panic!("Expected block, got {:?}", other),
        }
    }

    fn apply_line(state: &mut ModalState, line: &str) {
        let block = block(line);
        for p in block.params() {
            if matches!(p.letter, 'G' | 'M') {
                if let Ok(command) = Command::from_word(p.letter, p.value) {
                    state.apply(command, &block);
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let state = ModalState::new();
        assert_eq!(state.motion, MotionMode::Rapid);
        assert_eq!(state.plane, Plane::Xy);
        assert_eq!(state.units, Units::Millimeter);
        assert_eq!(state.distance_mode, DistanceMode::Absolute);
        assert_eq!(state.feed_mode, FeedMode::UnitsPerMinute);
        assert_eq!(state.coord_system, CoordinateSystem::G54);
        assert_eq!(state.spindle, None);
        assert_eq!(state.coolant, None);
    }

    #[test]
    fn test_modal_groups() {
        let mut state = ModalState::new();
        apply_line(&mut state, "G91 G18 G20 G56 G3");

        assert_eq!(state.distance_mode, DistanceMode::Incremental);
        assert_eq!(state.plane, Plane::Xz);
        assert_eq!(state.units, Units::Inch);
        assert_eq!(state.coord_system, CoordinateSystem::G56);
        assert_eq!(state.motion, MotionMode::CounterClockwiseArc);
    }

    #[test]
    fn test_spindle_captures_speed() {
        let mut state = ModalState::new();
        apply_line(&mut state, "M3 S12000");
        assert_eq!(
            state.spindle,
            Some(Spindle::Clockwise {
                speed: Some(12000.0)
            })
        );

        apply_line(&mut state, "M4");
        assert_eq!(state.spindle, Some(Spindle::CounterClockwise { speed: None }));

        apply_line(&mut state, "M5");
        assert_eq!(state.spindle, Some(Spindle::Off));
    }

    #[test]
    fn test_coolant_and_tool() {
        let mut state = ModalState::new();
        apply_line(&mut state, "M8");
        assert_eq!(state.coolant, Some(Coolant::Flood));
        apply_line(&mut state, "M7");
        assert_eq!(state.coolant, Some(Coolant::Mist));
        apply_line(&mut state, "M9");
        assert_eq!(state.coolant, Some(Coolant::Off));

        apply_line(&mut state, "T3 M6");
        assert_eq!(state.tool, Some(3));
    }

    #[test]
    fn test_idempotent_codes() {
        let mut once = ModalState::new();
        apply_line(&mut once, "G91 G19");
        let mut twice = once.clone();
        apply_line(&mut twice, "G91 G19");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reset() {
        let mut state = ModalState::new();
        apply_line(&mut state, "G91 G20 G19 G1 M3 S100 M8");
        state.feed_rate = Some(250.0);
        state.reset();
        assert_eq!(state, ModalState::default());
    }

    #[test]
    fn test_unrecognized_codes() {
        assert_eq!(Command::from_word('G', 43.0), Err("G43".to_string()));
        assert_eq!(Command::from_word('G', 38.2), Err("G38.2".to_string()));
        assert_eq!(Command::from_word('M', 98.0), Err("M98".to_string()));
        assert_eq!(Command::from_word('G', 95.0), Err("G95".to_string()));
        assert_eq!(Command::from_word('G', 1.0), Ok(Command::Motion(MotionMode::Feed)));
    }

    #[test]
    fn test_plane_offsets() {
        assert_eq!(Plane::Xy.offset_letters(), ['I', 'J']);
        assert_eq!(Plane::Xz.offset_letters(), ['I', 'K']);
        assert_eq!(Plane::Yz.offset_letters(), ['J', 'K']);
    }
}

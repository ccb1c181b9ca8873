//! Position Updater
//!
//! Tracks the tool position and turns axis words into target positions.

use crate::core::path::{Axis, Position};
use crate::interp::modal::DistanceMode;
use crate::parser::Block;

/// Axis values below this are treated as unchanged
pub const POSITION_EPSILON: f64 = 1e-9;

const AXES: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

/// X/Y/Z words of one line, already scaled to millimeters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisWords {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl AxisWords {
    pub fn from_block(block: &Block, scale: f64) -> Self {
        Self {
            x: block.value_of('X').map(|v| v * scale),
            y: block.value_of('Y').map(|v| v * scale),
            z: block.value_of('Z').map(|v| v * scale),
        }
    }

    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Axes explicitly present on the line
    pub fn present(&self) -> impl Iterator<Item = Axis> + '_ {
        AXES.into_iter().filter(|axis| self.get(*axis).is_some())
    }
}

/// Current and previous tool positions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cursor {
    current: Position,
    previous: Position,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Position {
        self.current
    }

    pub fn previous(&self) -> Position {
        self.previous
    }

    /// Target of a move: absent axes keep their value, present ones are
    /// taken as-is (absolute) or added to the current value (incremental).
    pub fn target(&self, words: &AxisWords, mode: DistanceMode) -> Position {
        let mut target = self.current;
        for axis in AXES {
            if let Some(value) = words.get(axis) {
                let next = match mode {
                    DistanceMode::Absolute => value,
                    DistanceMode::Incremental => self.current.get(axis) + value,
                };
                target.set(axis, next);
            }
        }
        target
    }

    /// Whether moving to `target` changes any axis
    pub fn differs(&self, target: &Position) -> bool {
        AXES.into_iter()
            .any(|axis| (target.get(axis) - self.current.get(axis)).abs() > POSITION_EPSILON)
    }

    pub fn advance(&mut self, end: Position) {
        self.previous = self.current;
        self.current = end;
    }
}

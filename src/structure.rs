//! Program structure analysis
//!
//! A static read of a program's outline: header comments and metadata,
//! footer, work offsets, tool changes, spindle commands and subprograms.
//! Independent of the toolpath interpreter; no modal state is tracked.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::interp::modal::{Command, Coolant, CoordinateSystem, MotionMode, SpindleCode};
use crate::parser::{parse_line, Block, ParsedLine};

static METADATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 _.\-]*?)\s*:\s*(.*?)\s*$").expect("valid metadata regex")
});

/// Leading or trailing part of a program
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Section {
    pub detected: bool,
    pub comments: Vec<String>,
    /// Footer only: program-end and shutdown commands, uppercased
    pub commands: Vec<String>,
    /// 1-based lines belonging to the section
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolChange {
    pub line_no: usize,
    pub tool: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpindleCommand {
    pub line_no: usize,
    /// "M3", "M4" or "M5"
    pub code: String,
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubprogramDef {
    pub line_no: usize,
    pub number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubprogramCall {
    pub line_no: usize,
    /// P word of M98
    pub program: Option<u32>,
    /// L word of M98
    pub repeat: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramStructure {
    pub program_number: Option<u32>,
    pub header: Section,
    pub footer: Section,
    /// `KEY: value` pairs from header comments, keys lowercased
    pub metadata: BTreeMap<String, String>,
    /// Work offsets in order of first use
    pub coordinate_systems: Vec<CoordinateSystem>,
    pub tool_changes: Vec<ToolChange>,
    pub spindle_commands: Vec<SpindleCommand>,
    pub subprograms: Vec<SubprogramDef>,
    pub subprogram_calls: Vec<SubprogramCall>,
}

pub fn analyze_program_structure(text: &str) -> ProgramStructure {
    let lines: Vec<(usize, &str, ParsedLine)> = text
        .lines()
        .enumerate()
        .map(|(idx, raw)| (idx + 1, raw, parse_line(raw)))
        .collect();

    let mut structure = ProgramStructure::default();
    let (header_end, program_line) = scan_header(&lines, &mut structure);
    scan_footer(&lines[header_end..], &mut structure.footer);

    for (line_no, _, parsed) in &lines {
        if let ParsedLine::Block(block) = parsed {
            let is_program_line = Some(*line_no) == program_line;
            scan_block(*line_no, block, is_program_line, &mut structure);
        }
    }

    log::debug!(
        "structure: {} header lines, {} footer lines, {} tool changes",
        structure.header.lines.len(),
        structure.footer.lines.len(),
        structure.tool_changes.len()
    );
    structure
}

/// Returns the index of the first line after the header and the line of
/// the program number, if any
fn scan_header(
    lines: &[(usize, &str, ParsedLine)],
    structure: &mut ProgramStructure,
) -> (usize, Option<usize>) {
    let mut program_line = None;
    for (idx, (line_no, _, parsed)) in lines.iter().enumerate() {
        match parsed {
            ParsedLine::Empty => {}
            ParsedLine::Comment(comment) => {
                let text = comment.text.trim();
                if let Some(captures) = METADATA_RE.captures(text) {
                    structure
                        .metadata
                        .insert(captures[1].to_lowercase(), captures[2].to_string());
                }
                structure.header.comments.push(text.to_string());
                structure.header.lines.push(*line_no);
            }
            ParsedLine::Block(block)
                if structure.program_number.is_none() && is_program_number(block) =>
            {
                structure.program_number = non_negative(block.value_of('O'));
                program_line = Some(*line_no);
                if let Some(comment) = &block.comment {
                    structure.header.comments.push(comment.text.trim().to_string());
                }
                structure.header.lines.push(*line_no);
            }
            _ => {
                structure.header.detected = !structure.header.lines.is_empty();
                return (idx, program_line);
            }
        }
    }

    structure.header.detected = !structure.header.lines.is_empty();
    (lines.len(), program_line)
}

fn scan_footer(lines: &[(usize, &str, ParsedLine)], footer: &mut Section) {
    for (line_no, raw, parsed) in lines.iter().rev() {
        match parsed {
            ParsedLine::Empty => {}
            ParsedLine::Comment(comment) => {
                footer.comments.insert(0, comment.text.trim().to_string());
                footer.lines.insert(0, *line_no);
            }
            ParsedLine::Block(block) if is_footer_block(block) => {
                footer.commands.insert(0, raw.trim().to_uppercase());
                footer.lines.insert(0, *line_no);
            }
            _ => break,
        }
    }
    footer.detected = !footer.lines.is_empty();
}

fn scan_block(
    line_no: usize,
    block: &Block,
    is_program_line: bool,
    structure: &mut ProgramStructure,
) {
    for param in block.params() {
        match param.letter {
            'G' | 'M' => match Command::from_word(param.letter, param.value) {
                Ok(Command::CoordSystem(cs)) => {
                    if !structure.coordinate_systems.contains(&cs) {
                        structure.coordinate_systems.push(cs);
                    }
                }
                Ok(Command::ToolChange) => structure.tool_changes.push(ToolChange {
                    line_no,
                    tool: non_negative(block.value_of('T')),
                }),
                Ok(Command::Spindle(code)) => {
                    let (name, speed) = match code {
                        SpindleCode::Clockwise => ("M3", block.value_of('S')),
                        SpindleCode::CounterClockwise => ("M4", block.value_of('S')),
                        SpindleCode::Stop => ("M5", None),
                    };
                    structure.spindle_commands.push(SpindleCommand {
                        line_no,
                        code: name.to_string(),
                        speed,
                    });
                }
                Err(_) if param.letter == 'M' && param.value == 98.0 => {
                    structure.subprogram_calls.push(SubprogramCall {
                        line_no,
                        program: non_negative(block.value_of('P')),
                        repeat: non_negative(block.value_of('L')),
                    });
                }
                _ => {}
            },
            'O' if !is_program_line => {
                if let Some(number) = non_negative(Some(param.value)) {
                    structure.subprograms.push(SubprogramDef { line_no, number });
                }
            }
            _ => {}
        }
    }
}

fn non_negative(value: Option<f64>) -> Option<u32> {
    value.filter(|v| *v >= 0.0).map(|v| v as u32)
}

/// A lone O word, e.g. "O1234 (MAIN)"
fn is_program_number(block: &Block) -> bool {
    block.words.len() == 1 && block.params().all(|p| p.letter == 'O')
}

/// Lines made only of program-end, shutdown or retract codes
fn is_footer_block(block: &Block) -> bool {
    let mut codes = block
        .params()
        .filter(|p| matches!(p.letter, 'G' | 'M'))
        .peekable();
    if codes.peek().is_none() {
        return false;
    }
    codes.all(|p| {
        matches!(
            Command::from_word(p.letter, p.value),
            Ok(Command::ProgramEnd
                | Command::Home
                | Command::Motion(MotionMode::Rapid)
                | Command::Spindle(SpindleCode::Stop)
                | Command::Coolant(Coolant::Off))
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "\
O1234 (BRACKET)
; Author: J. Smith
; Material: 6061
(Setup sheet rev B)
G21 G90 G54
T2 M6
M3 S8000
G0 X0 Y0
G1 X10 F300
G55
M98 P100 L3
G0 Z50
M5
M30
; end of program
";

    #[test]
    fn test_header_and_metadata() {
        let s = analyze_program_structure(PROGRAM);
        assert!(s.header.detected);
        assert_eq!(s.program_number, Some(1234));
        assert_eq!(s.header.lines, vec![1, 2, 3, 4]);
        assert_eq!(s.header.comments[0], "BRACKET");
        assert_eq!(s.metadata.get("author").map(String::as_str), Some("J. Smith"));
        assert_eq!(s.metadata.get("material").map(String::as_str), Some("6061"));
    }

    #[test]
    fn test_footer() {
        let s = analyze_program_structure(PROGRAM);
        assert!(s.footer.detected);
        assert_eq!(s.footer.commands, vec!["G0 Z50", "M5", "M30"]);
        assert_eq!(s.footer.comments, vec!["end of program"]);
        assert_eq!(s.footer.lines, vec![12, 13, 14, 15]);
    }

    #[test]
    fn test_program_flow() {
        let s = analyze_program_structure(PROGRAM);
        assert_eq!(
            s.coordinate_systems,
            vec![CoordinateSystem::G54, CoordinateSystem::G55]
        );
        assert_eq!(
            s.tool_changes,
            vec![ToolChange {
                line_no: 6,
                tool: Some(2)
            }]
        );
        assert_eq!(s.spindle_commands.len(), 2);
        assert_eq!(s.spindle_commands[0].code, "M3");
        assert_eq!(s.spindle_commands[0].speed, Some(8000.0));
        assert_eq!(s.spindle_commands[1].code, "M5");
        assert_eq!(
            s.subprogram_calls,
            vec![SubprogramCall {
                line_no: 11,
                program: Some(100),
                repeat: Some(3)
            }]
        );
        assert!(s.subprograms.is_empty());
    }

    #[test]
    fn test_subprogram_definitions() {
        let s = analyze_program_structure("G0 X1\nM30\nO100\nG1 X2\nM99\n");
        assert_eq!(s.program_number, None);
        assert_eq!(
            s.subprograms,
            vec![SubprogramDef {
                line_no: 3,
                number: 100
            }]
        );
    }

    #[test]
    fn test_empty_program() {
        let s = analyze_program_structure("");
        assert_eq!(s, ProgramStructure::default());
    }
}

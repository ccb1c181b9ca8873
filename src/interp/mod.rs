//! Parser Engine
//!
//! Drives a parse run line by line: tokenize, apply modal codes, compute
//! the target position, resolve arcs, and append segments, diagnostics and
//! layers in source order. The run never fails; every problem becomes a
//! diagnostic on its line.

pub mod arc;
pub mod modal;
pub mod position;

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::config::ParserOptions;
use crate::core::builder::{ParseResult, PathBuilder};
use crate::core::path::{DiagnosticCategory, DiagnosticContext, MotionKind, MotionSegment, Position};
use crate::parser::{Block, LayerMarker, LineTokenizer, ParsedLine, Word};
use crate::validation::{is_accepted_letter, LineDiagnostics};

use arc::{resolve_arc, ArcParams};
use modal::{format_code, Command, ModalState};
use position::{AxisWords, Cursor};

/// Per-line flags collected while applying codes
#[derive(Debug, Default)]
struct LineCodes {
    explicit_motion: bool,
    dwell: bool,
    home: bool,
    program_end: bool,
}

/// Incremental parse of one program
#[derive(Debug)]
pub struct ParseRun {
    options: ParserOptions,
    tokenizer: LineTokenizer,
    modal: ModalState,
    cursor: Cursor,
    builder: PathBuilder,
    lines: usize,
}

impl Default for ParseRun {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl ParseRun {
    pub fn new(options: ParserOptions) -> Self {
        let tokenizer = LineTokenizer::new(&options.layer_marker).unwrap_or_else(|e| {
            log::warn!(
                "Invalid layer marker {:?} ({}), using default",
                options.layer_marker,
                e
            );
            LineTokenizer::default()
        });

        Self {
            options,
            tokenizer,
            modal: ModalState::new(),
            cursor: Cursor::new(),
            builder: PathBuilder::new(),
            lines: 0,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn modal_state(&self) -> &ModalState {
        &self.modal
    }

    pub fn position(&self) -> Position {
        self.cursor.current()
    }

    /// Number of lines consumed so far
    pub fn lines_consumed(&self) -> usize {
        self.lines
    }

    /// Everything produced so far
    pub fn view(&self) -> &ParseResult {
        self.builder.view()
    }

    pub fn finish(self) -> ParseResult {
        self.builder.finish()
    }

    /// Feed a batch of lines; returns how many were consumed
    pub fn push_batch<'a, I>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let before = self.lines;
        for line in lines {
            self.push_line(line);
        }
        self.lines - before
    }

    /// Interpret the next line of the program
    pub fn push_line(&mut self, raw: &str) {
        self.lines += 1;
        let line_no = self.lines;

        match self.tokenizer.tokenize(raw) {
            ParsedLine::Empty | ParsedLine::Comment(_) => {}
            ParsedLine::LayerMarker(LayerMarker::Index(index)) => {
                self.builder.open_layer(index, line_no);
            }
            ParsedLine::LayerMarker(LayerMarker::Malformed(text)) => {
                let mut diagnostics = LineDiagnostics::new(line_no, raw);
                diagnostics.add_parse_error(
                    DiagnosticCategory::LayerFormat,
                    format!("Invalid layer comment format: '{}'", text),
                );
                self.builder.extend_diagnostics(diagnostics.into_diagnostics());
            }
            ParsedLine::Block(block) => self.interpret_block(line_no, raw, &block),
        }
    }

    fn interpret_block(&mut self, line_no: usize, raw: &str, block: &Block) {
        let mut diagnostics = LineDiagnostics::new(line_no, raw);
        let codes = self.apply_words(block, &mut diagnostics);

        if codes.dwell && block.value_of('P').is_none() {
            diagnostics.add_warning("Dwell (G4) without P parameter".to_string());
        }

        let segment = if codes.home {
            Some(self.linear_segment(
                MotionKind::Rapid,
                self.options.home(),
                line_no,
                raw,
            ))
        } else {
            self.motion_segment(line_no, raw, block, codes.explicit_motion, &mut diagnostics)
        };

        // A blocked line keeps its modal effects but neither moves nor draws
        let segment = segment.filter(|_| !diagnostics.blocks_segment());

        let context = || line_context(block, &self.modal);
        self.builder.extend_diagnostics(diagnostics.into_diagnostics_with(context));
        if let Some(segment) = segment {
            self.cursor.advance(segment.end);
            self.builder.push_motion(segment);
        }

        if codes.program_end {
            log::debug!("program end at line {}, modal state reset", line_no);
            self.modal.reset();
        }
    }

    /// Classify every word, apply modal codes and range-check parameters
    fn apply_words(&mut self, block: &Block, diagnostics: &mut LineDiagnostics) -> LineCodes {
        let mut codes = LineCodes::default();
        let mut feed = None;

        for word in &block.words {
            let param = match word {
                Word::Invalid(invalid) => {
                    diagnostics.add_invalid_word(invalid);
                    continue;
                }
                Word::Param(param) => param,
            };

            match param.letter {
                'G' | 'M' => match Command::from_word(param.letter, param.value) {
                    Ok(command) => {
                        match command {
                            Command::Motion(_) => codes.explicit_motion = true,
                            Command::Dwell => codes.dwell = true,
                            Command::Home => codes.home = true,
                            Command::ProgramEnd => codes.program_end = true,
                            _ => {}
                        }
                        self.modal.apply(command, block);
                    }
                    Err(code) => diagnostics.add_unsupported(&code),
                },
                'F' => {
                    if diagnostics.check_parameter(param) {
                        feed = Some(param.value);
                    }
                }
                letter if is_accepted_letter(letter) => {
                    diagnostics.check_parameter(param);
                }
                _ => diagnostics.add_unknown_param(param),
            }
        }

        // Scaled after the loop so G20/G21 anywhere on the line applies
        if let Some(feed) = feed {
            self.modal.feed_rate = Some(feed * self.modal.units.scale());
        }

        codes
    }

    /// Segment for the active motion mode, if the line moves the tool
    fn motion_segment(
        &self,
        line_no: usize,
        raw: &str,
        block: &Block,
        explicit_motion: bool,
        diagnostics: &mut LineDiagnostics,
    ) -> Option<MotionSegment> {
        let scale = self.modal.units.scale();
        let words = AxisWords::from_block(block, scale);
        let target = self.cursor.target(&words, self.modal.distance_mode);

        if !explicit_motion && !self.cursor.differs(&target) {
            return None;
        }

        let threshold = self.options.coordinate_warning_threshold;
        let segment = match self.modal.motion.arc_direction() {
            None => self.linear_segment(self.modal.motion.kind(), target, line_no, raw),
            Some(direction) => {
                let params = ArcParams::from_block(block, scale);
                let start = self.cursor.current();
                let arc = match resolve_arc(
                    direction,
                    self.modal.plane,
                    start,
                    target,
                    &params,
                    self.options.arc_endpoint_tolerance,
                ) {
                    Ok(arc) => arc,
                    Err(error) => {
                        diagnostics.add_arc_error(error, self.modal.plane);
                        return None;
                    }
                };
                if diagnostics.blocks_segment() {
                    return None;
                }
                diagnostics.check_offsets(&params, threshold);
                for advisory in arc.advisories {
                    diagnostics.add_warning(advisory);
                }

                MotionSegment {
                    kind: MotionKind::Arc,
                    start,
                    end: target,
                    line_no,
                    raw_line: raw.to_string(),
                    plane: self.modal.plane,
                    coord_system: self.modal.coord_system,
                    feed_rate: self.modal.feed_rate,
                    direction: Some(arc.direction),
                    center_offset: Some(arc.center_offset),
                    radius: Some(arc.radius),
                    overridden_params: arc.overridden,
                    modal_state: self.modal.clone(),
                }
            }
        };

        if !diagnostics.blocks_segment() {
            diagnostics.check_coordinates(&words, &target, threshold);
        }
        Some(segment)
    }

    fn linear_segment(
        &self,
        kind: MotionKind,
        end: Position,
        line_no: usize,
        raw: &str,
    ) -> MotionSegment {
        let feed_rate = match kind {
            MotionKind::Rapid => None,
            MotionKind::Feed | MotionKind::Arc => self.modal.feed_rate,
        };

        MotionSegment {
            kind,
            start: self.cursor.current(),
            end,
            line_no,
            raw_line: raw.to_string(),
            plane: self.modal.plane,
            coord_system: self.modal.coord_system,
            feed_rate,
            direction: None,
            center_offset: None,
            radius: None,
            overridden_params: BTreeMap::new(),
            modal_state: self.modal.clone(),
        }
    }
}

/// Leading command and parameter letters of a block, with the modal state
/// after the block's codes were applied
fn line_context(block: &Block, modal: &ModalState) -> DiagnosticContext {
    let command = block
        .params()
        .find(|p| matches!(p.letter, 'G' | 'M'))
        .map(|p| format_code(p.letter, p.value));
    let parameters = block
        .params()
        .filter(|p| !matches!(p.letter, 'G' | 'M'))
        .map(|p| p.letter)
        .collect();

    DiagnosticContext {
        command,
        parameters,
        modal_state: modal.clone(),
    }
}

/// Parse a whole program with default options
pub fn parse(text: &str) -> ParseResult {
    parse_with_options(text, &ParserOptions::default())
}

pub fn parse_with_options(text: &str, options: &ParserOptions) -> ParseResult {
    let mut run = ParseRun::new(options.clone());
    run.push_batch(text.lines());
    run.finish()
}

/// Parse in batches of `batch_size` lines, calling `on_batch` after each.
/// Returning `ControlFlow::Break` stops the run; the result then holds
/// everything produced up to that point.
pub fn parse_batched<F>(
    text: &str,
    options: &ParserOptions,
    batch_size: usize,
    mut on_batch: F,
) -> ParseResult
where
    F: FnMut(&ParseRun) -> ControlFlow<()>,
{
    let batch_size = batch_size.max(1);
    let mut run = ParseRun::new(options.clone());
    let mut lines = text.lines();

    loop {
        let consumed = run.push_batch(lines.by_ref().take(batch_size));
        if consumed == 0 {
            break;
        }
        log::trace!("batch of {} lines done ({} total)", consumed, run.lines_consumed());
        if on_batch(&run).is_break() {
            log::info!("Parse cancelled after {} lines", run.lines_consumed());
            break;
        }
    }

    run.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path::{ArcDirection, DiagnosticKind, PathEntry};
    use crate::interp::modal::{CoordinateSystem, Plane};

    fn motions(result: &ParseResult) -> Vec<&MotionSegment> {
        result.motions().collect()
    }

    fn kinds(result: &ParseResult) -> Vec<DiagnosticKind> {
        result.diagnostics().map(|d| d.kind).collect()
    }

    #[test]
    fn test_simple_program() {
        let result = parse("G21 G90\nG0 X10 Y10\nG1 X20 F300\n");
        let segments = motions(&result);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, MotionKind::Rapid);
        assert_eq!(segments[0].end, Position::new(10.0, 10.0, 0.0));
        assert_eq!(segments[0].feed_rate, None);
        assert_eq!(segments[1].kind, MotionKind::Feed);
        assert_eq!(segments[1].start, Position::new(10.0, 10.0, 0.0));
        assert_eq!(segments[1].end, Position::new(20.0, 10.0, 0.0));
        assert_eq!(segments[1].feed_rate, Some(300.0));
        assert_eq!(segments[1].line_no, 3);
        assert!(result.diagnostics().next().is_none());
    }

    #[test]
    fn test_modal_motion_carries_over() {
        let result = parse("G1 X1 F100\nX2\nY3\n");
        let segments = motions(&result);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.kind == MotionKind::Feed));
        assert_eq!(segments[2].end, Position::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn test_explicit_motion_without_change_is_emitted() {
        let result = parse("G1 X5\nG1 X5\nX5\n");
        assert_eq!(motions(&result).len(), 2);
    }

    #[test]
    fn test_incremental_and_inches() {
        let result = parse("G20 G91\nG1 X1 F10\nX1\n");
        let segments = motions(&result);
        assert_eq!(segments[1].end, Position::new(50.8, 0.0, 0.0));
        let feed = segments[1].feed_rate.expect("feed rate");
        assert!((feed - 254.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_segment() {
        let result = parse("G17 G2 X10 Y0 I5 J0 F200\n");
        let arc = motions(&result)[0].clone();
        assert_eq!(arc.kind, MotionKind::Arc);
        assert_eq!(arc.direction, Some(ArcDirection::Clockwise));
        assert_eq!(arc.radius, Some(5.0));
        assert_eq!(arc.plane, Plane::Xy);
        assert_eq!(arc.center(), Some(Position::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_arc_without_parameters_is_parse_error() {
        let result = parse("G2 X10 Y10\nG1 X1\n");
        assert_eq!(kinds(&result), vec![DiagnosticKind::ParseError]);

        // Mode still switched; position unchanged
        let segments = motions(&result);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, Position::ORIGIN);
    }

    #[test]
    fn test_unsupported_code_blocks_segment_only() {
        let result = parse("G1 X10 G43 H1\nG1 X20\n");
        assert_eq!(kinds(&result), vec![DiagnosticKind::Unsupported]);

        let segments = motions(&result);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, Position::ORIGIN);
        assert_eq!(segments[0].kind, MotionKind::Feed);
    }

    #[test]
    fn test_unknown_param_keeps_segment() {
        let result = parse("G1 X10 Q5\n");
        assert_eq!(kinds(&result), vec![DiagnosticKind::UnknownParam]);
        assert_eq!(motions(&result).len(), 1);
        // Diagnostics come before the segment of the same line
        assert!(matches!(result.paths[0], PathEntry::Diagnostic(_)));
    }

    #[test]
    fn test_bad_feed_rate() {
        let result = parse("G1 X10 F0\n");
        assert_eq!(kinds(&result), vec![DiagnosticKind::ParseError]);
        assert!(motions(&result).is_empty());
    }

    #[test]
    fn test_program_end_resets_modal_state() {
        let mut run = ParseRun::default();
        run.push_batch(["G91 G20 G1 X1 F10", "M30"]);
        assert_eq!(run.modal_state(), &ModalState::default());
        assert_eq!(run.position(), Position::new(25.4, 0.0, 0.0));
    }

    #[test]
    fn test_home_goes_to_configured_position() {
        let options = ParserOptions {
            home_position: [0.0, 0.0, 50.0],
            ..ParserOptions::default()
        };
        let result = parse_with_options("G1 X10 F100\nG28\n", &options);
        let segments = motions(&result);
        assert_eq!(segments[1].kind, MotionKind::Rapid);
        assert_eq!(segments[1].end, Position::new(0.0, 0.0, 50.0));
    }

    #[test]
    fn test_coord_system_recorded() {
        let result = parse("G55\nG0 X1\n");
        assert_eq!(motions(&result)[0].coord_system, CoordinateSystem::G55);
    }

    #[test]
    fn test_layers() {
        let result = parse("G0 X1\n;LAYER:0\nG1 X2\n;LAYER:1\nG1 X3\nG1 X4\n");
        assert_eq!(result.layers.len(), 2);
        assert_eq!(result.layers[0].index, 0);
        assert_eq!(result.layers[0].segment_indices, vec![1]);
        assert_eq!(result.layers[1].segment_indices, vec![2, 3]);
    }

    #[test]
    fn test_malformed_layer_marker() {
        let result = parse(";LAYER:abc\n");
        let diagnostics: Vec<_> = result.diagnostics().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ParseError);
        assert!(result.layers.is_empty());
    }

    #[test]
    fn test_dwell_without_p() {
        let result = parse("G4\nG4 P1\n");
        assert_eq!(kinds(&result), vec![DiagnosticKind::Warning]);
        assert!(motions(&result).is_empty());
    }

    #[test]
    fn test_batched_matches_whole() {
        let text = "G1 X1 F100\n;LAYER:0\nG2 X3 Y0 R1\nG43\nG1 Y5 Q1\n";
        let whole = parse(text);
        let mut calls = 0;
        let batched = parse_batched(text, &ParserOptions::default(), 2, |_| {
            calls += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(whole, batched);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_batched_cancel() {
        let text = "G1 X1\nG1 X2\nG1 X3\nG1 X4\n";
        let result = parse_batched(text, &ParserOptions::default(), 2, |_| ControlFlow::Break(()));
        assert_eq!(result.motions().count(), 2);
    }
}

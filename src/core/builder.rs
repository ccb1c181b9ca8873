//! Path and layer assembly
//!
//! Owns the ordered output of a parse run. Entries are only ever appended.

use serde::Serialize;

use crate::core::path::{Diagnostic, MotionSegment, PathEntry};

/// Segments grouped under one layer marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub index: i64,
    /// Line of the marker comment
    pub line_no: usize,
    /// Indices into `ParseResult::paths` of the motion entries in this layer
    pub segment_indices: Vec<usize>,
}

/// Final result of a parse run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub paths: Vec<PathEntry>,
    pub layers: Vec<LayerInfo>,
}

impl ParseResult {
    pub fn motions(&self) -> impl Iterator<Item = &MotionSegment> {
        self.paths.iter().filter_map(PathEntry::as_motion)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.paths.iter().filter_map(PathEntry::as_diagnostic)
    }

    /// Motion segments of a layer, in order
    pub fn layer_segments<'a>(
        &'a self,
        layer: &'a LayerInfo,
    ) -> impl Iterator<Item = &'a MotionSegment> + 'a {
        layer
            .segment_indices
            .iter()
            .filter_map(|&idx| self.paths.get(idx).and_then(PathEntry::as_motion))
    }
}

/// Appends line outcomes in source order and tracks the open layer
#[derive(Debug, Default)]
pub struct PathBuilder {
    result: ParseResult,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new layer; the previous one is closed implicitly
    pub fn open_layer(&mut self, index: i64, line_no: usize) {
        log::debug!("layer {} opened at line {}", index, line_no);
        self.result.layers.push(LayerInfo {
            index,
            line_no,
            segment_indices: Vec::new(),
        });
    }

    /// Append a motion segment, recording it in the open layer. Returns its index.
    pub fn push_motion(&mut self, segment: MotionSegment) -> usize {
        let idx = self.result.paths.len();
        self.result.paths.push(PathEntry::Motion(segment));
        if let Some(layer) = self.result.layers.last_mut() {
            layer.segment_indices.push(idx);
        }
        idx
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.result.paths.push(PathEntry::Diagnostic(diagnostic));
    }

    pub fn extend_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push_diagnostic(diagnostic);
        }
    }

    /// Everything appended so far; always a valid result on its own
    pub fn view(&self) -> &ParseResult {
        &self.result
    }

    pub fn finish(self) -> ParseResult {
        self.result
    }
}

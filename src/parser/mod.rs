//! G-code Parser
//!
//! Line tokenization and syntax types. Layer marker detection lives here
//! because a marker is recognized before comments are stripped.

pub mod ast;
pub mod lexer;

use std::sync::LazyLock;

use regex::Regex;

pub use ast::{Block, Comment, InvalidWord, LayerMarker, Parameter, ParsedLine, Word};
pub use lexer::{tokenize_line, Token, TokenKind};

/// Layer marker prefix written by common slicers
pub const DEFAULT_LAYER_MARKER: &str = ";LAYER:";

static DEFAULT_TOKENIZER: LazyLock<LineTokenizer> = LazyLock::new(LineTokenizer::default);

/// Tokenizes lines, recognizing a configurable layer marker prefix
#[derive(Debug, Clone)]
pub struct LineTokenizer {
    layer_marker: Regex,
}

impl Default for LineTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER_MARKER).expect("default layer marker pattern is valid")
    }
}

impl LineTokenizer {
    /// Build a tokenizer for the given marker prefix (matched case-insensitively)
    pub fn new(layer_prefix: &str) -> Result<Self, regex::Error> {
        let pattern = format!(r"(?i)^\s*{}(.*)$", regex::escape(layer_prefix.trim()));
        Ok(Self {
            layer_marker: Regex::new(&pattern)?,
        })
    }

    /// Parse a single line of G-code into structured data
    pub fn tokenize(&self, line: &str) -> ParsedLine {
        if let Some(captures) = self.layer_marker.captures(line) {
            let tail = captures.get(1).map_or("", |m| m.as_str()).trim();
            // Parenthesized markers close on the same line
            let tail = tail.strip_suffix(')').map_or(tail, str::trim_end);
            let marker = match tail.parse::<i64>() {
                Ok(index) => LayerMarker::Index(index),
                Err(_) => LayerMarker::Malformed(line.trim().to_string()),
            };
            return ParsedLine::LayerMarker(marker);
        }

        ast::tokens_to_parsed_line(lexer::tokenize_line(line))
    }
}

/// Parse a single line with the default layer marker
pub fn parse_line(line: &str) -> ParsedLine {
    DEFAULT_TOKENIZER.tokenize(line)
}

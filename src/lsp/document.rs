use crate::config::ParserOptions;
use crate::core::builder::ParseResult;
use crate::interp::parse_with_options;

/// State for each open document
#[derive(Debug)]
pub struct DocumentState {
    pub content: String,
    /// Parse of `content`, refreshed on every change
    pub result: ParseResult,
    /// UTF-16 width of each line, indexed by 0-based line
    line_widths: Vec<u32>,
}

impl DocumentState {
    pub fn new(content: String, options: &ParserOptions) -> Self {
        let result = parse_with_options(&content, options);
        let line_widths = content
            .lines()
            .map(|line| line.encode_utf16().count() as u32)
            .collect();
        Self {
            content,
            result,
            line_widths,
        }
    }

    /// Length of a 1-based line in UTF-16 code units
    pub fn line_width(&self, line_no: usize) -> u32 {
        line_no
            .checked_sub(1)
            .and_then(|idx| self.line_widths.get(idx))
            .copied()
            .unwrap_or(0)
    }
}

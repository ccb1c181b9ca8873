//! Syntax types for tokenized G-code lines
//!
//! Pure data: words carry parsed numbers or the raw text that failed to
//! parse. Interpretation happens in the interpreter.

use crate::parser::lexer::{Token, TokenKind};

/// A parsed line of G-code
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Words with an optional trailing comment
    Block(Block),
    /// A comment-only line
    Comment(Comment),
    /// A layer marker comment such as `;LAYER:3`
    LayerMarker(LayerMarker),
    /// An empty or whitespace-only line
    Empty,
}

/// The instruction part of a line
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub words: Vec<Word>,
    pub comment: Option<Comment>,
}

/// One word of a block
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    Param(Parameter),
    Invalid(InvalidWord),
}

/// A well-formed word like "X10.5" or "G1"
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Uppercased letter
    pub letter: char,
    pub value: f64,
    /// Source text of the word
    pub text: String,
}

/// A word whose value could not be read
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidWord {
    /// Uppercased leading letter, if the word started with one
    pub letter: Option<char>,
    pub text: String,
}

/// A comment (semicolon or parenthetical)
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Comment text (without the delimiters)
    pub text: String,
}

/// Layer marker found on a line
#[derive(Debug, Clone, PartialEq)]
pub enum LayerMarker {
    Index(i64),
    /// Marker prefix present but no integer index; holds the marker text
    Malformed(String),
}

impl Block {
    /// Well-formed words in source order
    pub fn params(&self) -> impl DoubleEndedIterator<Item = &Parameter> {
        self.words.iter().filter_map(|w| match w {
            Word::Param(p) => Some(p),
            Word::Invalid(_) => None,
        })
    }

    /// Last value given for a letter on this line
    pub fn value_of(&self, letter: char) -> Option<f64> {
        self.params().rev().find(|p| p.letter == letter).map(|p| p.value)
    }
}

/// Convert tokens into a parsed line
pub fn tokens_to_parsed_line(tokens: Vec<Token>) -> ParsedLine {
    if tokens.is_empty() {
        return ParsedLine::Empty;
    }

    let mut words = Vec::new();
    let mut comment = None;

    for token in tokens {
        match token.kind {
            TokenKind::Word => words.push(parse_word_token(token.text)),
            TokenKind::Invalid => words.push(Word::Invalid(InvalidWord {
                letter: leading_letter(&token.text),
                text: token.text,
            })),
            TokenKind::Comment => {
                // Keep the first comment; later ones are rarely meaningful
                if comment.is_none() {
                    comment = Some(Comment {
                        text: extract_comment_text(&token.text),
                    });
                }
            }
        }
    }

    if words.is_empty() {
        return match comment {
            Some(comment) => ParsedLine::Comment(comment),
            None => ParsedLine::Empty,
        };
    }

    ParsedLine::Block(Block { words, comment })
}

/// Parse a word token like "X10.5"; a bad numeric tail yields an invalid word
fn parse_word_token(text: String) -> Word {
    let letter = leading_letter(&text);
    let value = text.get(1..).and_then(|tail| tail.parse::<f64>().ok());

    match (letter, value) {
        (Some(letter), Some(value)) if value.is_finite() => {
            Word::Param(Parameter { letter, value, text })
        }
        _ => Word::Invalid(InvalidWord { letter, text }),
    }
}

fn leading_letter(text: &str) -> Option<char> {
    text.chars()
        .next()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
}

/// Extract comment text, removing delimiters
fn extract_comment_text(text: &str) -> String {
    if let Some(stripped) = text.strip_prefix(';') {
        stripped.to_string()
    } else if let Some(stripped) = text.strip_prefix('(') {
        stripped.strip_suffix(')').unwrap_or(stripped).to_string()
    } else {
        text.to_string()
    }
}

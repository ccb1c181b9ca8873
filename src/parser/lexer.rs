//! G-code Lexer
//!
//! Fast, simple tokenization of G-code lines.
//! Focus: split a line into words and comments without ever failing.

use std::iter::Peekable;
use std::str::CharIndices;

/// Token types in G-code
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Letter followed by a numeric run, like "G1", "X-10.5"
    Word,
    /// Comment (semicolon or parenthetical)
    Comment,
    /// Text that cannot form a word, like "Xabc" or "#1"
    Invalid,
}

/// A token with its text content
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Tokenize a line of G-code into tokens
///
/// Words may be packed (`G1X10Y5`) or separated by whitespace. A letter
/// without a numeric tail, or a word with trailing garbage, swallows the
/// text up to the next boundary and is reported as a single invalid token,
/// so `Xabc` and `X10abc` each stay one token.
pub fn tokenize_line(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some((start_idx, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => continue,

            // Tape delimiter
            '%' => continue,

            // Semicolon comment: consume rest of line
            ';' => {
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: line[start_idx..].to_string(),
                });
                break;
            }

            // Parenthetical comment
            '(' => {
                let mut end_idx = line.len();

                for (idx, ch) in chars.by_ref() {
                    if ch == ')' {
                        end_idx = idx + 1;
                        break;
                    }
                }

                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: line[start_idx..end_idx].to_string(),
                });
            }

            c if c.is_ascii_alphabetic() => {
                let tail_start = start_idx + 1;
                let mut end_idx = tail_start;

                while let Some(&(idx, next_ch)) = chars.peek() {
                    if is_numeric_char(next_ch) {
                        end_idx = idx + next_ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }

                // A word ends at a boundary or where the next packed word starts;
                // anything else glued on makes the whole run invalid
                let kind = if end_idx == tail_start || !ends_word(&line[end_idx..]) {
                    end_idx = consume_to_boundary(&mut chars, end_idx);
                    TokenKind::Invalid
                } else {
                    TokenKind::Word
                };

                tokens.push(Token {
                    kind,
                    text: line[start_idx..end_idx].to_string(),
                });
            }

            // Stray text that does not start with a letter
            other => {
                let end_idx = consume_to_boundary(&mut chars, start_idx + other.len_utf8());
                tokens.push(Token {
                    kind: TokenKind::Invalid,
                    text: line[start_idx..end_idx].to_string(),
                });
            }
        }
    }

    tokens
}

fn is_numeric_char(ch: char) -> bool {
    ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+')
}

/// Whether `rest` starts at a valid word end
fn ends_word(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_whitespace() || c == ';' || c == '(' => true,
        Some(c) if c.is_ascii_alphabetic() => chars.next().is_some_and(is_numeric_char),
        Some(_) => false,
    }
}

/// Advance until whitespace or the start of a comment, returning the end byte index.
fn consume_to_boundary(chars: &mut Peekable<CharIndices<'_>>, mut end_idx: usize) -> usize {
    while let Some(&(idx, next_ch)) = chars.peek() {
        if next_ch.is_whitespace() || next_ch == ';' || next_ch == '(' {
            break;
        }
        end_idx = idx + next_ch.len_utf8();
        chars.next();
    }
    end_idx
}

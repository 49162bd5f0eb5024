//! Asset content formatting
//!
//! Stylesheets and scripts are re-indented before they are written, two
//! spaces per brace level. Both formatters are pure functions of their
//! input. When input cannot be tokenized the original text is kept.

mod css;
mod js;

pub use css::format_css;
pub use js::format_js;

use crate::types::{Fetched, ResourceKind};
use bytes::Bytes;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;
use tracing::debug;

/// Indentation unit
const INDENT: &str = "  ";

/// Input the formatters could not tokenize
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unterminated {0}")]
    Unterminated(&'static str),
    #[error("unbalanced '{0}'")]
    Unbalanced(char),
}

/// Prepare fetched content for writing
///
/// Text kinds are pretty-printed when `pretty` is set, falling back to the
/// original text on [`FormatError`]. Binary kinds pass through untouched.
pub fn format_asset(kind: ResourceKind, fetched: Fetched, pretty: bool) -> Bytes {
    let text = match (kind, fetched) {
        (ResourceKind::Image | ResourceKind::Video, fetched) => return fetched.into_bytes(),
        (_, Fetched::Binary(bytes)) if !pretty => return bytes,
        (_, fetched) => fetched.into_text(),
    };

    if !pretty {
        return Bytes::from(text);
    }

    let formatted = match kind {
        ResourceKind::Stylesheet => format_css(&text),
        _ => format_js(&text),
    };

    match formatted {
        Ok(out) => Bytes::from(out),
        Err(e) => {
            debug!(%kind, error = %e, "Formatting failed, keeping original text");
            Bytes::from(text)
        }
    }
}

/// Line-oriented output buffer shared by the formatters
#[derive(Default)]
struct Printer {
    out: String,
    line: String,
    indent: usize,
}

impl Printer {
    fn push(&mut self, c: char) {
        self.line.push(c);
    }

    fn push_str(&mut self, s: &str) {
        self.line.push_str(s);
    }

    /// Single separating space; leading and repeated spaces are dropped
    fn space(&mut self) {
        if !self.line.is_empty() && !self.line.ends_with(' ') {
            self.line.push(' ');
        }
    }

    fn last_char(&self) -> Option<char> {
        self.line.chars().last()
    }

    fn trim_line_end(&mut self) {
        let len = self.line.trim_end().len();
        self.line.truncate(len);
    }

    /// Flush the current line at the current indentation
    fn newline(&mut self) {
        let line = self.line.trim();
        if !line.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str(INDENT);
            }
            self.out.push_str(line);
            self.out.push('\n');
        }
        self.line.clear();
    }

    fn blank_line(&mut self) {
        self.newline();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn open(&mut self) {
        self.push('{');
        self.newline();
        self.indent += 1;
    }

    fn close(&mut self) -> Result<(), FormatError> {
        if self.indent == 0 {
            return Err(FormatError::Unbalanced('}'));
        }
        self.newline();
        self.indent -= 1;
        self.push('}');
        Ok(())
    }

    fn finish(mut self) -> Result<String, FormatError> {
        if self.indent != 0 {
            return Err(FormatError::Unbalanced('{'));
        }
        self.newline();
        let len = self.out.trim_end().len();
        self.out.truncate(len);
        self.out.push('\n');
        Ok(self.out)
    }
}

/// Copy a quoted string (opening quote already consumed) into `out`
fn read_string(
    chars: &mut Peekable<Chars<'_>>,
    quote: char,
    out: &mut String,
) -> Result<(), FormatError> {
    out.push(quote);
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => break,
            }
        } else if c == quote {
            return Ok(());
        }
    }
    Err(FormatError::Unterminated("string"))
}

/// Copy a block comment (`/*` already consumed) into `out`
fn read_block_comment(
    chars: &mut Peekable<Chars<'_>>,
    out: &mut String,
) -> Result<(), FormatError> {
    out.push_str("/*");
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '*' && chars.peek() == Some(&'/') {
            chars.next();
            out.push('/');
            return Ok(());
        }
    }
    Err(FormatError::Unterminated("comment"))
}

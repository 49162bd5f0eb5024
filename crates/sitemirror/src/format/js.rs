//! Script pretty-printer
//!
//! Brace-driven re-indentation. Source line breaks are kept so automatic
//! semicolon insertion sees the same program; breaks are only ever added
//! after `;`, `{` and `}`.

use super::{read_block_comment, read_string, FormatError, Printer};
use std::iter::Peekable;
use std::str::Chars;

/// Words after which a `/` starts a regular expression literal
const REGEX_PREFIX_WORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Words that stay on the line of a preceding `}`
const CONTINUATION_WORDS: &[&str] = &["else", "catch", "finally", "while"];

/// Last significant token, for regex/division disambiguation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Prev {
    Start,
    Punct(char),
    Word(String),
    Literal,
}

impl Prev {
    fn allows_regex(&self) -> bool {
        match self {
            Prev::Start => true,
            Prev::Punct(c) => !matches!(c, ')' | ']' | '}'),
            Prev::Word(w) => REGEX_PREFIX_WORDS.contains(&w.as_str()),
            Prev::Literal => false,
        }
    }
}

/// Re-indent a script
pub fn format_js(input: &str) -> Result<String, FormatError> {
    let mut printer = Printer::default();
    let mut chars = input.chars().peekable();
    let mut group_depth = 0usize;
    let mut group_stack: Vec<usize> = Vec::new();
    let mut prev = Prev::Start;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                let mut comment = String::from("/");
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    comment.push(next);
                    chars.next();
                }
                printer.space();
                printer.push_str(comment.trim_end());
                printer.newline();
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut comment = String::new();
                read_block_comment(&mut chars, &mut comment)?;
                printer.push_str(&comment);
            }
            '/' if prev.allows_regex() => {
                let mut literal = String::new();
                read_regex(&mut chars, &mut literal)?;
                printer.push_str(&literal);
                prev = Prev::Literal;
            }
            '"' | '\'' => {
                let mut literal = String::new();
                read_string(&mut chars, c, &mut literal)?;
                printer.push_str(&literal);
                prev = Prev::Literal;
            }
            '`' => {
                let mut literal = String::new();
                read_template(&mut chars, &mut literal)?;
                printer.push_str(&literal);
                prev = Prev::Literal;
            }
            c if c.is_whitespace() => {
                if c == '\n' {
                    printer.newline();
                } else {
                    printer.space();
                }
            }
            '(' | '[' => {
                group_depth += 1;
                printer.push(c);
                prev = Prev::Punct(c);
            }
            ')' | ']' => {
                if group_depth == 0 {
                    return Err(FormatError::Unbalanced(c));
                }
                group_depth -= 1;
                printer.push(c);
                prev = Prev::Punct(c);
            }
            '{' => {
                let after_head = printer
                    .last_char()
                    .is_some_and(|last| last == ')' || last == '>' || is_word_char(last));
                if after_head {
                    printer.space();
                }
                if next_significant(&chars) == Some('}') {
                    skip_whitespace(&mut chars);
                    chars.next();
                    printer.push_str("{}");
                    prev = Prev::Punct('}');
                    after_block(&mut printer, &mut chars);
                    continue;
                }
                printer.open();
                group_stack.push(group_depth);
                group_depth = 0;
                prev = Prev::Punct('{');
            }
            '}' => {
                if group_depth > 0 {
                    return Err(FormatError::Unbalanced('('));
                }
                printer.close()?;
                group_depth = group_stack.pop().unwrap_or(0);
                prev = Prev::Punct('}');
                after_block(&mut printer, &mut chars);
            }
            ';' => {
                printer.trim_line_end();
                printer.push(';');
                if group_depth == 0 {
                    printer.newline();
                }
                prev = Prev::Punct(';');
            }
            c if is_word_char(c) => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                printer.push_str(&word);
                prev = if word.starts_with(|ch: char| ch.is_ascii_digit()) {
                    Prev::Literal
                } else {
                    Prev::Word(word)
                };
            }
            _ => {
                printer.push(c);
                prev = Prev::Punct(c);
            }
        }
    }

    if group_depth > 0 {
        return Err(FormatError::Unbalanced('('));
    }
    printer.finish()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Decide what follows a closing brace: `})`, `};`, `} else` and friends
/// stay on one line, anything else starts a new line
fn after_block(printer: &mut Printer, chars: &mut Peekable<Chars<'_>>) {
    if matches!(next_significant(chars), Some(')' | ']' | ';' | ',' | '.')) {
        skip_whitespace(chars);
        return;
    }
    if continues_on_same_line(chars) {
        skip_whitespace(chars);
        printer.push(' ');
        return;
    }
    printer.newline();
}

fn next_significant(chars: &Peekable<Chars<'_>>) -> Option<char> {
    chars.clone().find(|c| !c.is_whitespace())
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// True when `else`/`catch`/`finally`/`while` follows on the same line
fn continues_on_same_line(chars: &Peekable<Chars<'_>>) -> bool {
    let mut rest = chars.clone();
    while let Some(&c) = rest.peek() {
        if c == '\n' {
            return false;
        }
        if !c.is_whitespace() {
            break;
        }
        rest.next();
    }
    let word: String = rest.take_while(|c| is_word_char(*c)).collect();
    CONTINUATION_WORDS.contains(&word.as_str())
}

/// Copy a regex literal (opening `/` already consumed) into `out`
fn read_regex(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<(), FormatError> {
    out.push('/');
    let mut in_class = false;
    while let Some(c) = chars.next() {
        if c == '\n' {
            break;
        }
        out.push(c);
        match c {
            '\\' => match chars.next() {
                Some(escaped) if escaped != '\n' => out.push(escaped),
                _ => break,
            },
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Ok(()),
            _ => {}
        }
    }
    Err(FormatError::Unterminated("regular expression"))
}

/// Copy a template literal (opening backtick already consumed) into `out`,
/// including nested `${...}` expressions
fn read_template(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<(), FormatError> {
    out.push('`');
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                match chars.next() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                }
            }
            '`' => {
                out.push(c);
                return Ok(());
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str("${");
                read_template_expression(chars, out)?;
            }
            _ => out.push(c),
        }
    }
    Err(FormatError::Unterminated("template literal"))
}

fn read_template_expression(
    chars: &mut Peekable<Chars<'_>>,
    out: &mut String,
) -> Result<(), FormatError> {
    let mut depth = 1usize;
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                depth += 1;
                out.push(c);
            }
            '}' => {
                depth -= 1;
                out.push(c);
                if depth == 0 {
                    return Ok(());
                }
            }
            '`' => read_template(chars, out)?,
            '"' | '\'' => read_string(chars, c, out)?,
            _ => out.push(c),
        }
    }
    Err(FormatError::Unterminated("template literal"))
}

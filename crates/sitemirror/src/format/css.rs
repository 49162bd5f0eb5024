//! Stylesheet pretty-printer

use super::{read_block_comment, read_string, FormatError, Printer};

/// Re-indent a stylesheet
///
/// One declaration per line, rule bodies indented, a blank line between
/// top-level blocks. Strings, comments and parenthesized values such as
/// `url(...)` are copied verbatim.
pub fn format_css(input: &str) -> Result<String, FormatError> {
    let mut printer = Printer::default();
    let mut chars = input.chars().peekable();
    let mut paren_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut comment = String::new();
                read_block_comment(&mut chars, &mut comment)?;
                if paren_depth > 0 {
                    printer.push_str(&comment);
                } else {
                    printer.newline();
                    printer.push_str(&comment);
                    printer.newline();
                }
            }
            '"' | '\'' => {
                let mut literal = String::new();
                read_string(&mut chars, c, &mut literal)?;
                printer.push_str(&literal);
            }
            '(' => {
                paren_depth += 1;
                printer.push(c);
            }
            ')' => {
                if paren_depth == 0 {
                    return Err(FormatError::Unbalanced(')'));
                }
                paren_depth -= 1;
                printer.push(c);
            }
            c if c.is_whitespace() => {
                printer.space();
            }
            _ if paren_depth > 0 => printer.push(c),
            '{' => {
                printer.trim_line_end();
                printer.space();
                printer.open();
            }
            '}' => {
                printer.close()?;
                printer.newline();
                if printer.indent == 0 {
                    printer.blank_line();
                }
            }
            ';' => {
                printer.trim_line_end();
                printer.push(';');
                printer.newline();
            }
            ':' if printer.indent > 0 && is_declaration(chars.clone()) => {
                printer.trim_line_end();
                printer.push_str(": ");
            }
            _ => printer.push(c),
        }
    }

    if paren_depth > 0 {
        return Err(FormatError::Unbalanced('('));
    }
    printer.finish()
}

/// A colon starts a declaration value unless a `{` follows before the
/// statement ends (then it is part of a nested selector like `a:hover`).
fn is_declaration(rest: impl Iterator<Item = char>) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut parens = 0usize;

    for c in rest {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            ';' | '}' if parens == 0 => return true,
            '{' if parens == 0 => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minified_rules() {
        let out = format_css("body{margin:0;padding:0}h1{font-size:2em}").unwrap();
        assert_eq!(
            out,
            "body {\n  margin: 0;\n  padding: 0\n}\n\nh1 {\n  font-size: 2em\n}\n"
        );
    }

    #[test]
    fn test_nested_media_and_pseudo_selectors() {
        let out =
            format_css("@media (max-width:600px){a:hover{color:red;}}").unwrap();
        assert_eq!(
            out,
            "@media (max-width:600px) {\n  a:hover {\n    color: red;\n  }\n}\n"
        );
    }

    #[test]
    fn test_strings_and_urls_are_verbatim() {
        let out = format_css(
            r#"a::before{content:"{;}"}b{background:url(data:image/svg+xml;utf8,<svg/>)}"#,
        )
        .unwrap();
        assert!(out.contains(r#"content: "{;}""#));
        assert!(out.contains("background: url(data:image/svg+xml;utf8,<svg/>)"));
    }

    #[test]
    fn test_comments_on_own_line() {
        let out = format_css("/* reset */a{b:c}").unwrap();
        assert_eq!(out, "/* reset */\na {\n  b: c\n}\n");
    }

    #[test]
    fn test_deterministic_and_stable() {
        let input = ".x , .y{color : red ;  margin:0 auto}@import url(a.css);";
        let once = format_css(input).unwrap();
        assert_eq!(once, format_css(input).unwrap());
        assert_eq!(format_css(&once).unwrap(), once);
    }

    #[test]
    fn test_unbalanced_input() {
        assert_eq!(format_css("a{color:red"), Err(FormatError::Unbalanced('{')));
        assert_eq!(format_css("a{}}"), Err(FormatError::Unbalanced('}')));
        assert_eq!(format_css("a{b:url(x}"), Err(FormatError::Unbalanced('(')));
        assert_eq!(
            format_css("a{content:'x}"),
            Err(FormatError::Unterminated("string"))
        );
        assert_eq!(
            format_css("/* open"),
            Err(FormatError::Unterminated("comment"))
        );
    }
}

//! Source text helpers for the heuristic matchers
//!
//! Everything here works on raw text and preserves line structure, so line
//! numbers computed after stripping still point into the original file.

use crate::models::symbol::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//` and `/* */`
    CFamily,
    /// `#`
    Hash,
    /// `#` and `#= =#`
    Julia,
}

impl CommentStyle {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => Self::Hash,
            Language::Julia => Self::Julia,
            _ => Self::CFamily,
        }
    }

    fn quotes(self) -> &'static [char] {
        match self {
            // `'` is a lifetime in Rust and the adjoint operator in Julia
            Self::CFamily | Self::Julia => &['"'],
            Self::Hash => &['"', '\''],
        }
    }
}

enum Scan {
    Code,
    Line,
    Block(usize),
    Str(char),
}

/// Blank out comments, keeping newlines and string literals intact
pub fn strip_comments(text: &str, style: CommentStyle) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = Scan::Code;
    let mut i = 0;

    let blank = |c: char, out: &mut String| out.push(if c == '\n' { '\n' } else { ' ' });

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            Scan::Code => {
                let opens_block = match style {
                    CommentStyle::CFamily => c == '/' && next == Some('*'),
                    CommentStyle::Julia => c == '#' && next == Some('='),
                    CommentStyle::Hash => false,
                };
                let opens_line = match style {
                    CommentStyle::CFamily => c == '/' && next == Some('/'),
                    CommentStyle::Hash | CommentStyle::Julia => c == '#',
                };

                if opens_block {
                    state = Scan::Block(1);
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                if opens_line {
                    state = Scan::Line;
                    out.push(' ');
                } else {
                    if style.quotes().contains(&c) {
                        state = Scan::Str(c);
                    }
                    out.push(c);
                }
            }
            Scan::Line => {
                if c == '\n' {
                    state = Scan::Code;
                }
                blank(c, &mut out);
            }
            Scan::Block(depth) => {
                let (close, reopen) = match style {
                    CommentStyle::Julia => (c == '=' && next == Some('#'), c == '#' && next == Some('=')),
                    _ => (c == '*' && next == Some('/'), c == '/' && next == Some('*')),
                };
                if close || reopen {
                    state = if close {
                        if depth == 1 { Scan::Code } else { Scan::Block(depth - 1) }
                    } else {
                        Scan::Block(depth + 1)
                    };
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                blank(c, &mut out);
            }
            Scan::Str(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        i += 2;
                        continue;
                    }
                } else if c == quote {
                    state = Scan::Code;
                }
            }
        }
        i += 1;
    }

    out
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-identifier search (case-sensitive)
pub fn contains_identifier(text: &str, name: &str) -> bool {
    find_identifier(text, name, 0).is_some()
}

/// Byte offset of the first whole-identifier occurrence of `name` at or after `from`
pub fn find_identifier(text: &str, name: &str, from: usize) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    let mut start = from;
    while let Some(offset) = text.get(start..)?.find(name) {
        let at = start + offset;
        let end = at + name.len();
        let before_ok = text[..at].chars().next_back().is_none_or(|c| !is_ident_char(c));
        let after_ok = text[end..].chars().next().is_none_or(|c| !is_ident_char(c));
        if before_ok && after_ok {
            return Some(at);
        }
        start = at + name.len();
    }
    None
}

/// Final segment of a qualified name: `a::b::C`, `pkg.C`, `\Ns\C` all give `C`
pub fn last_segment(path: &str) -> &str {
    path.rsplit(|c: char| c == ':' || c == '.' || c == '\\')
        .next()
        .unwrap_or(path)
        .trim()
}

/// Remove balanced `open … close` groups, one line at a time
///
/// Depth resets at each newline so a stray comparison operator cannot swallow
/// the rest of a file. With `<` the arrows `->` and `=>` are not closers.
pub fn strip_brackets(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut prev = '\0';

    for c in text.chars() {
        if c == '\n' {
            depth = 0;
            out.push(c);
        } else if c == open {
            depth += 1;
        } else if c == close && depth > 0 && !(open == '<' && (prev == '-' || prev == '=')) {
            depth -= 1;
        } else if depth == 0 {
            out.push(c);
        }
        prev = c;
    }
    out
}

/// Remove balanced `open … close` groups across lines
pub fn strip_nested(text: &str, open: char, close: char) -> String {
    let mut depth = 0usize;
    text.chars()
        .filter(|&c| {
            if c == open {
                depth += 1;
                false
            } else if c == close && depth > 0 {
                depth -= 1;
                false
            } else {
                depth == 0
            }
        })
        .collect()
}

/// Split on `sep` at bracket depth zero
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            _ if c == sep && depth <= 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Lines `decl..` joined until `done` accepts the accumulated text or
/// `forward` extra lines have been added; `None` when `decl` is out of range
pub fn window_until<F>(lines: &[&str], decl: usize, forward: usize, done: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let first = lines.get(decl)?;
    let mut window = first.to_string();
    for line in lines.iter().skip(decl + 1).take(forward) {
        if done(&window) {
            break;
        }
        window.push('\n');
        window.push_str(line);
    }
    Some(window)
}

/// Balance of `open` over `close` in `text`
pub fn depth(text: &str, open: char, close: char) -> i32 {
    text.chars().fold(0, |d, c| {
        if c == open {
            d + 1
        } else if c == close {
            d - 1
        } else {
            d
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments_keeps_lines() {
        let src = "class A // : public B\n/* : public C\n */ : public D {}";
        let stripped = strip_comments(src, CommentStyle::CFamily);
        assert_eq!(stripped.lines().count(), src.lines().count());
        assert!(!stripped.contains("public B"));
        assert!(!stripped.contains("public C"));
        assert!(stripped.contains("public D"));
    }

    #[test]
    fn test_strip_comments_ignores_markers_in_strings() {
        let src = "x = \"# not a comment\"  # real\n";
        let stripped = strip_comments(src, CommentStyle::Hash);
        assert!(stripped.contains("# not a comment"));
        assert!(!stripped.contains("real"));
    }

    #[test]
    fn test_julia_block_comment() {
        let src = "#= struct A <: B end =#\nstruct C <: D end";
        let stripped = strip_comments(src, CommentStyle::Julia);
        assert!(!stripped.contains("A <: B"));
        assert!(stripped.contains("C <: D"));
    }

    #[test]
    fn test_rust_lifetimes_are_not_strings() {
        let src = "impl<'a> Tr for S<'a> {} // gone\nstruct T;";
        let stripped = strip_comments(src, CommentStyle::CFamily);
        assert!(!stripped.contains("gone"));
        assert!(stripped.contains("struct T;"));
    }

    #[test]
    fn test_identifier_boundaries() {
        assert!(contains_identifier("public Base {", "Base"));
        assert!(contains_identifier("ns::Base", "Base"));
        assert!(!contains_identifier("public BaseClass", "Base"));
        assert!(!contains_identifier("MyBase", "Base"));
        assert!(!contains_identifier("anything", ""));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("std::fmt::Debug"), "Debug");
        assert_eq!(last_segment("io.Reader"), "Reader");
        assert_eq!(last_segment("\\App\\Model"), "Model");
        assert_eq!(last_segment("Plain"), "Plain");
    }

    #[test]
    fn test_strip_brackets_generics() {
        assert_eq!(
            strip_brackets("impl<T: Fn() -> u8> Tr<T> for S<T>", '<', '>'),
            "impl Tr for S"
        );
        assert_eq!(strip_brackets("if a < b {\nimpl X for Y", '<', '>'), "if a \nimpl X for Y");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("A, Generic[T, U], metaclass=M", ','),
            vec!["A", " Generic[T, U]", " metaclass=M"]
        );
    }

    #[test]
    fn test_window_until() {
        let lines = vec!["class A", "  : public B", "{", "  int x;", "};"];
        let window = window_until(&lines, 0, 8, |w| w.contains('{')).unwrap();
        assert_eq!(window, "class A\n  : public B\n{");
        assert!(window_until(&lines, 9, 8, |_| true).is_none());
    }
}

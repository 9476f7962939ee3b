//! Line accounting for source files.
//!
//! A small per-language lexer classifies every physical line as source,
//! comment-only, block comment / docstring, or blank. The code it sees
//! (string literals included, comments excluded) is kept for Halstead
//! counting in [`crate::analysis::maintainability`].

use crate::analysis::language::{CommentSyntax, Language};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetrics {
    /// Total physical lines
    pub loc: u64,
    /// Lines carrying code
    pub sloc: u64,
    /// Lines carrying a line comment, trailing ones included
    pub comments: u64,
    /// Lines inside block comments or docstrings
    pub multi: u64,
    /// Blank lines outside block comments
    pub blank: u64,
}

impl RawMetrics {
    /// Lines that hold nothing but a line comment
    pub fn comment_only(&self) -> u64 {
        self.loc - self.sloc - self.multi - self.blank
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub raw: RawMetrics,
    /// Source with comments removed, one output line per input line
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Block { close: &'static str },
    Doc { close: &'static str },
    Str { quote: char },
    TripleStr { close: &'static str },
}

pub fn scan(source: &str, language: Language) -> Scan {
    let syntax = language.comment_syntax();
    let quotes = language.string_quotes();
    let mut raw = RawMetrics::default();
    let mut code = String::with_capacity(source.len());
    let mut state = State::Code;

    for line in source.lines() {
        raw.loc += 1;

        if state == State::Code && line.trim().is_empty() {
            raw.blank += 1;
            code.push('\n');
            continue;
        }

        if syntax.anchored_block && scan_anchored(line, &syntax, &mut state) == Some(true) {
            raw.multi += 1;
            code.push('\n');
            continue;
        }

        let mut touched_multi = matches!(state, State::Block { .. } | State::Doc { .. });
        let mut has_code = false;
        let mut has_line_comment = false;
        let mut i = 0;

        while i < line.len() {
            let rest = &line[i..];
            let Some(c) = rest.chars().next() else { break };

            match state {
                State::Block { close } | State::Doc { close } => {
                    touched_multi = true;
                    if rest.starts_with(close) {
                        i += close.len();
                        state = State::Code;
                    } else {
                        i += c.len_utf8();
                    }
                }
                State::TripleStr { close } => {
                    has_code = true;
                    if rest.starts_with(close) {
                        code.push_str(close);
                        i += close.len();
                        state = State::Code;
                    } else {
                        code.push(c);
                        i += c.len_utf8();
                    }
                }
                State::Str { quote } => {
                    has_code = true;
                    code.push(c);
                    i += c.len_utf8();
                    if c == '\\' {
                        if let Some(next) = line[i..].chars().next() {
                            code.push(next);
                            i += next.len_utf8();
                        }
                    } else if c == quote {
                        state = State::Code;
                    }
                }
                State::Code => {
                    if c.is_whitespace() {
                        code.push(c);
                        i += c.len_utf8();
                        continue;
                    }
                    if syntax.line.iter().any(|prefix| rest.starts_with(prefix)) {
                        has_line_comment = true;
                        break;
                    }
                    if let Some((open, close)) = syntax.block.filter(|_| !syntax.anchored_block) {
                        if rest.starts_with(open) {
                            touched_multi = true;
                            state = State::Block { close };
                            i += open.len();
                            continue;
                        }
                    }
                    if syntax.docstrings {
                        if let Some(delim) = triple_quote(rest) {
                            i += delim.len();
                            if has_code {
                                code.push_str(delim);
                                state = State::TripleStr { close: delim };
                            } else {
                                touched_multi = true;
                                state = State::Doc { close: delim };
                            }
                            continue;
                        }
                    }
                    has_code = true;
                    code.push(c);
                    i += c.len_utf8();
                    if quotes.contains(&c) {
                        state = State::Str { quote: c };
                    }
                }
            }
        }

        // Only template literals may span lines
        if let State::Str { quote } = state {
            if quote != '`' {
                state = State::Code;
            }
        }

        if has_code {
            raw.sloc += 1;
            if has_line_comment {
                raw.comments += 1;
            }
        } else if touched_multi {
            raw.multi += 1;
        } else if has_line_comment {
            raw.comments += 1;
        } else {
            raw.blank += 1;
        }
        code.push('\n');
    }

    Scan { raw, code }
}

/// Handles `=begin`/`=end` blocks. Returns `Some(true)` when the line belongs to the block.
fn scan_anchored(line: &str, syntax: &CommentSyntax, state: &mut State) -> Option<bool> {
    let (open, close) = syntax.block?;
    match *state {
        State::Code if line.starts_with(open) => {
            *state = State::Block { close };
            Some(true)
        }
        State::Block { close } => {
            if line.starts_with(close) {
                *state = State::Code;
            }
            Some(true)
        }
        _ => Some(false),
    }
}

fn triple_quote(rest: &str) -> Option<&'static str> {
    if rest.starts_with("\"\"\"") {
        Some("\"\"\"")
    } else if rest.starts_with("'''") {
        Some("'''")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(source: &str, language: Language) -> RawMetrics {
        scan(source, language).raw
    }

    #[test]
    fn python_docstrings_count_as_multi() {
        let source = "def f():\n    \"\"\"Doc\n    more.\n    \"\"\"\n\n    # note\n    return 1  # inline\n";
        let raw = counts(source, Language::Python);
        assert_eq!(raw.loc, 7);
        assert_eq!(raw.sloc, 2);
        assert_eq!(raw.multi, 3);
        assert_eq!(raw.blank, 1);
        assert_eq!(raw.comments, 2);
        assert_eq!(raw.comment_only(), 1);
    }

    #[test]
    fn python_assigned_triple_string_is_code() {
        let raw = counts("x = \"\"\"a\nb\"\"\"\n", Language::Python);
        assert_eq!(raw.sloc, 2);
        assert_eq!(raw.multi, 0);
    }

    #[test]
    fn c_like_block_and_line_comments() {
        let source = "/* header\n * body\n */\nint main() { // entry\n  return 0;\n}\n";
        let raw = counts(source, Language::C);
        assert_eq!(raw.loc, 6);
        assert_eq!(raw.multi, 3);
        assert_eq!(raw.sloc, 3);
        assert_eq!(raw.comments, 1);
        assert_eq!(raw.blank, 0);
    }

    #[test]
    fn comment_markers_inside_strings_are_code() {
        let raw = counts("const url = \"http://x\"; // real\n", Language::JavaScript);
        assert_eq!(raw.sloc, 1);
        assert_eq!(raw.comments, 1);
        let scan = scan("let s = '# not a comment'\n", Language::Python);
        assert_eq!(scan.raw.comments, 0);
        assert!(scan.code.contains("# not a comment"));
    }

    #[test]
    fn ruby_begin_end_blocks() {
        let source = "=begin\nnotes\n=end\ndef a\n  1\nend\n";
        let raw = counts(source, Language::Ruby);
        assert_eq!(raw.multi, 3);
        assert_eq!(raw.sloc, 3);
    }

    #[test]
    fn code_after_block_close_is_source() {
        let source = "// a\n\nint x = 1; /* b\n c */ int y;\n\n";
        let raw = counts(source, Language::Cpp);
        assert_eq!(raw.loc, 5);
        assert_eq!(raw.sloc, 2);
        assert_eq!(raw.blank, 2);
        assert_eq!(raw.multi, 0);
        assert_eq!(raw.comment_only(), 1);
    }

    #[test]
    fn empty_source_has_no_lines() {
        assert_eq!(counts("", Language::Go), RawMetrics::default());
    }
}

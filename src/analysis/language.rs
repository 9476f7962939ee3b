use std::path::Path;

/// Source languages the crawler knows how to measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Java,
    Go,
    Rust,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Unknown,
}

/// How comments are written in a language
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: Option<(&'static str, &'static str)>,
    /// Triple-quoted strings opening a line count as documentation (Python)
    pub docstrings: bool,
    /// `=begin`/`=end` blocks anchored at column zero (Ruby)
    pub anchored_block: bool,
}

const C_LIKE: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    docstrings: false,
    anchored_block: false,
};

impl Language {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "py" | "pyw" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "java" => Self::Java,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript | Self::Tsx => "typescript",
            Self::Java => "java",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Unknown => "unknown",
        }
    }

    pub fn comment_syntax(&self) -> CommentSyntax {
        match self {
            Self::Python => CommentSyntax {
                line: &["#"],
                block: None,
                docstrings: true,
                anchored_block: false,
            },
            Self::Ruby => CommentSyntax {
                line: &["#"],
                block: Some(("=begin", "=end")),
                docstrings: false,
                anchored_block: true,
            },
            Self::Php => CommentSyntax {
                line: &["//", "#"],
                ..C_LIKE
            },
            _ => C_LIKE,
        }
    }

    /// Characters that open a string literal
    pub fn string_quotes(&self) -> &'static [char] {
        match self {
            Self::JavaScript | Self::TypeScript | Self::Tsx | Self::Go => &['"', '\'', '`'],
            // Rust lifetimes and Rust/Java/C char literals share the quote
            Self::Rust => &['"'],
            _ => &['"', '\''],
        }
    }
}

//! Halstead volume and maintainability index.
//!
//! MI = max(0, (171 − 5.2·ln V − 0.23·G − 16.2·ln L + 50·sin(√(2.4·C))) · 100 / 171)
//! where V is Halstead volume, G total cyclomatic complexity, L source lines
//! and C the comment percentage, capped at 100.

use crate::analysis::raw::RawMetrics;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Halstead {
    pub distinct_operators: usize,
    pub distinct_operands: usize,
    pub total_operators: usize,
    pub total_operands: usize,
}

impl Halstead {
    pub fn vocabulary(&self) -> usize {
        self.distinct_operators + self.distinct_operands
    }

    pub fn length(&self) -> usize {
        self.total_operators + self.total_operands
    }

    pub fn volume(&self) -> f64 {
        let vocabulary = self.vocabulary();
        if vocabulary < 2 {
            return 0.0;
        }
        self.length() as f64 * (vocabulary as f64).log2()
    }
}

const KEYWORDS: &[&str] = &[
    "if", "else", "elif", "for", "while", "do", "switch", "case", "default", "break", "continue",
    "return", "try", "catch", "except", "finally", "throw", "raise", "new", "delete", "in", "is",
    "not", "and", "or", "def", "class", "struct", "enum", "fn", "func", "function", "let", "var",
    "const", "static", "public", "private", "protected", "import", "from", "package", "use",
    "match", "loop", "yield", "await", "async", "lambda", "with", "as", "unless", "until", "end",
    "begin", "rescue", "ensure", "when", "then", "go", "defer", "select", "typeof", "instanceof",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?x)
            (?P<string>"(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'|`(?:\\.|[^`\\])*`)
            |(?P<number>\b\d[\w.]*)
            |(?P<ident>[A-Za-z_$][A-Za-z0-9_$]*)
            |(?P<op>===|!==|\*\*=|<<=|>>=|==|!=|<=|>=|&&|\|\||\+\+|--|\+=|-=|\*=|/=|%=|&=|\|=|\^=|->|=>|::|<<|>>|\*\*|//|\?\?|[-+*/%=<>!&|^~?:.,;()\[\]{}@])
            "#,
        )
        .expect("token pattern compiles")
    })
}

/// Counts operators and operands in comment-free code
pub fn halstead(code: &str) -> Halstead {
    let mut operators: HashSet<&str> = HashSet::new();
    let mut operands: HashSet<&str> = HashSet::new();
    let mut counts = Halstead::default();

    for caps in token_pattern().captures_iter(code) {
        if let Some(m) = caps.name("ident") {
            if KEYWORDS.contains(&m.as_str()) {
                operators.insert(m.as_str());
                counts.total_operators += 1;
            } else {
                operands.insert(m.as_str());
                counts.total_operands += 1;
            }
        } else if let Some(m) = caps.name("op") {
            operators.insert(m.as_str());
            counts.total_operators += 1;
        } else if let Some(m) = caps.name("string").or_else(|| caps.name("number")) {
            operands.insert(m.as_str());
            counts.total_operands += 1;
        }
    }

    counts.distinct_operators = operators.len();
    counts.distinct_operands = operands.len();
    counts
}

/// Maintainability index on a 0–100 scale
pub fn maintainability_index(volume: f64, total_complexity: usize, sloc: u64, comment_percent: f64) -> f64 {
    if volume <= 0.0 || sloc == 0 {
        return 100.0;
    }
    let comment_scale = (2.4 * comment_percent.to_radians()).sqrt();
    let unnormalized = 171.0
        - 5.2 * volume.ln()
        - 0.23 * total_complexity as f64
        - 16.2 * (sloc as f64).ln()
        + 50.0 * comment_scale.sin();
    (unnormalized * 100.0 / 171.0).clamp(0.0, 100.0)
}

/// Maintainability scores for a file's units. Files are scored as one module.
pub fn maintainability_scores(raw: &RawMetrics, code: &str, total_complexity: usize) -> Vec<f64> {
    if raw.loc == 0 {
        return Vec::new();
    }
    let comment_percent = if raw.sloc == 0 {
        0.0
    } else {
        (raw.comments + raw.multi) as f64 / raw.sloc as f64 * 100.0
    };
    let volume = halstead(code).volume();
    vec![maintainability_index(volume, total_complexity, raw.sloc, comment_percent)]
}

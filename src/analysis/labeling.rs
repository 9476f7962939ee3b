use crate::error::{Error, Result};
use regex::{RegexSet, RegexSetBuilder};

/// Default commit-message patterns for defect-fixing commits
pub const DEFAULT_BUGFIX_PATTERNS: [&str; 7] = [
    r"\bfix(es|ed)?\b",
    r"\bbug(s)?\b",
    r"\bhotfix\b",
    r"\bdefect(s)?\b",
    r"\bissue(s)?\b",
    r"\bresolve(d|s)?\b",
    r"\bpatch\b",
];

/// Decides whether a commit fixed a defect. Drives the weak `buggy_label`.
pub trait CommitClassifier {
    fn is_bugfix(&self, message: &str) -> bool;
}

/// Case-insensitive keyword matching on the commit message
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    patterns: RegexSet,
}

impl KeywordClassifier {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Configuration(format!("invalid bugfix pattern: {e}")))?;
        Ok(Self { patterns })
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        // Built-in patterns are known to compile
        Self::new(&DEFAULT_BUGFIX_PATTERNS).unwrap_or_else(|_| Self {
            patterns: RegexSet::empty(),
        })
    }
}

impl CommitClassifier for KeywordClassifier {
    fn is_bugfix(&self, message: &str) -> bool {
        !message.is_empty() && self.patterns.is_match(message)
    }
}

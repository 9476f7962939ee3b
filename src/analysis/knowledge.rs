use std::collections::HashSet;

/// Author identity used for `distinct_authors`: lower-cased email, else
/// lower-cased name, else `"unknown"`. Empty strings count as missing.
pub fn normalize_author(email: Option<&str>, name: Option<&str>) -> String {
    email
        .filter(|e| !e.is_empty())
        .or_else(|| name.filter(|n| !n.is_empty()))
        .map(str::to_lowercase)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Distinct normalized authors that touched a file
#[derive(Debug, Clone, Default)]
pub struct AuthorSet {
    authors: HashSet<String>,
}

impl AuthorSet {
    pub fn insert(&mut self, identity: String) {
        self.authors.insert(identity);
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_email_over_name() {
        assert_eq!(normalize_author(Some("Alice@Example.COM"), Some("Alice")), "alice@example.com");
    }

    #[test]
    fn falls_back_to_name_then_unknown() {
        assert_eq!(normalize_author(Some(""), Some("Bob")), "bob");
        assert_eq!(normalize_author(None, Some("Bob")), "bob");
        assert_eq!(normalize_author(None, None), "unknown");
        assert_eq!(normalize_author(Some(""), Some("")), "unknown");
    }

    #[test]
    fn author_set_counts_case_variants_once() {
        let mut set = AuthorSet::default();
        set.insert(normalize_author(Some("dev@x.io"), None));
        set.insert(normalize_author(Some("DEV@X.IO"), None));
        set.insert(normalize_author(None, Some("Other")));
        assert_eq!(set.len(), 2);
    }
}

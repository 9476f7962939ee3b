use crate::analysis::labeling::{KeywordClassifier, DEFAULT_BUGFIX_PATTERNS};
use crate::error::{Error, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: u64 = 2;
const SETTINGS_FILE_NAME: &str = ".bugrisk.json";

pub const DEFAULT_EXTENSIONS: [&str; 10] = ["py", "js", "ts", "java", "go", "cpp", "c", "cs", "rb", "php"];
pub const DEFAULT_SKIP_DIRS: [&str; 1] = [".*"];

/// Effective settings after defaults and migrations are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub schema_version: u64,
    /// File extensions to crawl, without the dot
    pub extensions: Vec<String>,
    /// Directory-name globs that are never descended
    pub skip_dirs: Vec<String>,
    /// Globs on the repository-relative path of files to skip
    pub exclude: Vec<String>,
    pub bugfix_patterns: Vec<String>,
    pub strict_reads: bool,
    pub strict_features: bool,
    pub random_seed: u64,
    pub cv_folds: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            bugfix_patterns: DEFAULT_BUGFIX_PATTERNS.iter().map(|s| s.to_string()).collect(),
            strict_reads: false,
            strict_features: false,
            random_seed: 42,
            cv_folds: 5,
        }
    }
}

impl Settings {
    pub fn classifier(&self) -> Result<KeywordClassifier> {
        KeywordClassifier::new(&self.bugfix_patterns)
    }

    pub fn allows_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    pub fn skip_dir_patterns(&self) -> Result<Vec<Pattern>> {
        compile_globs("skipDirs", &self.skip_dirs)
    }

    pub fn exclude_patterns(&self) -> Result<Vec<Pattern>> {
        compile_globs("exclude", &self.exclude)
    }
}

fn compile_globs(key: &str, globs: &[String]) -> Result<Vec<Pattern>> {
    globs
        .iter()
        .map(|g| Pattern::new(g).map_err(|e| Error::Configuration(format!("invalid {key} pattern '{g}': {e}"))))
        .collect()
}

/// Loads settings from `explicit`, else `<repo>/.bugrisk.json`, else defaults.
/// The file is only read; migrations are applied in memory.
pub fn load_settings(repo_path: &Path, explicit: Option<&Path>) -> Result<Settings> {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Some(repo_path.join(SETTINGS_FILE_NAME)).filter(|p| p.is_file()),
    };

    let Some(path) = path else {
        log::debug!("no settings file under {}; using defaults", repo_path.display());
        return Ok(Settings::default());
    };

    let raw = fs::read_to_string(&path)
        .map_err(|e| Error::Configuration(format!("failed to read {}: {e}", path.display())))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| Error::Configuration(format!("failed to parse {}: {e}", path.display())))?;
    log::info!("loaded settings from {}", path.display());
    settings_from_value(value)
}

pub fn settings_from_value(value: Value) -> Result<Settings> {
    let migrated = migrate_settings(value);
    let settings: Settings =
        serde_json::from_value(migrated).map_err(|e| Error::Configuration(format!("invalid settings: {e}")))?;
    // Surface bad patterns at load time rather than mid-crawl
    settings.classifier()?;
    settings.skip_dir_patterns()?;
    settings.exclude_patterns()?;
    Ok(settings)
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out.get("schemaVersion").and_then(Value::as_u64).unwrap_or(1);

    if version < 2 {
        migrate_bugfix_keywords(&mut out);
    }

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }
    out
}

fn default_settings() -> Value {
    serde_json::to_value(Settings::default()).unwrap_or_else(|_| json!({}))
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

/// V1 stored plain words under `bugfixKeywords`; V2 stores regexes
fn migrate_bugfix_keywords(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };
    let Some(keywords) = obj.remove("bugfixKeywords") else {
        return;
    };
    if obj.contains_key("bugfixPatterns") {
        return;
    }

    let patterns: Vec<Value> = keywords
        .as_array()
        .map(|words| {
            words
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(|w| json!(format!(r"\b{}\b", regex::escape(w))))
                .collect()
        })
        .unwrap_or_default();
    if !patterns.is_empty() {
        obj.insert("bugfixPatterns".to_string(), Value::Array(patterns));
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    // Extensions are stored without the dot, lower-case
    if let Some(exts) = obj.get_mut("extensions").and_then(Value::as_array_mut) {
        for ext in exts.iter_mut() {
            if let Some(s) = ext.as_str() {
                *ext = json!(s.trim_start_matches('.').to_ascii_lowercase());
            }
        }
    }

    clamp_u64(obj, "cvFolds", 2, 20, 5);
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::labeling::CommitClassifier;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = settings_from_value(json!({})).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.allows_extension("PY"));
        assert!(!settings.allows_extension("rs"));
    }

    #[test]
    fn migrates_legacy_keywords_into_patterns() {
        let settings = settings_from_value(json!({
            "schemaVersion": 1,
            "bugfixKeywords": ["fix", "c++"]
        }))
        .unwrap();

        assert_eq!(settings.schema_version, SETTINGS_SCHEMA_VERSION);
        assert_eq!(settings.bugfix_patterns, vec![r"\bfix\b".to_string(), r"\bc\+\+\b".to_string()]);
        let classifier = settings.classifier().unwrap();
        assert!(classifier.is_bugfix("Fix crash"));
        assert!(!classifier.is_bugfix("prefix handling"));
    }

    #[test]
    fn explicit_patterns_win_over_legacy_keywords() {
        let settings = settings_from_value(json!({
            "bugfixKeywords": ["oops"],
            "bugfixPatterns": [r"\bregress"]
        }))
        .unwrap();
        assert_eq!(settings.bugfix_patterns, vec![r"\bregress".to_string()]);
    }

    #[test]
    fn merges_partial_settings_and_sanitizes() {
        let settings = settings_from_value(json!({
            "extensions": [".PY", "Go"],
            "cvFolds": 1,
            "strictFeatures": true
        }))
        .unwrap();
        assert_eq!(settings.extensions, vec!["py".to_string(), "go".to_string()]);
        assert_eq!(settings.cv_folds, 2);
        assert!(settings.strict_features);
        assert!(!settings.strict_reads);
        assert_eq!(settings.random_seed, 42);
    }

    #[test]
    fn invalid_patterns_are_configuration_errors() {
        let err = settings_from_value(json!({ "bugfixPatterns": ["(open"] })).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        let err = settings_from_value(json!({ "exclude": ["[z-a"] })).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn reads_repo_file_without_rewriting_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let raw = r#"{"bugfixKeywords": ["crash"]}"#;
        fs::write(&path, raw).unwrap();

        let settings = load_settings(dir.path(), None).unwrap();
        assert_eq!(settings.bugfix_patterns, vec![r"\bcrash\b".to_string()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(dir.path(), Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}

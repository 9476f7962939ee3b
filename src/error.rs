use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A source file could not be read while `strictReads` is enabled
    #[error("unreadable file {path}: {source}")]
    UnreadableFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No git data mined. Check repo path or since_months.")]
    NoGitData,

    #[error("Join produced empty dataset. Check path normalization.")]
    EmptyJoin,

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    /// The artifact uses a schema or model type this build cannot score with
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("missing feature columns: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
}

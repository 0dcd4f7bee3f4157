use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackbookError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Input directory does not exist: {0}")]
    MissingInputDir(String),
}

impl StackbookError {
    /// Short machine label used in `fatal:<kind>` log reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Db(_) => "database",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Settings(_) => "settings",
            Self::MissingInputDir(_) => "missing_input_dir",
        }
    }
}

pub type Result<T> = std::result::Result<T, StackbookError>;

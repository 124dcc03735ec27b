use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobcodeError {
    #[error("project name is not in YYMM-CLIENT-NNN form: '{0}'")]
    UnstructuredName(String),

    #[error("sequence store error: {0}")]
    Sequence(String),

    #[error("could not allocate a job number for {client} after {attempts} attempts")]
    SequenceConflict { client: String, attempts: u32 },

    #[error("sequence table already exists: use --recreate to rebuild it")]
    TableExists,

    #[error("{method} {url} returned {status}")]
    Http {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for JobcodeError {
    fn from(e: rusqlite::Error) -> Self {
        JobcodeError::Sequence(e.to_string())
    }
}

impl From<reqwest::Error> for JobcodeError {
    fn from(e: reqwest::Error) -> Self {
        JobcodeError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobcodeError>;

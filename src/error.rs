use std::path::PathBuf;

pub type DeckResult<T> = Result<T, DeckError>;

#[derive(thiserror::Error, Debug)]
pub enum DeckError {
    #[error("malformed locator: {0:?}")]
    MalformedLocator(String),

    #[error("catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    #[error("i/o failure at {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DeckError {
    pub fn malformed_locator(locator: impl Into<String>) -> Self {
        Self::MalformedLocator(locator.into())
    }

    pub fn upstream(msg: impl ToString) -> Self {
        Self::UpstreamUnavailable(msg.to_string())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

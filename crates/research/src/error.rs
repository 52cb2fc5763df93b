use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("arXiv request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("arXiv returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed arXiv feed: {0}")]
    Feed(String),

    #[error("arXiv rejected the query: {0}")]
    Query(String),
}

impl From<roxmltree::Error> for Error {
    fn from(error: roxmltree::Error) -> Self {
        Self::Feed(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

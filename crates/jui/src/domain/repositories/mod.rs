use thiserror::Error;

pub mod chapter;
pub mod download;
pub mod image;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded {0}: {1}")]
    Status(u16, String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

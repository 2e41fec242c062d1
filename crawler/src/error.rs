use thiserror::Error;
use tokio::io;

/// Errors raised while setting up or running a crawl.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("result writer failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

use thiserror::Error;

use crate::distributed::DistributedCacheError;

#[derive(Error, Debug)]
pub enum AuthCacheError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Distributed cache error: {0}")]
    Distributed(#[from] DistributedCacheError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<figment::Error> for AuthCacheError {
    fn from(err: figment::Error) -> Self {
        AuthCacheError::Config(err.to_string())
    }
}

impl From<garde::Report> for AuthCacheError {
    fn from(report: garde::Report) -> Self {
        AuthCacheError::Config(report.to_string())
    }
}

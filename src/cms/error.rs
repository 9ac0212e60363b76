//! Errors raised while talking to the content repository

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("CMS request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CMS responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CMS repository did not advertise a master ref")]
    MissingMasterRef,

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Failed to load fixtures from {path}: {message}")]
    Fixtures { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CmsError>;

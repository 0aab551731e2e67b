//! Error types for calnudge.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Errors raised by the delivery collaborator for a single recipient.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("User {0} has no bot token configured")]
    MissingBotToken(i64),

    #[error("User {0} has no chat id configured")]
    MissingChatId(i64),

    #[error("Delivery API returned {status}: {description}")]
    Rejected { status: u16, description: String },

    #[error("Delivery timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors that can occur in calnudge operations.
#[derive(Error, Debug)]
pub enum NudgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Result type alias for calnudge operations.
pub type NudgeResult<T> = Result<T, NudgeError>;

pub type StoreResult<T> = Result<T, StoreError>;

pub type DeliveryResult<T> = Result<T, DeliveryError>;

//! Launch Board Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// 런칭 보드 에러
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Launch project not found: {0}")]
    LaunchProjectNotFound(String),

    #[error("Invalid launch status key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LaunchError {
    pub fn validation(message: impl Into<String>) -> Self {
        LaunchError::Validation(message.into())
    }
}

pub type LaunchResult<T> = Result<T, LaunchError>;

/// 프론트엔드 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<LaunchError> for CommandError {
    fn from(error: LaunchError) -> Self {
        let code = match &error {
            LaunchError::Store(_) => "STORE_ERROR",
            LaunchError::Database(_) => "DB_ERROR",
            LaunchError::Http(_) => "HTTP_ERROR",
            LaunchError::Io(_) => "IO_ERROR",
            LaunchError::Serialization(_) => "SERIALIZATION_ERROR",
            LaunchError::Validation(_) => "VALIDATION_ERROR",
            LaunchError::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            LaunchError::LaunchProjectNotFound(_) => "LAUNCH_PROJECT_NOT_FOUND",
            LaunchError::InvalidKey(_) => "INVALID_KEY",
            LaunchError::Config(_) => "CONFIG_ERROR",
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

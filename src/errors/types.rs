//! Error type definitions for the playlist manager.
//!
//! All fallible operations below the web layer return [`AppError`]. The web
//! layer converts it into an HTTP status plus a JSON `{"error": ...}` body,
//! which is the contract the editor client expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource lookup failures (playlist, channel, backup)
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Request payload validation failures
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// URL fetch failures during playlist import
    #[error("Upstream fetch failed: {url} - {message}")]
    UpstreamFetch { url: String, message: String },

    /// Backup filename escaping the backup directory
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON decode failures for persisted metadata columns
    #[error("Metadata decode error: {0}")]
    MetadataDecode(#[from] serde_json::Error),

    /// Filesystem errors (backup create/restore/delete)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an upstream fetch error
    pub fn upstream_fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::UpstreamFetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path<P: Into<String>>(path: P) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// HTTP status the error maps to at the web boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamFetch { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::MetadataDecode(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

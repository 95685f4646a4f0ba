//! Error types for updrive

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised by the Drive client and the OAuth flow.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Non-success response from a Google endpoint
    #[error("GoogleAPIError {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// The client secret file is needed for consent but does not exist
    #[error("client secret file '{}' does not exist", .0.display())]
    MissingClientSecret(PathBuf),

    /// The client secret file has neither an `installed` nor a `web` section
    #[error("client secret file '{}' has no `installed` or `web` client", .0.display())]
    InvalidClientSecret(PathBuf),

    /// The user denied consent or the callback was malformed
    #[error("consent flow failed: {0}")]
    Consent(String),

    /// The callback carried a `state` other than the one we sent
    #[error("OAuth callback state does not match the request")]
    StateMismatch,

    /// Token expired and there is nothing to refresh it with
    #[error("credentials expired and no refresh token is available")]
    NoRefreshToken,

    #[error("unexpected response with no `Location` header")]
    MissingUploadLocation,
}

/// Argument problems detected before any credential or network access.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("--local-path is required for upload.")]
    MissingUploadPath,

    #[error("{} is not a file or is missing.", .0.display())]
    NotAFile(PathBuf),

    #[error("--file-name is required for download.")]
    MissingFileName,

    #[error("--local-path is required for download.")]
    MissingTargetDir,

    #[error("{} is not a directory or is missing.", .0.display())]
    NotADirectory(PathBuf),

    #[error("--folder-name is required for create-folder.")]
    MissingFolderName,
}

mod client_secret;
mod credentials;
mod drive_file;

pub use client_secret::ClientSecret;
pub use credentials::{Credentials, TOKEN_URI};
pub use drive_file::{DriveFile, FOLDER};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: u64,
    pub done: u64,
}

impl Progress {
    /// Whole percent received, 0 while the size is unknown.
    pub fn percent(&self) -> u64 {
        match self.total {
            0 => 0,
            t => self.done * 100 / t,
        }
    }
}

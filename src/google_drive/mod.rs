mod api;
mod consent;
mod oauth;
mod types;
mod utils;

use reqwest::Client;

pub use api::*;
pub use consent::{Callback, ConsentFlow};
pub use oauth::*;
pub use types::*;

/// Base URLs of the Drive v3 API.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub files: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            files: RES_URI.to_string(),
            upload: UPLOAD_URI.to_string(),
        }
    }
}

/// An authenticated Drive v3 client.
pub struct GoogleDrive {
    http: Client,
    endpoints: Endpoints,
    auth: Authenticator,
    download_chunk: u64,
}

impl GoogleDrive {
    pub fn new(http: Client, auth: Authenticator) -> Self {
        Self {
            http,
            endpoints: Endpoints::default(),
            auth,
            download_chunk: DOWNLOAD_CHUNK,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets how many bytes a download receives between progress reports.
    pub fn with_download_chunk(mut self, bytes: u64) -> Self {
        self.download_chunk = bytes.max(1);
        self
    }
}

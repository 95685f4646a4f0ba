use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::credentials::TOKEN_URI;
use crate::error::DriveError;

const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

// Layout of the JSON file downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn parse(path: &Path, json: &str) -> Result<Self> {
        let file = serde_json::from_str::<ClientSecretFile>(json).with_context(|| {
            format!("Could not parse client secret file '{}'", path.display())
        })?;

        file.installed
            .or(file.web)
            .ok_or_else(|| DriveError::InvalidClientSecret(path.to_owned()).into())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DriveError::MissingClientSecret(path.to_owned()).into());
        }

        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read client secret file '{}'", path.display()))?;

        Self::parse(path, &json)
    }
}

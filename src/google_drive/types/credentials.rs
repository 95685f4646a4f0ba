use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::TokenResponse;
use crate::{error::DriveError, google_drive::utils::Res};

pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// tokens this close to expiry are treated as expired
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: u64,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

fn now() -> Result<Duration> {
    UNIX_EPOCH
        .elapsed()
        .with_context(|| "Time went backwards!")
}

impl Credentials {
    pub fn from_token(
        token: TokenResponse,
        client_id: &str,
        client_secret: &str,
        token_uri: &str,
        scopes: &[String],
    ) -> Result<Self> {
        Ok(Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: (now()? + Duration::from_secs(token.expires_in)).as_secs(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_uri: token_uri.to_string(),
            scopes: scopes.to_vec(),
        })
    }

    pub fn is_valid(&self) -> Result<bool> {
        if self.access_token.is_empty() {
            return Ok(false);
        }

        let exp = Duration::from_secs(self.expires_at);

        Ok(now()? + EXPIRY_SKEW < exp)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub async fn refresh(&mut self, http: &Client) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(DriveError::NoRefreshToken)?;

        let res = http
            .post(&self.token_uri)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .with_context(|| format!("Could not send post request to '{}'", self.token_uri))?;

        let token = Res::from(res).json::<TokenResponse>().await?;

        self.expires_at = (now()? + Duration::from_secs(token.expires_in)).as_secs();
        self.access_token = token.access_token;
        // Google only sends a refresh token when it rotates it
        if let Some(t) = token.refresh_token {
            self.refresh_token = Some(t);
        }

        Ok(())
    }
}

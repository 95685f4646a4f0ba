//! Runtime settings
//!
//! Defaults are overridden by environment variables and then by flags, both
//! resolved by clap when the [`Cli`](crate::cli::Cli) is parsed.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::{cli::Cli, google_drive::DRIVE_SCOPE};

pub const DEFAULT_TOKEN_CACHE: &str = "token.json";
pub const DEFAULT_CLIENT_SECRET: &str = "client_secret.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where credentials are cached between runs
    pub token_cache: PathBuf,

    /// OAuth client secret, only read when consent is needed
    pub client_secret: PathBuf,

    pub scopes: Vec<String>,

    /// Per-request timeout, none by default
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token_cache: DEFAULT_TOKEN_CACHE.into(),
            client_secret: DEFAULT_CLIENT_SECRET.into(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            timeout: None,
        }
    }
}

impl From<&Cli> for Settings {
    fn from(cli: &Cli) -> Self {
        Self {
            token_cache: cli.token_cache.clone(),
            client_secret: cli.client_secret.clone(),
            timeout: cli.timeout.map(Duration::from_secs),
            ..Self::default()
        }
    }
}

impl Settings {
    pub fn http_client(&self) -> Result<Client> {
        let mut builder =
            Client::builder().user_agent(concat!("updrive/", env!("CARGO_PKG_VERSION")));

        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }

        builder.build().context("Failed to create HTTP client")
    }
}

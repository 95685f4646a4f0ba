use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::RwLock;

use super::{consent::ConsentFlow, types::*};

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Persisted OAuth credentials.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credentials>>;
    fn save(&self, credentials: &Credentials) -> Result<()>;
}

/// Credentials kept as JSON in a local file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for TokenCache {
    fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read token cache '{}'", self.path.display()))?;

        let credentials = serde_json::from_str::<Credentials>(&json)
            .with_context(|| format!("Could not parse token cache '{}'", self.path.display()))?;

        Ok(Some(credentials))
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string_pretty(credentials)?;

        std::fs::write(&self.path, json)
            .with_context(|| format!("Could not write token cache '{}'", self.path.display()))
    }
}

pub struct Authenticator {
    http: Client,
    store: Box<dyn CredentialStore>,
    credentials: RwLock<Credentials>,
}

impl Authenticator {
    pub fn new(http: Client, store: Box<dyn CredentialStore>, credentials: Credentials) -> Self {
        Self {
            http,
            store,
            credentials: RwLock::new(credentials),
        }
    }

    /// Reuses cached credentials when possible, otherwise refreshes them or
    /// asks the user for consent. New credentials are written back to `store`.
    pub async fn authenticate(
        http: Client,
        store: Box<dyn CredentialStore>,
        client_secret: &Path,
        scopes: &[String],
    ) -> Result<Self> {
        let credentials = match store.load()? {
            Some(c) if c.is_valid()? => {
                tracing::debug!("using cached credentials");
                c
            }
            Some(mut c) if c.can_refresh() => {
                tracing::info!("refreshing expired credentials");
                c.refresh(&http).await?;
                store.save(&c)?;
                c
            }
            _ => {
                tracing::info!("no usable credentials, starting consent flow");
                let secret = ClientSecret::load(client_secret).await?;
                let c = ConsentFlow::bind(&secret, scopes)
                    .await?
                    .run(&http)
                    .await?;
                store.save(&c)?;
                c
            }
        };

        Ok(Self::new(http, store, credentials))
    }

    pub async fn auth_header(&self) -> Result<String> {
        let c = self.credentials.read().await;

        if c.is_valid()? {
            return Ok(format!("Bearer {}", c.access_token));
        }

        {
            // dropping this read guard is necessary to obtain a write guard
            drop(c);
            let mut c = self.credentials.write().await;

            // another request may have refreshed while we waited
            if !c.is_valid()? {
                self.refresh(&mut c).await?;
            }

            Ok(format!("Bearer {}", c.access_token))
        }
    }

    async fn refresh(&self, credentials: &mut Credentials) -> Result<()> {
        tracing::info!("access token expired, refreshing");
        credentials.refresh(&self.http).await?;
        self.store.save(credentials)
    }
}

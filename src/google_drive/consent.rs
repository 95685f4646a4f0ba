use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{Client, Url};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};

use super::{types::*, utils::Res};
use crate::error::DriveError;

const STATE_LEN: usize = 30;
const SUCCESS_MESSAGE: &str = "The authentication flow has completed. You may close this window.";
const DENIED_MESSAGE: &str = "Authorization was not granted. You may close this window.";

/// The part of an OAuth redirect we care about.
#[derive(Debug, PartialEq, Eq)]
pub enum Callback {
    Code { code: String, state: Option<String> },
    Denied(String),
    // favicon and other stray requests from the browser
    Other,
}

impl Callback {
    /// Parses the request line of the redirect, e.g. `GET /?code=..&state=.. HTTP/1.1`.
    pub fn parse(request_line: &str) -> Result<Self> {
        let target = request_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| DriveError::Consent(format!("malformed request `{request_line}`")))?;

        let url = Url::parse("http://localhost")?
            .join(target)
            .with_context(|| format!("invalid request target `{target}`"))?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "code" => code = Some(v.into_owned()),
                "state" => state = Some(v.into_owned()),
                "error" => error = Some(v.into_owned()),
                _ => {}
            }
        }

        Ok(match (code, error) {
            (_, Some(e)) => Self::Denied(e),
            (Some(code), None) => Self::Code { code, state },
            (None, None) => Self::Other,
        })
    }
}

/// Installed-app authorization code flow with a loopback redirect.
pub struct ConsentFlow {
    listener: TcpListener,
    secret: ClientSecret,
    scopes: Vec<String>,
    redirect_uri: String,
    state: String,
}

impl ConsentFlow {
    pub async fn bind(secret: &ClientSecret, scopes: &[String]) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .with_context(|| "Could not start the local OAuth callback listener")?;
        let port = listener.local_addr()?.port();

        let state = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();

        Ok(Self {
            listener,
            secret: secret.clone(),
            scopes: scopes.to_vec(),
            redirect_uri: format!("http://localhost:{port}/"),
            state,
        })
    }

    pub fn authorization_url(&self) -> Result<Url> {
        let scope = self.scopes.join(" ");

        Url::parse_with_params(
            &self.secret.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
            ],
        )
        .with_context(|| format!("invalid auth_uri `{}`", self.secret.auth_uri))
    }

    pub async fn run(self, http: &Client) -> Result<Credentials> {
        println!(
            "Please visit this URL to authorize this application: {}",
            self.authorization_url()?
        );

        let code = self.wait_for_code().await?;
        self.exchange(http, &code).await
    }

    pub async fn wait_for_code(&self) -> Result<String> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "OAuth callback connection");

            match self.handle(stream).await? {
                Some(code) => return Ok(code),
                None => continue,
            }
        }
    }

    async fn handle(&self, stream: TcpStream) -> Result<Option<String>> {
        let mut reader = BufReader::new(stream);

        let mut request_line = String::new();
        if let Err(e) = reader.read_line(&mut request_line).await {
            tracing::debug!(%e, "unreadable OAuth callback request");
            return Ok(None);
        }

        // drain headers so the browser sees a clean response
        let mut line = String::new();
        while let Ok(n) = reader.read_line(&mut line).await {
            if n <= 2 {
                break;
            }
            line.clear();
        }

        let mut stream = reader.into_inner();

        // browsers open speculative connections that never send a request
        if request_line.trim().is_empty() {
            return Ok(None);
        }

        let callback = match Callback::parse(request_line.trim_end()) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(%e, "ignoring malformed OAuth callback request");
                respond(&mut stream, "400 Bad Request", "").await?;
                return Ok(None);
            }
        };

        match callback {
            Callback::Other => {
                respond(&mut stream, "404 Not Found", "").await?;
                Ok(None)
            }
            Callback::Denied(e) => {
                let body = format!("{DENIED_MESSAGE} ({e})");
                respond(&mut stream, "200 OK", &body).await?;
                Err(DriveError::Consent(e).into())
            }
            Callback::Code { code, state } => {
                respond(&mut stream, "200 OK", SUCCESS_MESSAGE).await?;

                if state.as_deref() != Some(self.state.as_str()) {
                    return Err(DriveError::StateMismatch.into());
                }
                Ok(Some(code))
            }
        }
    }

    pub async fn exchange(&self, http: &Client, code: &str) -> Result<Credentials> {
        let res = http
            .post(&self.secret.token_uri)
            .form(&[
                ("code", code),
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .with_context(|| {
                format!("Could not send post request to '{}'", self.secret.token_uri)
            })?;

        let token = Res::from(res).json::<TokenResponse>().await?;

        Credentials::from_token(
            token,
            &self.secret.client_id,
            &self.secret.client_secret,
            &self.secret.token_uri,
            &self.scopes,
        )
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<()> {
    let res = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(res.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

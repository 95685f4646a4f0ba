use std::path::Path;

use anyhow::Context;
use reqwest::Response;
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::DriveError;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

// Drive returns an object, the token endpoint returns a bare string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object { message: String },
    Code(String),
}

/// A Google API response that has not been checked for success yet.
pub struct Res(Response);

impl Res {
    pub async fn ok(self) -> anyhow::Result<Response> {
        let res = self.0;
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.with_context(|| "Could not get response")?;
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                error: ErrorDetail::Object { message },
            }) => message,
            Ok(ErrorBody {
                error: ErrorDetail::Code(code),
            }) => code,
            Err(_) => text,
        };

        Err(DriveError::Api { status, message }.into())
    }

    pub async fn json<T: DeserializeOwned>(self) -> anyhow::Result<T> {
        let bytes = self
            .ok()
            .await?
            .bytes()
            .await
            .with_context(|| "Could not get response")?;
        let t = serde_json::from_slice::<T>(&bytes)?;
        Ok(t)
    }
}

impl From<Response> for Res {
    fn from(r: Response) -> Self {
        Self(r)
    }
}

/// Guesses the media type from the extension, sniffing the content only when
/// the extension is missing or unknown.
pub async fn get_mime(file: &Path) -> anyhow::Result<String> {
    if let Some(mime) = mime_guess::from_path(file).first_raw() {
        return Ok(mime.to_string());
    }

    let file = file.to_owned();

    let mime = tokio::task::spawn_blocking(move || {
        tree_magic_mini::from_filepath(file.as_path()).map(|s| s.to_string())
    })
    .await?;

    Ok(mime.unwrap_or_else(|| FALLBACK_MIME.to_string()))
}

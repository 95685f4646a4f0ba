use std::path::Path;

use anyhow::{Context, Result};
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::{header::*, Body, Response};
use tokio::{
    fs,
    io::{AsyncWriteExt, BufWriter},
};
use tokio_util::io::ReaderStream;

use super::{types::*, utils, utils::Res, GoogleDrive};
use crate::error::DriveError;

pub const RES_URI: &str = "https://www.googleapis.com/drive/v3/files";
pub const UPLOAD_URI: &str = "https://www.googleapis.com/upload/drive/v3/files";

// progress is reported once per chunk, like the media download helpers of
// Google's client libraries
pub const DOWNLOAD_CHUNK: u64 = 100 * 1024 * 1024;

lazy_static::lazy_static! {
    static ref GET_FIELDS: String = DriveFile::fields().join(",");
    static ref LIST_FIELDS: String = format!("nextPageToken,files({})", GET_FIELDS.as_str());
}

impl GoogleDrive {
    /// Uploads `path` with a resumable session and returns the created file.
    pub async fn create_file(&self, path: &Path, parent_id: Option<&str>) -> Result<DriveFile> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("'{}' has no file name", path.display()))?;

        let mime = utils::get_mime(path).await?;
        let file = fs::File::open(path)
            .await
            .with_context(|| format!("Could not open file '{}'", path.display()))?;
        let size = file.metadata().await?.len();

        let mut meta = serde_json::json!({
            "name": file_name,
            "mimeType": mime,
        });
        if let Some(p) = parent_id {
            meta["parents"] = serde_json::json!([p]);
        }

        let res = self
            .http
            .post(&self.endpoints.upload)
            .query(&[("uploadType", "resumable"), ("fields", GET_FIELDS.as_str())])
            .header(AUTHORIZATION, &self.auth.auth_header().await?)
            .header("X-Upload-Content-Type", &mime)
            .header("X-Upload-Content-Length", size)
            .json(&meta)
            .send()
            .await
            .with_context(|| format!("Could not send POST request to `{}`", self.endpoints.upload))?;

        let upload_url = Res::from(res)
            .ok()
            .await?
            .headers()
            .get(LOCATION)
            .ok_or(DriveError::MissingUploadLocation)?
            .to_str()?
            .to_owned();

        tracing::debug!(%upload_url, size, %mime, "uploading {}", file_name);

        let res = self
            .http
            .put(&upload_url)
            .header(AUTHORIZATION, &self.auth.auth_header().await?)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .with_context(|| format!("Could not send PUT request to `{upload_url}`"))?;

        Res::from(res).json::<DriveFile>().await
    }

    pub async fn create_dir(&self, dir_name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let mut meta = serde_json::json!({
            "name": dir_name,
            "mimeType": FOLDER,
        });
        if let Some(p) = parent_id {
            meta["parents"] = serde_json::json!([p]);
        }

        tracing::debug!(dir_name, ?parent_id, "creating folder");

        let res = self
            .http
            .post(&self.endpoints.files)
            .query(&[("fields", GET_FIELDS.as_str())])
            .header(AUTHORIZATION, &self.auth.auth_header().await?)
            .json(&meta)
            .send()
            .await
            .with_context(|| format!("Could not send POST request to `{}`", self.endpoints.files))?;

        Res::from(res).json::<DriveFile>().await
    }

    /// Fetches a single page of results. `nextPageToken` is never followed.
    pub async fn list(&self, query: Option<&str>, page_size: u32) -> Result<ListResponse> {
        let page_size = page_size.to_string();

        let mut params = vec![
            ("fields", LIST_FIELDS.as_str()),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(q) = query {
            params.push(("q", q));
        }

        tracing::debug!(?query, %page_size, "listing files");

        let res = self
            .http
            .get(&self.endpoints.files)
            .query(&params)
            .header(AUTHORIZATION, &self.auth.auth_header().await?)
            .send()
            .await
            .with_context(|| format!("Could not send GET request to `{}`", self.endpoints.files))?;

        Res::from(res).json::<ListResponse>().await
    }

    pub async fn read(&self, id: &str) -> Result<Response> {
        let url = format!("{}/{id}", self.endpoints.files);

        let res = self
            .http
            .get(&url)
            .query(&[("alt", "media")])
            .header(AUTHORIZATION, &self.auth.auth_header().await?)
            .send()
            .await
            .with_context(|| format!("Could not send GET request to `{url}`"))?;

        Res::from(res).ok().await
    }

    /// Streams the content of `id` into `path`, yielding progress at every
    /// multiple of the download chunk size (see
    /// [`with_download_chunk`](GoogleDrive::with_download_chunk)) and once more
    /// when the transfer ends off a chunk boundary.
    /// `path` is only created once the API has accepted the request.
    pub fn download<'a>(
        &'a self,
        id: &'a str,
        path: &'a Path,
    ) -> impl Stream<Item = Result<Progress>> + 'a {
        try_stream! {
            let res = self.read(id).await?;

            let mut prog = Progress {
                total: res.content_length().unwrap_or(0),
                done: 0,
            };

            let file = fs::File::create(path)
                .await
                .with_context(|| format!("Could not create file '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);

            let mut body = res.bytes_stream();
            let mut reported = 0;

            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                writer
                    .write_all(&chunk)
                    .await
                    .with_context(|| format!("Error while writing to file '{}'", path.display()))?;

                prog.done += chunk.len() as u64;
                while prog.done - reported >= self.download_chunk {
                    reported += self.download_chunk;
                    yield Progress { total: prog.total, done: reported };
                }
            }
            writer.flush().await?;

            if reported != prog.done || prog.done == 0 {
                yield prog;
            }
        }
    }
}

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Streams remote files to disk.
///
/// The response body is written chunk by chunk as it arrives; the full
/// payload is never held in memory.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// Nothing is created at `dest` unless the server answers with a success
    /// status, and a file interrupted mid-transfer is removed again.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        tracing::info!(%url, dest = %dest.display(), "downloading");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Request {
                url: url.to_owned(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_owned(),
                status,
            });
        }

        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DownloadError::Write {
                path: dest.to_path_buf(),
                source: e,
            })?;

        match stream_to_file(url, dest, response, file).await {
            Ok(written) => {
                tracing::info!(bytes = written, dest = %dest.display(), "download complete");
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    tracing::warn!(error = %rm, dest = %dest.display(), "failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

async fn stream_to_file(
    url: &str,
    dest: &Path,
    mut response: reqwest::Response,
    mut file: tokio::fs::File,
) -> Result<u64, DownloadError> {
    let write_err = |e: std::io::Error| DownloadError::Write {
        path: dest.to_path_buf(),
        source: e,
    };

    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DownloadError::Request {
            url: url.to_owned(),
            source: e,
        })?
    {
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;

    Ok(written)
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download of {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("download of {url} failed with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to write download to {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

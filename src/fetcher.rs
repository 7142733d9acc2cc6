use crate::config::SourceConfig;
use crate::error::{AppError, Result};
use crate::payload::{Metadata, StationPayloads};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the static host serving the fetch job's JSON documents.
pub struct Fetcher {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("station-series/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 3,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn document_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    pub async fn download(&self, name: &str) -> Result<String> {
        let url = self.document_url(name);
        let url = url.as_str();
        debug!("Downloading {}", url);

        retry_with_backoff(self.max_retries, || async {
            let response = self.client.get(url).send().await?;
            let response = response.error_for_status()?;
            let content = response.text().await?;
            Ok(content)
        })
        .await
    }
}

pub enum DataSource {
    Http(Fetcher),
    Local(PathBuf),
}

impl DataSource {
    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        match (&source.base_url, &source.data_dir) {
            (Some(base_url), _) => Ok(DataSource::Http(Fetcher::new(base_url)?)),
            (None, Some(dir)) => Ok(DataSource::Local(dir.clone())),
            (None, None) => Err(AppError::Config(
                "No data source configured".to_string(),
            )),
        }
    }

    pub async fn read(&self, name: &str) -> Result<String> {
        match self {
            DataSource::Http(fetcher) => fetcher.download(name).await,
            DataSource::Local(dir) => {
                let path = dir.join(name);
                debug!("Reading {}", path.display());
                Ok(tokio::fs::read_to_string(&path).await?)
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let content = self.read(name).await?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::InvalidData(format!("Document {} is not valid: {}", name, e))
        })
    }

    pub async fn metadata(&self, name: &str) -> Result<Metadata> {
        self.read_json(name).await
    }

    pub async fn stations(&self, name: &str) -> Result<StationPayloads> {
        self.read_json(name).await
    }
}

/// Retry a future with exponential backoff
async fn retry_with_backoff<F, Fut, T>(max_retries: u32, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                retries += 1;

                if retries > max_retries || !is_transient(&e) {
                    return Err(e);
                }

                let delay = Duration::from_secs(2u64.pow(retries.saturating_sub(1)));
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    retries, max_retries, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Timeouts, connection failures, 5xx responses and IO errors are worth
/// another attempt; data and config errors are not.
fn is_transient(e: &AppError) -> bool {
    match e {
        AppError::Http(reqwest_err) => {
            reqwest_err.is_timeout()
                || reqwest_err.is_connect()
                || reqwest_err
                    .status()
                    .map(|s| s.is_server_error())
                    .unwrap_or(false)
        }
        AppError::Io(_) => true,
        _ => false,
    }
}

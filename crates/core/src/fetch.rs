use crate::config::Settings;
use anyhow::Context;
use std::time::Duration;

/// Port for fetching an image by URL. Used only for the optional cover logo;
/// one attempt, bounded timeout, no retries. Callers treat any failure as
/// "no image" (fail-open).
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_image(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.logo_fetch_timeout_secs))
            .build()
            .context("failed to build image fetch http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_image(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("image request failed")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("image fetch HTTP {status}");
        }

        let bytes = res.bytes().await.context("failed to read image bytes")?;
        Ok(bytes.to_vec())
    }
}

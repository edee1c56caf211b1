//! Content loader: resolves a job posting URL to plain text.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, info};

/// Wrap width for HTML to text conversion.
const HTML_WRAP_WIDTH: usize = 100;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("could not extract text: {0}")]
    Extraction(String),

    #[error("document contained no text")]
    Empty,
}

#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct HttpContentLoader {
    client: Client,
}

impl HttpContentLoader {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentLoader for HttpContentLoader {
    async fn load(&self, url: &Url) -> Result<String, FetchError> {
        info!("Fetching job description from {url}");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response.bytes().await?;
        debug!("Fetched {} bytes ({content_type}) from {url}", body.len());

        let text = if content_type.contains("application/pdf") || url.path().ends_with(".pdf") {
            extract_pdf(body).await?
        } else if content_type.contains("html") {
            extract_html(&body)?
        } else {
            String::from_utf8_lossy(&body).into_owned()
        };

        if text.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(text.trim().to_string())
    }
}

async fn extract_pdf(body: Bytes) -> Result<String, FetchError> {
    let data = body.to_vec();
    // pdf-extract can panic on malformed input.
    let joined = tokio::task::spawn_blocking(move || {
        std::panic::catch_unwind(move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
        })
    })
    .await
    .map_err(|e| FetchError::Extraction(format!("PDF worker failed: {e}")))?;

    match joined {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(FetchError::Extraction(format!("PDF: {e}"))),
        Err(_) => Err(FetchError::Extraction(
            "PDF extraction panicked (malformed file)".to_string(),
        )),
    }
}

fn extract_html(body: &[u8]) -> Result<String, FetchError> {
    html2text::from_read(body, HTML_WRAP_WIDTH)
        .map_err(|e| FetchError::Extraction(format!("HTML: {e}")))
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves fixed pages by URL and records what was requested.
    /// Unknown URLs answer 404.
    #[derive(Default)]
    pub struct StaticContentLoader {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl StaticContentLoader {
        pub fn with_page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }

        pub fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentLoader for StaticContentLoader {
        async fn load(&self, url: &Url) -> Result<String, FetchError> {
            self.fetched.lock().unwrap().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status { status: 404 })
        }
    }
}

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::crawler::encoding::decode_html;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Raw response body plus the charset the server claimed, if any.
pub struct FetchedPage {
    pub bytes: Vec<u8>,
    pub charset_hint: Option<String>,
}

pub fn build_client(cfg: &Config) -> anyhow::Result<Client> {
    let client = Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.request_timeout)
        .build()?;
    Ok(client)
}

pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let res = client.get(url).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            url: url.to_string(),
        });
    }

    let charset_hint = res
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_charset);

    let bytes = res.bytes().await?.to_vec();
    debug!(url, bytes = bytes.len(), "fetched page");

    Ok(FetchedPage {
        bytes,
        charset_hint,
    })
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|cs| cs.trim_matches('"').to_string())
        .next()
}

/// Seam between the crawl logic and the network, so the driver can run
/// against canned pages in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let page = fetch_page(&self.client, url).await?;
        Ok(decode_html(&page.bytes, page.charset_hint.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parsed_from_content_type() {
        assert_eq!(
            extract_charset("text/html; charset=windows-1251"),
            Some("windows-1251".to_string())
        );
        assert_eq!(
            extract_charset("text/html; charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}

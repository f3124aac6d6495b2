use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use reqwest::Client;

use crate::{info_time, Result, USER_AGENT};

/// Where the rendered page comes from.
#[derive(Debug, Clone)]
pub enum PageSource {
    /// Fetch over HTTP.
    Url(String),
    /// Pre-rendered HTML on disk. `base` resolves relative links.
    File { path: PathBuf, base: Option<String> },
}

impl PageSource {
    /// The URL relative links on the page resolve against.
    pub fn base_url(&self) -> Option<&str> {
        match self {
            PageSource::Url(url) => Some(url),
            PageSource::File { base, .. } => base.as_deref(),
        }
    }
}

/// Returns the page's HTML.
pub async fn load_page(source: &PageSource) -> Result<String> {
    match source {
        PageSource::Url(url) => {
            let client = Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(90))
                .build()?;
            request_page_html(&client, url).await
        }
        PageSource::File { path, .. } => {
            info_time!("Reading page from {}", path.display());
            Ok(tokio::fs::read_to_string(path).await?)
        }
    }
}

/// Requests a page and returns a `Result<String>` containing the HTML.
pub async fn request_page_html(client: &Client, url: &str) -> Result<String> {
    let start_time = Local::now();
    let res = client.get(url).send().await?.error_for_status()?;
    let html = res.text().await?;
    info_time!(start_time, "Fetched {url} ({} bytes)", html.len());
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn fetches_page_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/").header("user-agent", USER_AGENT);
                then.status(200).body("<html><h3>Best LLM - Code</h3></html>");
            })
            .await;

        let html = load_page(&PageSource::Url(server.url("/"))).await.unwrap();
        mock.assert_async().await;
        assert!(html.contains("Best LLM - Code"));
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(404);
            })
            .await;

        let err = load_page(&PageSource::Url(server.url("/gone"))).await.unwrap_err();
        assert!(matches!(err, crate::Error::Reqwest(_)), "{err}");
    }

    #[test]
    fn file_source_uses_explicit_base() {
        let source = PageSource::File {
            path: "page.html".into(),
            base: Some("https://llm-stats.com/".into()),
        };
        assert_eq!(source.base_url(), Some("https://llm-stats.com/"));
    }
}

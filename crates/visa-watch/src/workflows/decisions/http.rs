use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use super::fetcher::{DocumentSource, FetchError};
use super::resolver::{PageError, PageSource};

/// The spreadsheet download always gets its own 30 second limit.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest` client sending a browser-like `User-Agent`, shared by the page
/// fetch, the document download and the notifier.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, PageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| PageError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                status: status.as_u16(),
            });
        }

        info!(url, status = status.as_u16(), "fetched decisions page");
        response
            .text()
            .await
            .map_err(|err| PageError::Transport(err.to_string()))
    }
}

#[async_trait]
impl DocumentSource for HttpClient {
    async fn fetch_document(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "failed to download the visa decision file");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use mockito::Server;

    use crate::config::DEFAULT_USER_AGENT;
    use crate::workflows::decisions::{date_labels, LinkResolver};

    fn client() -> HttpClient {
        HttpClient::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).expect("client builds")
    }

    #[tokio::test]
    async fn page_fetch_sends_the_browser_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/decisions")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body("<html><body>decisions</body></html>")
            .expect(1)
            .create_async()
            .await;

        let html = client()
            .fetch_page(&format!("{}/decisions", server.url()))
            .await
            .expect("page fetched");

        assert_eq!(html, "<html><body>decisions</body></html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn page_fetch_rejects_non_success_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/decisions")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = client()
            .fetch_page(&format!("{}/decisions", server.url()))
            .await
            .expect_err("503 is an error");

        assert!(matches!(err, PageError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn unavailable_page_resolves_to_no_link() {
        let mut server = Server::new_async().await;
        // The body still carries a matching link; the status alone must decide.
        server
            .mock("GET", "/decisions")
            .with_status(503)
            .with_body(
                "<a href=\"/d.ods\">Visa decisions made from 1 January 2024 to 9 June 2025</a>",
            )
            .create_async()
            .await;

        let resolver = LinkResolver::new(
            Arc::new(client()),
            format!("{}/decisions", server.url()),
            Url::parse("https://www.ireland.ie").expect("valid origin"),
            "Visa decisions made from 1 January 2024 to".to_string(),
        );
        let labels = date_labels(NaiveDate::from_ymd_opt(2025, 6, 9).expect("valid date"), 3);

        assert!(resolver.resolve(&labels).await.is_none());
    }

    #[tokio::test]
    async fn document_download_returns_the_body_bytes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/decisions.ods")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body(b"PK\x03\x04 spreadsheet".to_vec())
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/decisions.ods", server.url())).expect("valid url");
        let bytes = client().fetch_document(&url).await.expect("downloaded");

        assert_eq!(bytes, b"PK\x03\x04 spreadsheet".to_vec());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn document_download_rejects_non_success_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/decisions.ods")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/decisions.ods", server.url())).expect("valid url");
        let err = client()
            .fetch_document(&url)
            .await
            .expect_err("404 is an error");

        assert!(matches!(err, FetchError::Status { status: 404 }));
    }
}

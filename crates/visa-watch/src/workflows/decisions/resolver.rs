use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::domain::{DateLabel, LinkCandidate};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("page request failed: {0}")]
    Transport(String),
    #[error("page returned HTTP {status}")]
    Status { status: u16 },
}

/// Source of the HTML page that lists the published decision files.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, PageError>;
}

/// Anchor text expected for `label`, e.g.
/// `Visa decisions made from 1 January 2024 to 9 June 2025`.
pub fn link_text(prefix: &str, label: &DateLabel) -> String {
    format!("{prefix} {label}")
}

/// Scans labels in order and returns the candidate for the first label with
/// a matching anchor. Labels after that one are never examined.
///
/// Matching is exact: the concatenated text of an `<a href>` element must
/// equal [`link_text`] byte for byte.
pub fn find_link(html: &str, prefix: &str, labels: &[DateLabel]) -> Option<LinkCandidate> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").ok()?;

    labels
        .iter()
        .map(|label| candidate_for(&document, &anchors, prefix, label))
        .find(|candidate| candidate.url.is_some())
}

fn candidate_for(
    document: &Html,
    anchors: &Selector,
    prefix: &str,
    label: &DateLabel,
) -> LinkCandidate {
    let expected = link_text(prefix, label);
    let url = document
        .select(anchors)
        .find(|anchor| anchor_text(anchor) == expected)
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string);

    if url.is_none() {
        debug!(%label, "no decisions link for label");
    }

    LinkCandidate {
        label: label.clone(),
        url,
    }
}

fn anchor_text(anchor: &ElementRef<'_>) -> String {
    anchor.text().collect()
}

/// Fetches the decisions page and resolves the newest matching link against
/// the document origin.
pub struct LinkResolver<P> {
    pages: Arc<P>,
    page_url: String,
    origin: Url,
    link_prefix: String,
}

impl<P> LinkResolver<P>
where
    P: PageSource + 'static,
{
    pub fn new(pages: Arc<P>, page_url: String, origin: Url, link_prefix: String) -> Self {
        Self {
            pages,
            page_url,
            origin,
            link_prefix,
        }
    }

    /// Any failure along the way resolves to `None`; the reason is logged.
    pub async fn resolve(&self, labels: &[DateLabel]) -> Option<Url> {
        let html = match self.pages.fetch_page(&self.page_url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(error = %err, url = %self.page_url, "failed to access the decisions page");
                return None;
            }
        };

        let Some(candidate) = find_link(&html, &self.link_prefix, labels) else {
            warn!(
                days = labels.len(),
                "could not find the visa decision link for the recent days"
            );
            return None;
        };

        let href = candidate.url.as_deref()?;
        match self.origin.join(href) {
            Ok(url) => {
                info!(%url, label = %candidate.label, "found latest visa decision file link");
                Some(url)
            }
            Err(err) => {
                warn!(error = %err, href, "decision link is not a valid url");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PREFIX: &str = "Visa decisions made from 1 January 2024 to";

    fn labels(values: &[&str]) -> Vec<DateLabel> {
        values.iter().copied().map(DateLabel::new).collect()
    }

    fn page(anchors: &[(&str, &str)]) -> String {
        let links: String = anchors
            .iter()
            .map(|(href, text)| format!("<li><a href=\"{href}\">{text}</a></li>"))
            .collect();
        format!("<html><body><h2 id=\"Decisions\">Decisions</h2><ul>{links}</ul></body></html>")
    }

    #[test]
    fn matches_exact_anchor_text() {
        let html = page(&[(
            "/en/files/decisions-9-june.ods",
            "Visa decisions made from 1 January 2024 to 9 June 2025",
        )]);

        let found = find_link(&html, PREFIX, &labels(&["9 June 2025"])).expect("link found");
        assert_eq!(found.label.as_str(), "9 June 2025");
        assert_eq!(found.url.as_deref(), Some("/en/files/decisions-9-june.ods"));
    }

    #[test]
    fn rejects_partial_and_case_differing_text() {
        let html = page(&[
            (
                "/partial.ods",
                "Visa decisions made from 1 January 2024 to 9 June 2025 (ODS 120KB)",
            ),
            (
                "/lower.ods",
                "visa decisions made from 1 january 2024 to 9 june 2025",
            ),
            ("/short.ods", "Visa decisions made from 1 January 2024"),
        ]);

        assert!(find_link(&html, PREFIX, &labels(&["9 June 2025"])).is_none());
    }

    #[test]
    fn stops_at_the_most_recent_label_with_a_match() {
        let html = page(&[
            (
                "/older.ods",
                "Visa decisions made from 1 January 2024 to 8 June 2025",
            ),
            (
                "/newest.ods",
                "Visa decisions made from 1 January 2024 to 9 June 2025",
            ),
        ]);

        let found = find_link(
            &html,
            PREFIX,
            &labels(&["9 June 2025", "8 June 2025", "7 June 2025"]),
        )
        .expect("link found");
        assert_eq!(found.label.as_str(), "9 June 2025");
        assert_eq!(found.url.as_deref(), Some("/newest.ods"));
    }

    #[test]
    fn falls_back_to_older_label_when_newest_is_missing() {
        let html = page(&[(
            "/seven.ods",
            "Visa decisions made from 1 January 2024 to 7 June 2025",
        )]);

        let found = find_link(
            &html,
            PREFIX,
            &labels(&["9 June 2025", "8 June 2025", "7 June 2025"]),
        )
        .expect("link found");
        assert_eq!(found.label.as_str(), "7 June 2025");
    }

    #[test]
    fn ignores_anchors_without_href_and_empty_documents() {
        let html = "<html><body><a>Visa decisions made from 1 January 2024 to 9 June 2025</a></body></html>";
        assert!(find_link(html, PREFIX, &labels(&["9 June 2025"])).is_none());
        assert!(find_link("", PREFIX, &labels(&["9 June 2025"])).is_none());
        assert!(find_link("<a href=", PREFIX, &labels(&["9 June 2025"])).is_none());
    }

    #[derive(Default)]
    struct FakePages {
        response: Mutex<Option<Result<String, PageError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakePages {
        fn returning(response: Result<String, PageError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for FakePages {
        async fn fetch_page(&self, url: &str) -> Result<String, PageError> {
            self.requested
                .lock()
                .expect("requests mutex")
                .push(url.to_string());
            self.response
                .lock()
                .expect("response mutex")
                .take()
                .unwrap_or_else(|| Err(PageError::Transport("no response queued".to_string())))
        }
    }

    fn resolver(pages: Arc<FakePages>) -> LinkResolver<FakePages> {
        LinkResolver::new(
            pages,
            "https://www.ireland.ie/en/india/newdelhi/services/visas/processing-times-and-decisions/"
                .to_string(),
            Url::parse("https://www.ireland.ie").expect("valid origin"),
            PREFIX.to_string(),
        )
    }

    #[tokio::test]
    async fn resolve_joins_relative_href_onto_origin() {
        let html = page(&[(
            "/en/india/newdelhi/decisions.ods",
            "Visa decisions made from 1 January 2024 to 9 June 2025",
        )]);
        let pages = Arc::new(FakePages::returning(Ok(html)));

        let url = resolver(pages.clone())
            .resolve(&labels(&["9 June 2025"]))
            .await
            .expect("url resolved");

        assert_eq!(
            url.as_str(),
            "https://www.ireland.ie/en/india/newdelhi/decisions.ods"
        );
        assert_eq!(pages.requested.lock().expect("requests mutex").len(), 1);
    }

    #[tokio::test]
    async fn resolve_keeps_absolute_href() {
        let html = page(&[(
            "https://assets.ireland.ie/decisions.ods",
            "Visa decisions made from 1 January 2024 to 9 June 2025",
        )]);
        let pages = Arc::new(FakePages::returning(Ok(html)));

        let url = resolver(pages)
            .resolve(&labels(&["9 June 2025"]))
            .await
            .expect("url resolved");

        assert_eq!(url.as_str(), "https://assets.ireland.ie/decisions.ods");
    }

    #[tokio::test]
    async fn resolve_returns_none_on_error_status() {
        let pages = Arc::new(FakePages::returning(Err(PageError::Status { status: 403 })));

        assert!(resolver(pages)
            .resolve(&labels(&["9 June 2025"]))
            .await
            .is_none());
    }
}

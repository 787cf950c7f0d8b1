use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use url::Url;
use visa_watch::config::{NotifierConfig, WatchConfig};
use visa_watch::error::AppError;
use visa_watch::workflows::decisions::{
    DecisionCheck, HttpClient, LinkResolver, MessagingApiNotifier, Notifier, NotifyError,
    RecordFetcher, StagingSlot,
};

/// A check wired to the real site, with the notifier left open so the CLI can
/// swap in [`DryRunNotifier`].
pub(crate) type LiveCheck<N> = DecisionCheck<HttpClient, HttpClient, N>;

pub(crate) fn http_client(watch: &WatchConfig) -> Result<Arc<HttpClient>, AppError> {
    let client = HttpClient::new(&watch.user_agent, watch.http_timeout)?;
    Ok(Arc::new(client))
}

pub(crate) fn messaging_notifier(
    config: &NotifierConfig,
    http: &HttpClient,
) -> MessagingApiNotifier {
    MessagingApiNotifier::from_config(http.client().clone(), config)
}

pub(crate) fn build_check<N>(
    watch: &WatchConfig,
    http: Arc<HttpClient>,
    notifier: Arc<N>,
) -> Result<LiveCheck<N>, AppError>
where
    N: Notifier + 'static,
{
    let origin = Url::parse(&watch.document_origin).map_err(|source| AppError::InvalidUrl {
        url: watch.document_origin.clone(),
        source,
    })?;

    let resolver = LinkResolver::new(
        http.clone(),
        watch.page_url.clone(),
        origin,
        watch.link_prefix.clone(),
    );
    let fetcher = RecordFetcher::new(http, StagingSlot::at(watch.download_path.clone()));

    Ok(DecisionCheck::new(
        resolver,
        fetcher,
        notifier,
        watch.application_number,
        watch.lookback_days,
    ))
}

/// Prints the message to stdout instead of calling the messaging API.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DryRunNotifier;

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        println!("{message}");
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use visa_watch::config::{
        DEFAULT_DOCUMENT_ORIGIN, DEFAULT_LINK_PREFIX, DEFAULT_PAGE_URL, DEFAULT_USER_AGENT,
    };

    fn watch_config() -> WatchConfig {
        WatchConfig {
            application_number: 69587592,
            page_url: DEFAULT_PAGE_URL.to_string(),
            document_origin: DEFAULT_DOCUMENT_ORIGIN.to_string(),
            link_prefix: DEFAULT_LINK_PREFIX.to_string(),
            lookback_days: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download_path: PathBuf::from("Visa_Decision.ods"),
            http_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn build_check_wires_the_configured_application() {
        let watch = watch_config();
        let http = http_client(&watch).expect("client builds");

        let check = build_check(&watch, http, Arc::new(DryRunNotifier)).expect("check builds");
        assert_eq!(check.application_number(), 69587592);
    }

    #[test]
    fn build_check_rejects_a_relative_origin() {
        let watch = WatchConfig {
            document_origin: "www.ireland.ie".to_string(),
            ..watch_config()
        };
        let http = http_client(&watch).expect("client builds");

        let err = build_check(&watch, http, Arc::new(DryRunNotifier))
            .err()
            .expect("origin rejected");
        assert!(matches!(err, AppError::InvalidUrl { .. }));
        assert!(err.to_string().contains("www.ireland.ie"));
    }

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(" 2025-06-09 "),
            Ok(NaiveDate::from_ymd_opt(2025, 6, 9).expect("valid date"))
        );
        assert!(parse_date("09/06/2025").is_err());
    }

    #[tokio::test]
    async fn dry_run_notifier_always_succeeds() {
        assert!(DryRunNotifier
            .send("Application Number 69587592: Approved")
            .await
            .is_ok());
    }
}

use chrono::NaiveTime;
use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PAGE_URL: &str =
    "https://www.ireland.ie/en/india/newdelhi/services/visas/processing-times-and-decisions/#Decisions";
pub const DEFAULT_DOCUMENT_ORIGIN: &str = "https://www.ireland.ie";
pub const DEFAULT_LINK_PREFIX: &str = "Visa decisions made from 1 January 2024 to";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";
pub const DEFAULT_NOTIFY_ENDPOINT: &str = "https://panel.rapiwha.com/send_message.php";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the checker and its liveness server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub watch: WatchConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "0.0.0.0");
        let port = var_or("APP_PORT", "5000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            watch: WatchConfig::from_env()?,
            schedule: ScheduleConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// What to scrape, where to stage it and which application to look for.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub application_number: u64,
    pub page_url: String,
    pub document_origin: String,
    pub link_prefix: String,
    pub lookback_days: u32,
    pub user_agent: String,
    pub download_path: PathBuf,
    pub http_timeout: Duration,
}

impl WatchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let application_number = parse_var(
            "VISA_APPLICATION_NUMBER",
            &required("VISA_APPLICATION_NUMBER")?,
        )?;
        let lookback_days: u32 =
            parse_var("VISA_LOOKBACK_DAYS", &var_or("VISA_LOOKBACK_DAYS", "3"))?;
        if lookback_days == 0 {
            return Err(ConfigError::Invalid {
                var: "VISA_LOOKBACK_DAYS",
                value: "0".to_string(),
            });
        }
        let timeout_secs: u64 =
            parse_var("VISA_HTTP_TIMEOUT_SECS", &var_or("VISA_HTTP_TIMEOUT_SECS", "30"))?;

        Ok(Self {
            application_number,
            page_url: var_or("VISA_PAGE_URL", DEFAULT_PAGE_URL),
            document_origin: var_or("VISA_DOCUMENT_ORIGIN", DEFAULT_DOCUMENT_ORIGIN),
            link_prefix: var_or("VISA_LINK_PREFIX", DEFAULT_LINK_PREFIX),
            lookback_days,
            user_agent: var_or("VISA_USER_AGENT", DEFAULT_USER_AGENT),
            download_path: PathBuf::from(var_or("VISA_DOWNLOAD_PATH", "Visa_Decision.ods")),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Credentials and recipient for the messaging API. Loaded separately from
/// [`AppConfig`] so commands that never send a message do not need them.
#[derive(Clone)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub api_key: String,
    pub recipient: String,
}

impl NotifierConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            endpoint: var_or("NOTIFY_ENDPOINT", DEFAULT_NOTIFY_ENDPOINT),
            api_key: required("NOTIFY_API_KEY")?,
            recipient: required("NOTIFY_RECIPIENT")?,
        })
    }
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Daily trigger time in a named timezone.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub time: NaiveTime,
    pub timezone: Tz,
}

impl ScheduleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_time = var_or("SCHEDULE_TIME", "12:00");
        let time = NaiveTime::parse_from_str(raw_time.trim(), "%H:%M").map_err(|_| {
            ConfigError::Invalid {
                var: "SCHEDULE_TIME",
                value: raw_time.clone(),
            }
        })?;

        let raw_zone = var_or("SCHEDULE_TIMEZONE", "Asia/Kolkata");
        let timezone = raw_zone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid {
                var: "SCHEDULE_TIMEZONE",
                value: raw_zone.clone(),
            })?;

        Ok(Self { time, timezone })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(var) => write!(f, "{var} must be set"),
            ConfigError::Invalid { var, value } => write!(f, "{var} has invalid value '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::Missing(_) | ConfigError::Invalid { .. } => {
                None
            }
        }
    }
}

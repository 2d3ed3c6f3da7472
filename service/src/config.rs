use chrono::NaiveDate;
use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::time::Duration;

/// Default vendor REST API base URL used when `ZOOM_API_BASE_URL` is not set.
pub const DEFAULT_ZOOM_API_BASE_URL: &str = "https://api.zoom.us/v2";

/// Registrable domain that every transcript download reference must belong to.
pub const DEFAULT_ZOOM_TRUSTED_DOMAIN: &str = "zoom.us";

/// Meeting report tracking field that carries the LMS course identifier.
pub const DEFAULT_COURSE_TRACKING_FIELD: &str = "Canvas Course";

/// Earliest date searched for instructor recordings.
pub const DEFAULT_RECORDING_HISTORY_START: &str = "2020-01-01";

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The shared secret callers must present in the `X-Access-Key` header.
    #[arg(long, env)]
    access_key: String,

    /// The base URL of the Zoom REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ZOOM_API_BASE_URL)]
    zoom_api_base_url: String,

    /// The bearer credential attached to every Zoom API call.
    #[arg(long, env)]
    zoom_bearer_token: String,

    /// Transcript download references must point at this domain or one of its subdomains.
    #[arg(long, env, default_value = DEFAULT_ZOOM_TRUSTED_DOMAIN)]
    zoom_trusted_domain: String,

    /// Timeout in seconds for a single attempt of an outbound Zoom call
    #[arg(long, env, default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Number of retries after the first attempt for rate-limited or failed Zoom calls
    #[arg(long, env, default_value_t = 3)]
    pub upstream_max_retries: u32,

    /// Delay in milliseconds before the first retry; doubles on every further retry
    #[arg(long, env, default_value_t = 1000)]
    pub upstream_base_delay_ms: u64,

    /// Upper bound in seconds for a single backoff wait, Retry-After hints included
    #[arg(long, env, default_value_t = 60)]
    pub upstream_max_delay_secs: u64,

    /// Name of the meeting report tracking field matched against `course_id`.
    #[arg(long, env, default_value = DEFAULT_COURSE_TRACKING_FIELD)]
    course_tracking_field: String,

    /// Length in days of one recording listing window (the vendor caps a listing's date range)
    #[arg(long, env, default_value_t = 30)]
    pub recording_window_days: u32,

    /// Earliest date (YYYY-MM-DD) searched for instructor recordings; windows walk back from today to it
    #[arg(long, env, default_value = DEFAULT_RECORDING_HISTORY_START)]
    pub recording_history_start: NaiveDate,

    /// Optional cap on the number of windows searched, newest first
    #[arg(long, env)]
    pub recording_window_count: Option<u32>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn access_key(&self) -> SecretString {
        SecretString::new(self.access_key.clone())
    }

    /// Returns the Zoom API base URL without a trailing slash.
    pub fn zoom_api_base_url(&self) -> &str {
        self.zoom_api_base_url.trim_end_matches('/')
    }

    pub fn zoom_bearer_token(&self) -> SecretString {
        SecretString::new(self.zoom_bearer_token.clone())
    }

    /// Returns the trusted vendor domain, lower-cased.
    pub fn zoom_trusted_domain(&self) -> String {
        self.zoom_trusted_domain.trim().to_ascii_lowercase()
    }

    pub fn course_tracking_field(&self) -> &str {
        &self.course_tracking_field
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn upstream_base_delay(&self) -> Duration {
        Duration::from_millis(self.upstream_base_delay_ms)
    }

    pub fn upstream_max_delay(&self) -> Duration {
        Duration::from_secs(self.upstream_max_delay_secs)
    }
}

// Hand-written so the access key and bearer token never reach a log line.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("allowed_origins", &self.allowed_origins)
            .field("access_key", &"[REDACTED]")
            .field("zoom_api_base_url", &self.zoom_api_base_url)
            .field("zoom_bearer_token", &"[REDACTED]")
            .field("zoom_trusted_domain", &self.zoom_trusted_domain)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("upstream_max_retries", &self.upstream_max_retries)
            .field("upstream_base_delay_ms", &self.upstream_base_delay_ms)
            .field("upstream_max_delay_secs", &self.upstream_max_delay_secs)
            .field("course_tracking_field", &self.course_tracking_field)
            .field("recording_window_days", &self.recording_window_days)
            .field("recording_history_start", &self.recording_history_start)
            .field("recording_window_count", &self.recording_window_count)
            .field("interface", &self.interface)
            .field("port", &self.port)
            .field("log_level_filter", &self.log_level_filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "zoom_gateway_rs",
            "--access-key",
            "caller-secret",
            "--zoom-bearer-token",
            "vendor-secret",
        ];
        args.extend_from_slice(extra);
        Config::parse_from(args)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.zoom_api_base_url(), DEFAULT_ZOOM_API_BASE_URL);
        assert_eq!(config.zoom_trusted_domain(), "zoom.us");
        assert_eq!(config.course_tracking_field(), "Canvas Course");
        assert_eq!(config.upstream_max_retries, 3);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(config.upstream_base_delay(), Duration::from_secs(1));
        assert_eq!(
            config.recording_history_start,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        assert_eq!(config.recording_window_count, None);
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn test_trusted_domain_is_normalised() {
        let config = parse(&["--zoom-trusted-domain", " Zoom.US "]);
        assert_eq!(config.zoom_trusted_domain(), "zoom.us");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = parse(&["--zoom-api-base-url", "http://127.0.0.1:9999/v2/"]);
        assert_eq!(config.zoom_api_base_url(), "http://127.0.0.1:9999/v2");
    }

    #[test]
    fn test_secrets_are_available_but_not_debug_printed() {
        let config = parse(&[]);
        assert_eq!(config.access_key().expose_secret(), "caller-secret");
        assert_eq!(config.zoom_bearer_token().expose_secret(), "vendor-secret");

        let printed = format!("{:?}", config);
        assert!(!printed.contains("caller-secret"));
        assert!(!printed.contains("vendor-secret"));
    }

    #[test]
    fn test_missing_access_key_is_an_error() {
        let result = Config::try_parse_from(["zoom_gateway_rs", "--zoom-bearer-token", "t"]);
        // Only holds when ACCESS_KEY is not exported in the test environment.
        if std::env::var("ACCESS_KEY").is_err() {
            assert!(result.is_err());
        }
    }
}

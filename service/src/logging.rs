use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// HTTP client crates whose own debug output echoes full request URLs, signed download
/// queries included. They stay silenced at every level; `meeting_auth` logs each
/// outbound call with the query stripped instead.
const URL_ECHOING_MODULES: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls"];

/// Server-side framework modules that only add noise below Trace.
const FRAMEWORK_MODULES: &[&str] = &["tower", "tower_http", "axum"];

pub struct Logger {}

impl Logger {
    /// Initializes the global terminal logger at the configured level.
    ///
    /// Framework modules are shown only at Trace; URL-echoing client modules never are.
    pub fn init_logger(config: &Config) {
        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let log_config = Self::build_log_config(config.log_level_filter);

        if let Err(e) = simplelog::TermLogger::init(
            log_level_filter,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Failed to start simplelog: {e}");
        }
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    /// Modules ignored at `level`.
    fn ignored_modules(level: LevelFilter) -> Vec<&'static str> {
        let mut modules = URL_ECHOING_MODULES.to_vec();
        if level != LevelFilter::Trace {
            modules.extend_from_slice(FRAMEWORK_MODULES);
        }
        modules
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in Self::ignored_modules(level) {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }
}

//! Logging configuration for the Sentinel pipeline.
//!
//! Library code only emits `tracing` events; installing a subscriber is left to
//! the application, optionally through [`setup::init_logging`].

/// Controls how much the pipeline logs.
///
/// Compiled SQL and per-row classification details can be large, so both are
/// gated separately from the subscriber's level filter.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to log the compiled SQL statement
    pub log_sql: bool,
    /// Whether to log every classified row
    pub log_rows: bool,
    /// Whether to log engine job statistics
    pub log_job_stats: bool,
    /// Maximum length for logged field values
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_sql: false,
            log_rows: false,
            log_job_stats: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Logs everything, with long SQL excerpts.
    pub fn verbose() -> Self {
        Self {
            log_sql: true,
            log_rows: true,
            log_job_stats: true,
            max_field_length: 4096,
        }
    }

    /// Minimal logging for production.
    pub fn production() -> Self {
        Self {
            log_sql: false,
            log_rows: false,
            log_job_stats: false,
            max_field_length: 128,
        }
    }
}

/// Debug-logs one classified row when row logging is enabled.
#[macro_export]
macro_rules! log_row {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rows {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs engine job statistics when enabled.
#[macro_export]
macro_rules! log_job_stats {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_job_stats {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, on a character boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for applications embedding the library.
pub mod setup {
    use tracing::Level;

    /// Configuration for [`init_logging`].
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything else
        pub level: Level,
        /// Log level for `sentinel_guard`
        pub sentinel_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                sentinel_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output, warnings and up outside the library.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                sentinel_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Human-readable output, debug everywhere.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                sentinel_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for the library.
        pub fn with_sentinel_level(mut self, level: Level) -> Self {
            self.sentinel_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},sentinel_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.sentinel_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global subscriber. `RUST_LOG` takes precedence over the
    /// configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use sentinel_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

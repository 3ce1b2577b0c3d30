//! Tracing setup and the SUCCESS severity.
//!
//! `tracing` has a fixed set of levels, so SUCCESS is carried as a dedicated
//! target ([`SUCCESS_TARGET`]) on `INFO` events. [`Severity`] places it
//! strictly between `Info` and `Warn`, and the filter installed by [`init`]
//! uses that ordering: a minimum level of `success` hides routine info
//! messages but keeps "loaded correctly" events, warnings and errors.
//!
//! # Example
//! ```no_run
//! use daq_loader::logging::{self, OutputFormat, Severity, TracingConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TracingConfig::new(Severity::Success).with_format(OutputFormat::Compact);
//! logging::init(config)?;
//! daq_loader::success!("Successfully loaded {}", "motors");
//! # Ok(())
//! # }
//! ```

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use std::fmt;
use std::str::FromStr;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    filter::{self, FilterFn},
    fmt::{self as tfmt, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Target carried by every SUCCESS event.
pub const SUCCESS_TARGET: &str = "daq_loader::success";

/// Emit a SUCCESS event.
///
/// Accepts the same message arguments as `tracing::info!`.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        $crate::__tracing::event!(
            target: $crate::logging::SUCCESS_TARGET,
            $crate::__tracing::Level::INFO,
            $($arg)+
        )
    };
}

/// Severity of a log event, including the SUCCESS level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Very verbose diagnostics
    Trace,
    /// Debug diagnostics, including stack traces of absorbed failures
    Debug,
    /// Routine progress ("Loading x...")
    Info,
    /// A named load step completed
    Success,
    /// Something was skipped or overridden
    Warn,
    /// A load step failed
    Error,
}

impl Severity {
    /// Classify an event or span by its metadata.
    pub fn of(metadata: &Metadata<'_>) -> Self {
        match *metadata.level() {
            Level::INFO if metadata.target() == SUCCESS_TARGET => Severity::Success,
            level => Severity::from(level),
        }
    }

    /// The name used in configuration files and output.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// The `tracing` level events of this severity are emitted at.
    pub fn level(self) -> Level {
        match self {
            Severity::Trace => Level::TRACE,
            Severity::Debug => Level::DEBUG,
            Severity::Info | Severity::Success => Level::INFO,
            Severity::Warn => Level::WARN,
            Severity::Error => Level::ERROR,
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Severity::Trace,
            Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Severity {
    type Err = LoadError;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "success" => Ok(Severity::Success),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(LoadError::Validation(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, success, warn, error",
                level
            ))),
        }
    }
}

/// Output format for tracing
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact format without colors (for production)
    Compact,
    /// JSON format for structured logging (for log aggregation)
    Json,
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Minimum severity to record
    pub severity: Severity,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include span events (NEW, CLOSE)
    pub with_span_events: bool,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to include thread names
    pub with_thread_names: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            severity: Severity::Info,
            format: OutputFormat::Pretty,
            with_span_events: false,
            with_file_and_line: false,
            with_thread_names: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the loader configuration
    pub fn from_loader_config(config: &LoaderConfig) -> LoadResult<Self> {
        Ok(Self::new(config.log_level.parse()?))
    }

    /// Create tracing config with a minimum severity
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            ..Default::default()
        }
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable span events
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the loader configuration.
pub fn init_from_config(config: &LoaderConfig) -> LoadResult<()> {
    init(TracingConfig::from_loader_config(config)?)
}

/// Install the global subscriber.
///
/// Returns `Ok(())` if a global subscriber is already set. When `RUST_LOG`
/// is set it replaces the severity filter.
pub fn init(config: TracingConfig) -> LoadResult<()> {
    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let filter = severity_filter(config.severity);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => tfmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(config.with_ansi)
            .boxed(),
        OutputFormat::Compact => tfmt::layer()
            .compact()
            .with_span_events(span_events)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .with_ansi(false)
            .boxed(),
        OutputFormat::Json => tfmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_thread_names(config.with_thread_names)
            .boxed(),
    };

    let result = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => tracing_subscriber::registry()
            .with(layer.with_filter(env_filter))
            .try_init(),
        Err(_) => tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init(),
    };

    result.or_else(|e| {
        let msg = e.to_string();
        if msg.contains("already been set") || msg.contains("already initialized") {
            Ok(())
        } else {
            Err(LoadError::Validation(format!(
                "Failed to initialize tracing: {}",
                e
            )))
        }
    })
}

/// Filter passing everything at or above `min`, with SUCCESS ranked above INFO.
pub fn severity_filter(
    min: Severity,
) -> FilterFn<impl Fn(&Metadata<'_>) -> bool + Send + Sync + 'static> {
    filter::filter_fn(move |meta| {
        // Spans stay enabled down to INFO so events inside them keep their context
        if meta.is_span() {
            Severity::of(meta) >= min.min(Severity::Info)
        } else {
            Severity::of(meta) >= min
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::Context;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Records the severity of every event it sees.
    #[derive(Clone, Default)]
    struct SeverityLog(Arc<Mutex<Vec<Severity>>>);

    impl<S: Subscriber> Layer<S> for SeverityLog {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(Severity::of(event.metadata()));
        }
    }

    #[test]
    fn success_filter_hides_routine_info() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let layer = tfmt::layer()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_filter(severity_filter(Severity::Success));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            crate::safe_load::safe_load("motors", None, || Ok(()));
            tracing::info!("routine info");
            tracing::warn!("beam dropped");
        });

        let output = buf.contents();
        assert!(output.contains("Successfully loaded motors"), "{}", output);
        assert!(output.contains("beam dropped"), "{}", output);
        assert!(!output.contains("Loading motors..."), "{}", output);
        assert!(!output.contains("routine info"), "{}", output);
    }

    #[test]
    fn success_target_is_classified_as_success() {
        let seen = SeverityLog::default();
        let subscriber = tracing_subscriber::registry().with(seen.clone());

        tracing::subscriber::with_default(subscriber, || {
            crate::success!("Successfully loaded {}", "slits");
            tracing::info!("Loading slits...");
            tracing::warn!("slits are closed");
            tracing::error!("Failed to load slits");
        });

        assert_eq!(
            *seen.0.lock().unwrap(),
            vec![
                Severity::Success,
                Severity::Info,
                Severity::Warn,
                Severity::Error,
            ]
        );
    }

    #[test]
    fn success_sits_between_info_and_warn() {
        assert!(Severity::Info < Severity::Success);
        assert!(Severity::Success < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert_eq!(Severity::Success.level(), Level::INFO);
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("trace".parse::<Severity>().unwrap(), Severity::Trace);
        assert_eq!("SUCCESS".parse::<Severity>().unwrap(), Severity::Success);
        assert_eq!("Debug".parse::<Severity>().unwrap(), Severity::Debug);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn displays_upper_case() {
        assert_eq!(Severity::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn tracing_config_builder() {
        let config = TracingConfig::new(Severity::Warn)
            .with_format(OutputFormat::Json)
            .with_span_events(true)
            .with_ansi(false);

        assert_eq!(config.severity, Severity::Warn);
        assert!(matches!(config.format, OutputFormat::Json));
        assert!(config.with_span_events);
        assert!(!config.with_ansi);
    }

    #[test]
    fn tracing_config_from_loader_config() {
        let loader = LoaderConfig {
            log_level: "success".to_string(),
            ..LoaderConfig::default()
        };
        let config = TracingConfig::from_loader_config(&loader).unwrap();
        assert_eq!(config.severity, Severity::Success);
    }
}

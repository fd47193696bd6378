//! Process-wide logging built on `tracing`.
//!
//! Output follows the npm style `qxjs <level> <prefix> <message>`. Levels are
//! the npm ones; `success` and `notice` have no native tracing level, so they are
//! INFO events on dedicated targets that the level filter treats as a separate
//! severity between info and warn.
//!
//! The subscriber starts paused at `warn` so that only problems surface before a
//! command has resolved its options; [`set_level`] and [`resume`] then apply the
//! configured verbosity. Everything here is a no-op until [`init`] has run, which
//! keeps library callers and tests free of global setup.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use console::style;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, reload};

pub const HEADING: &str = "qxjs";
pub const SUCCESS_TARGET: &str = "qx::success";
pub const NOTICE_TARGET: &str = "qx::notice";

/// Environment variable that overrides the configured level with raw
/// `EnvFilter` directives. `RUST_LOG` is honored as a fallback.
pub const LOG_ENV: &str = "QX_LOG";

/// Log at the `success` severity.
#[macro_export]
macro_rules! success {
    ($($arg:tt)+) => {
        ::tracing::info!(target: $crate::logging::SUCCESS_TARGET, $($arg)+)
    };
}

/// Log at the `notice` severity.
#[macro_export]
macro_rules! notice {
    ($($arg:tt)+) => {
        ::tracing::info!(target: $crate::logging::NOTICE_TARGET, $($arg)+)
    };
}

/// Verbosity levels, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silly,
    Verbose,
    #[default]
    Info,
    Success,
    Notice,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Silly,
        LogLevel::Verbose,
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Notice,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Silent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Silly => "silly",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Notice => "notice",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    /// `EnvFilter` directives that let through this level and everything above.
    pub fn directives(self) -> String {
        match self {
            LogLevel::Silly => "trace".to_string(),
            LogLevel::Verbose => "debug".to_string(),
            LogLevel::Info => "info".to_string(),
            LogLevel::Success => format!("warn,{SUCCESS_TARGET}=info,{NOTICE_TARGET}=info"),
            LogLevel::Notice => format!("warn,{NOTICE_TARGET}=info"),
            LogLevel::Warn => "warn".to_string(),
            LogLevel::Error => "error".to_string(),
            LogLevel::Silent => "off".to_string(),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == lowered)
            .ok_or_else(|| {
                let names: Vec<&str> = LogLevel::ALL.iter().map(|l| l.as_str()).collect();
                format!("unknown log level '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

struct LogState {
    handle: reload::Handle<EnvFilter, Registry>,
    level: Mutex<LogLevel>,
    env_override: bool,
}

static STATE: OnceLock<LogState> = OnceLock::new();

/// Install the global subscriber. Safe to call once per process; later calls
/// fail without touching the installed one.
pub fn init() -> anyhow::Result<()> {
    let (filter, env_override) = match EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
    {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(LogLevel::Warn.directives()), false),
    };
    let (filter_layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(NpmFormat)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    let _ = STATE.set(LogState {
        handle,
        level: Mutex::new(LogLevel::Warn),
        env_override,
    });
    Ok(())
}

/// Apply a verbosity level. Ignored when the environment pinned the filter.
pub fn set_level(level: LogLevel) {
    let Some(state) = STATE.get() else {
        return;
    };
    if let Ok(mut current) = state.level.lock() {
        *current = level;
    }
    if !state.env_override {
        reload_filter(state, level.directives());
    }
}

pub fn set_color(enabled: bool) {
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

/// Silence all output until [`resume`] (or the returned guard drops).
pub fn pause() -> PauseGuard {
    if let Some(state) = STATE.get()
        && !state.env_override
    {
        reload_filter(state, "off".to_string());
    }
    PauseGuard { _private: () }
}

/// Restore the configured level after [`pause`]. No-op when not paused.
pub fn resume() {
    let Some(state) = STATE.get() else {
        return;
    };
    if state.env_override {
        return;
    }
    let level = state.level.lock().map(|level| *level).unwrap_or_default();
    reload_filter(state, level.directives());
}

fn reload_filter(state: &LogState, directives: String) {
    if let Err(err) = state.handle.reload(EnvFilter::new(directives)) {
        eprintln!("{HEADING} WARN failed to update log filter: {err}");
    }
}

/// Resumes logging when dropped.
#[must_use = "logging resumes as soon as the guard is dropped"]
pub struct PauseGuard {
    _private: (),
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        resume();
    }
}

/// Renders events as `qxjs <level> <prefix> <message> <fields>`.
struct NpmFormat;

impl<S, N> FormatEvent<S, N> for NpmFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let metadata = event.metadata();
        write!(
            writer,
            "{} {}",
            HEADING,
            level_label(metadata.target(), *metadata.level())
        )?;
        if let Some(prefix) = &fields.prefix {
            write!(writer, " {}", style(prefix).magenta())?;
        }
        write!(writer, " {}", fields.message)?;
        for (name, value) in &fields.extra {
            write!(writer, " {}={}", style(name).dim(), value)?;
        }
        writeln!(writer)
    }
}

fn level_label(target: &str, level: Level) -> String {
    if target == SUCCESS_TARGET {
        return style("success").green().bold().to_string();
    }
    if target == NOTICE_TARGET {
        return style("notice").blue().to_string();
    }
    match level {
        Level::ERROR => style("ERR!").red().to_string(),
        Level::WARN => style("WARN").black().on_yellow().to_string(),
        Level::INFO => style("info").green().to_string(),
        Level::DEBUG => style("verb").blue().on_black().to_string(),
        Level::TRACE => style("sill").reverse().to_string(),
    }
}

#[derive(Default)]
struct EventFields {
    message: String,
    prefix: Option<String>,
    extra: Vec<(&'static str, String)>,
}

impl EventFields {
    fn record_value(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "prefix" => self.prefix = Some(value),
            name => self.extra.push((name, value)),
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{value:?}"));
    }
}

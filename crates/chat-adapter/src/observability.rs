use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENABLED_ENV: &str = "CHAT_ADAPTER_OBSERVABILITY";
const LEVEL_ENV: &str = "CHAT_ADAPTER_LOG_LEVEL";
const JSON_PATH_ENV: &str = "CHAT_ADAPTER_JSON_LOG_PATH";
const DEFAULT_JSON_FILE: &str = "chat-adapter.logs.jsonl";

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    /// Level or filter directive; `RUST_LOG` applies when unset.
    pub level: Option<String>,
    /// JSONL output file. Console output on stderr when unset.
    pub json_path: Option<PathBuf>,
}

impl LogSettings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            enabled: lookup(ENABLED_ENV)
                .map(|v| parse_bool_env(&v).unwrap_or(true))
                .unwrap_or(true),
            level: non_blank(LEVEL_ENV),
            json_path: non_blank(JSON_PATH_ENV).map(PathBuf::from),
        }
    }

    fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
        {
            return filter;
        }
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Splits a log file path into the directory and file name the appender needs.
fn json_log_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_JSON_FILE)
        .to_string();
    (dir, file_name)
}

/// Initialize logging once per process from [`LogSettings::from_env`].
///
/// Environment variables:
/// - `CHAT_ADAPTER_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `CHAT_ADAPTER_LOG_LEVEL`: optional level/filter override (`info`, `chat_adapter=debug`, ...).
/// - `CHAT_ADAPTER_JSON_LOG_PATH`: optional JSONL log file. Console output on
///   stderr otherwise, so stdout stays free for model output.
/// - `RUST_LOG`: filter used when no level override is set.
pub fn init_observability() {
    init_with(LogSettings::from_env());
}

/// Initialize logging once per process with explicit settings.
pub fn init_with(settings: LogSettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }

        let env_filter = settings.env_filter();
        match &settings.json_path {
            Some(path) => {
                let (dir, file_name) = json_log_target(path);
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
            None => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
        }
    });
}

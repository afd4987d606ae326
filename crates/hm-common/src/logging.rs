//! Process-wide tracing setup for the matching service.
//!
//! Every record emitted through the panic hook carries the process run id so
//! crashes can be tied back to the ranking requests logged before them.

use std::panic;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::run_id;

const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Logging knobs read from the environment.
///
/// - `RUST_LOG`: filter directives (default `info`)
/// - `HM_LOG_DIR`: write daily-rotated `<app>.log` files there instead of stdout
/// - `HM_LOG_INCLUDE_BACKTRACE`: also run the default panic hook (`1`/`true`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub dir: Option<PathBuf>,
    pub include_backtrace: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            dir: None,
            include_backtrace: false,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            filter: set("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            dir: set("HM_LOG_DIR").map(PathBuf::from),
            include_backtrace: set("HM_LOG_INCLUDE_BACKTRACE")
                .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true")),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".into())
}

/// Reports panics (including ones inside rayon scoring workers) as `error`
/// events tagged with the run id. Installed at most once per process.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let include_backtrace = LogSettings::from_env().include_backtrace;
        let default_hook = panic::take_hook();

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));

            tracing::error!(
                application = app_name,
                run_id = run_id::get(),
                thread = thread.name().unwrap_or("unnamed"),
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %panic_message(info.payload()),
                "panic"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

// Errors when the directory cannot be created; the caller then logs to stdout.
fn file_writer(app_name: &str, dir: &Path) -> Result<BoxMakeWriter, std::io::Error> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber from [`LogSettings::from_env`].
/// A second call is a no-op.
pub fn init_tracing_subscriber(app_name: &'static str) {
    let settings = LogSettings::from_env();
    let builder = tracing_subscriber::fmt().with_env_filter(settings.env_filter());

    let fallback = match settings.dir.as_deref().map(|dir| file_writer(app_name, dir)) {
        Some(Ok(writer)) => {
            let _ = builder.with_writer(writer).try_init();
            None
        }
        Some(Err(err)) => {
            let _ = builder.try_init();
            Some(err)
        }
        None => {
            let _ = builder.try_init();
            None
        }
    };

    if let Some(err) = fallback {
        tracing::warn!(error = %err, "HM_LOG_DIR unusable; logging to stdout");
    }

    tracing::info!(
        application = app_name,
        run_id = run_id::get(),
        filter = %settings.filter,
        log_dir = ?settings.dir,
        "logging initialized"
    );
}

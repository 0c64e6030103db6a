use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Where log events go besides the optional diagnostics file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    /// The terminal UI owns stdout and stderr.
    Silent,
}

/// Keeps the non-blocking writer alive; dropping it flushes the diagnostics log.
pub struct DiagnosticsSession {
    path: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

impl DiagnosticsSession {
    pub fn initialize(enabled: bool, sink: LogSink, level: &str) -> Result<Self> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let (file_layer, guard, path) = if enabled {
            let path = create_diagnostics_log_path()?;
            let file = OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
                .with_context(|| {
                    format!("failed to create diagnostics log at {}", path.display())
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard), Some(path))
        } else {
            (None, None, None)
        };

        let stderr_layer = (sink == LogSink::Stderr).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(stderr_layer)
            .try_init()
            .context("failed to install log subscriber")?;

        install_panic_hook(path.clone());

        if path.is_some() {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                pid = std::process::id(),
                argv = ?std::env::args().collect::<Vec<String>>(),
                "nurseryflow diagnostics start"
            );
        }

        Ok(Self {
            path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

fn install_panic_hook(path: Option<PathBuf>) {
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_payload(panic_info);
        let location = panic_info
            .location()
            .map(|value| format!("{}:{}:{}", value.file(), value.line(), value.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let backtrace = Backtrace::force_capture();

        error!(
            panic_message = %payload,
            panic_location = %location,
            "panic captured"
        );
        error!("panic_backtrace={backtrace:?}");

        eprintln!("Fatal internal error in nurseryflow.");
        match &path {
            Some(path) => eprintln!("Diagnostics written to {}", path.display()),
            None => eprintln!("Run `nurseryflow --diagnostics` to capture a diagnostics log."),
        }
    }));
}

fn panic_payload(panic_info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(payload) = panic_info.payload().downcast_ref::<&str>() {
        return (*payload).to_string();
    }
    if let Some(payload) = panic_info.payload().downcast_ref::<String>() {
        return payload.clone();
    }
    "unknown panic payload".to_string()
}

fn create_diagnostics_log_path() -> Result<PathBuf> {
    let config_path = nurseryflow_core::config::resolve_config_path()
        .context("failed to resolve nurseryflow config path for diagnostics")?;
    let config_dir = config_path.parent().ok_or_else(|| {
        anyhow!(
            "failed to resolve diagnostics directory from config path {}",
            config_path.display()
        )
    })?;

    let diagnostics_dir = config_dir.join("diagnostics");
    fs::create_dir_all(&diagnostics_dir).with_context(|| {
        format!(
            "failed to create diagnostics directory {}",
            diagnostics_dir.display()
        )
    })?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(diagnostics_dir.join(format!("{now}.log")))
}

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, Level};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::classify::{ClassifiedLine, Role};
use crate::error::Result;

// Log targets
pub const OUTLINE_PARSE: &str = "outline_parse";
pub const OUTLINE_LAYOUT: &str = "outline_layout";
pub const OUTLINE_CLASSIFY: &str = "outline_classify";
pub const OUTLINE_BATCH: &str = "outline_batch";

const LOG_FILE_NAME: &str = "pdf-outline.log";

fn stderr_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Log to stderr only. `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(stderr_filter(verbose));

    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
}

/// Log to stderr and to a non-rotating file in `log_dir`, which captures
/// every pipeline target at debug level. Keep the returned guard alive for
/// as long as file output is wanted.
pub fn init_logging_with_dir(verbose: bool, log_dir: PathBuf) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = [OUTLINE_PARSE, OUTLINE_LAYOUT, OUTLINE_CLASSIFY, OUTLINE_BATCH]
        .iter()
        .map(|t| format!("{}=debug", t))
        .collect::<Vec<_>>()
        .join(",");

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking_appender)
        .with_filter(EnvFilter::new(format!("info,{}", file_filter)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(stderr_filter(verbose));

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    Ok(guard)
}

/// Count lines per role, keyed by role label.
pub fn role_histogram<'a, I>(roles: I) -> BTreeMap<&'static str, usize>
where
    I: IntoIterator<Item = &'a Role>,
{
    let mut counts = BTreeMap::new();
    for role in roles {
        *counts.entry(role.label()).or_insert(0) += 1;
    }
    counts
}

/// Emit the predicted and final role distributions as a structured event.
pub fn log_role_distribution(lines: &[ClassifiedLine]) {
    if !tracing::enabled!(target: OUTLINE_CLASSIFY, Level::DEBUG) {
        return;
    }
    let predicted = role_histogram(lines.iter().map(|l| &l.predicted));
    let assigned = role_histogram(lines.iter().map(|l| &l.role));
    let overridden = lines.iter().filter(|l| l.predicted != l.role).count();

    debug!(
        target: OUTLINE_CLASSIFY,
        lines = lines.len(),
        overridden,
        predicted = ?predicted,
        assigned = ?assigned,
        "Role distribution"
    );
}

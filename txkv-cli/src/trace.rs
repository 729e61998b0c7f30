//! Logging setup, grounded in `kv-cli/src/trace.rs`'s `init_logging`: a
//! `fern::Dispatch` feeding a daily-rotating `tracing_appender` file
//! writer, plus a separate stderr dispatch for warnings. Kept synchronous
//! here -- no `tracing_appender::non_blocking` worker thread, since
//! `txkv-cli` has no async runtime to hand log flushing off to -- and
//! without `chrono`: timestamps are seconds since the Unix epoch rather
//! than a calendar date.

use std::path::Path;

use anyhow::Context;

fn unix_seconds() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

pub fn init_logging(log_dir: &Path, level: log::LevelFilter) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "txkv-cli.log");

    let file_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}][{}][{}] {}", unix_seconds(), record.level(), record.target(), message))
        })
        .level(level)
        .chain(Box::new(file_appender) as Box<dyn std::io::Write + Send>);

    let stderr_dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log::LevelFilter::Warn)
        .filter(|metadata| metadata.target() == "server_warnings")
        .chain(std::io::stderr());

    fern::Dispatch::new().chain(file_dispatch).chain(stderr_dispatch).apply().context("installing global logger")?;

    Ok(())
}

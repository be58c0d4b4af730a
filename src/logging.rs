use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE_NAME: &str = "codereel.log";

/// Route `tracing` output to `dir/codereel.log`. Nothing goes to stdout or stderr.
///
/// Keep the returned guard alive for the life of the program; dropping it flushes
/// and stops the background writer.
pub fn init_file_logging(dir: &Path, level: LevelFilter) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // A subscriber may already be installed (tests, embedding); keep theirs.
    let _ = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(level)
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_log_dir_and_file() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("state").join("codereel");

        let guard = init_file_logging(&logs, LevelFilter::DEBUG).unwrap();
        tracing::info!("hello from the test");
        drop(guard);

        assert!(logs.join(LOG_FILE_NAME).exists());
    }
}

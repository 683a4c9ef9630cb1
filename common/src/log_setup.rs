use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

/// Starts file + stderr logging. Stdout stays free for program output.
/// The returned handle must outlive all logging, dropping it flushes and
/// closes the log file.
pub fn setup_logging(base_level: &str) -> LoggerHandle {
    Logger::try_with_env_or_str(base_level)
        .unwrap_or_else(|e| panic!("Invalid log filter {base_level:?}: {e}"))
        .log_to_file(
            FileSpec::default()
                .directory("logs")
                .basename("rect_partition"),
        )
        .duplicate_to_stderr(Duplicate::All)
        .rotate(
            Criterion::Size(1024 * 1024), //1MB
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()
        .unwrap_or_else(|e| panic!("Logger initialization failed with {e}"))
}

//! Check-section verdicts from package test logs

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use crate::error::{Result, SchedulerError};

/// Marker written on the line that ends the check section
pub const CHECK_DONE_MARKER: &str = "CHECK DONE";

/// Text on the marker line when every check passed
pub const CHECK_PASSED_STATUS: &str = "EXIT STATUS 0";

/// Suffix of test log names
pub const TEST_LOG_SUFFIX: &str = ".test.log";

/// Suffix of build log names
pub const BUILD_LOG_SUFFIX: &str = ".log";

/// Inserted into archived copies of failing test logs
pub const FAILED_TEST_MARKER: &str = "-FAILED_TEST-";

/// What a test log says about the check section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckVerdict {
    /// The marker line reports exit status 0
    Passed,
    /// The marker line reports any other status
    Failed {
        /// The marker line
        line: String,
        /// Timestamped copy of the log, if it could be written
        archived_log: Option<PathBuf>,
    },
    /// The log ends without a marker line
    NoMarker,
}

impl CheckVerdict {
    /// Turn the verdict into a pass/fail result.
    ///
    /// A log without a marker passes unless `require_marker` is set.
    pub fn into_result(self, log_file: &Path, require_marker: bool) -> Result<()> {
        match self {
            Self::Passed => Ok(()),
            Self::Failed { line, .. } => Err(SchedulerError::CheckFailed {
                line,
                log_file: log_file.to_path_buf(),
            }),
            Self::NoMarker if require_marker => Err(SchedulerError::CheckFailed {
                line: format!("no '{}' line in test log", CHECK_DONE_MARKER),
                log_file: log_file.to_path_buf(),
            }),
            Self::NoMarker => {
                warn!(
                    log = %log_file.display(),
                    "test log has no check verdict, treating as passed"
                );
                Ok(())
            }
        }
    }
}

/// Scan a test log for the check-section verdict.
///
/// The first line containing [`CHECK_DONE_MARKER`] decides. Lines are read
/// as raw bytes and decoded lossily, so binary output in the log is not a
/// read error. A failing log is copied next to the original with
/// [`failed_test_log_path`]. A log that cannot be opened or read is an
/// error, not a test failure.
pub async fn parse_check_section(log_file: &Path) -> Result<CheckVerdict> {
    let unreadable = |source: std::io::Error| SchedulerError::LogUnreadable {
        path: log_file.to_path_buf(),
        source,
    };

    let file = File::open(log_file).await.map_err(|e| {
        error!(
            log = %log_file.display(),
            error = %e,
            "Failed to open log file while checking package test results"
        );
        unreadable(e)
    })?;

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await.map_err(&unreadable)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.contains(CHECK_DONE_MARKER) {
            continue;
        }
        let line = line.to_string();
        if line.contains(CHECK_PASSED_STATUS) {
            return Ok(CheckVerdict::Passed);
        }

        let millis = chrono::Utc::now().timestamp_millis();
        let failed_log = failed_test_log_path(log_file, millis);
        let archived_log = match tokio::fs::copy(log_file, &failed_log).await {
            Ok(_) => Some(failed_log),
            Err(e) => {
                error!(
                    from = %log_file.display(),
                    to = %failed_log.display(),
                    error = %e,
                    "Log file copy failed"
                );
                None
            }
        };

        return Ok(CheckVerdict::Failed { line, archived_log });
    }

    Ok(CheckVerdict::NoMarker)
}

/// Path for the archived copy of a failing test log:
/// `<log without .test.log>-FAILED_TEST-<millis>.log`
pub fn failed_test_log_path(log_file: &Path, epoch_millis: i64) -> PathBuf {
    let log = log_file.to_string_lossy();
    let base = log.strip_suffix(TEST_LOG_SUFFIX).unwrap_or(&*log);
    PathBuf::from(format!(
        "{}{}{}{}",
        base, FAILED_TEST_MARKER, epoch_millis, BUILD_LOG_SUFFIX
    ))
}

/// Log name for building an archive
pub fn build_log_name(archive_file_name: &str) -> String {
    format!("{}{}", archive_file_name, BUILD_LOG_SUFFIX)
}

/// Log name for testing an archive
pub fn test_log_name(archive_file_name: &str) -> String {
    format!("{}{}", archive_file_name, TEST_LOG_SUFFIX)
}

//! Debug events for store operations.
//!
//! Events go through `tracing` on the `freshdb` target and are only emitted
//! for stores opened with `debug_logging` on. Where they end up depends on
//! the installed subscriber; enable the `stderr-log` feature and call
//! [`init_stderr`] for timestamped lines on standard error.

use std::fmt;
use std::path::{Path, PathBuf};

/// Operation tag attached to every event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    FixPath,
    Get,
    Set,
    Delete,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::FixPath => "FIXPATH",
            Op::Get => "GET",
            Op::Set => "SET",
            Op::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-store event emitter.
#[derive(Clone, Debug)]
pub(crate) struct OpLog {
    enabled: bool,
    file: PathBuf,
}

impl OpLog {
    pub(crate) fn new(enabled: bool, file: &Path) -> Self {
        Self {
            enabled,
            file: file.to_path_buf(),
        }
    }

    pub(crate) fn ok(&self, op: Op, detail: &str) {
        if self.enabled {
            tracing::debug!(
                target: "freshdb",
                op = op.as_str(),
                file = %self.file.display(),
                outcome = "OK",
                "{}",
                detail
            );
        }
    }

    pub(crate) fn error(&self, op: Op, detail: &str, error: &dyn fmt::Display) {
        if self.enabled {
            tracing::warn!(
                target: "freshdb",
                op = op.as_str(),
                file = %self.file.display(),
                outcome = "ERROR",
                error = %error,
                "{}",
                detail
            );
        }
    }
}

/// Install a global `tracing` subscriber that prints debug events to
/// standard error.
///
/// Returns false if a global subscriber was already set.
#[cfg(feature = "stderr-log")]
pub fn init_stderr() -> bool {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::DEBUG)
        .with_target(true)
        .try_init()
        .is_ok()
}

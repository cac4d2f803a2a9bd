//! XDG-compliant log directory management
//!
//! Logs are stored in `$XDG_STATE_HOME/cyrepl/logs/` (typically
//! `~/.local/state/cyrepl/logs/`), one file per process so concurrent
//! consoles attached to different targets never interleave.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

/// Minimum age for log files to be cleaned up (24 hours)
const CLEANUP_AGE: Duration = Duration::from_secs(24 * 60 * 60);

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the base log directory, creating it if necessary.
///
/// Falls back to the system temp directory if the XDG location cannot be
/// determined or created.
pub fn log_dir() -> &'static PathBuf {
    LOG_DIR.get_or_init(|| {
        let dir = xdg_log_dir().unwrap_or_else(|| std::env::temp_dir().join("cyrepl-logs"));

        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create log directory {:?}: {}", dir, e);
            return std::env::temp_dir().join("cyrepl-logs");
        }

        dir
    })
}

fn xdg_log_dir() -> Option<PathBuf> {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(state_home);
        if path.is_absolute() {
            return Some(path.join("cyrepl").join("logs"));
        }
    }

    dirs::home_dir().map(|home| {
        home.join(".local")
            .join("state")
            .join("cyrepl")
            .join("logs")
    })
}

/// Path of the log file for this process: `{log_dir}/cyrepl-{PID}.log`
pub fn main_log_path() -> PathBuf {
    log_dir().join(format!("cyrepl-{}.log", std::process::id()))
}

/// Remove log files left behind by consoles that are no longer running.
pub fn cleanup_stale_logs() {
    cleanup_stale_logs_in_dir(log_dir(), std::process::id());
}

fn cleanup_stale_logs_in_dir(dir: &Path, current_pid: u32) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        let Some(pid) = extract_pid_from_filename(&name) else {
            continue;
        };
        if pid == current_pid {
            continue;
        }

        if !is_process_running(pid)
            && is_file_older_than(&entry.path(), CLEANUP_AGE)
            && entry.file_type().map(|t| t.is_file()).unwrap_or(false)
        {
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::debug!("Failed to clean up stale log {:?}: {}", entry.path(), e);
            } else {
                tracing::debug!("Cleaned up stale log file: {:?}", entry.path());
            }
        }
    }
}

fn is_file_older_than(path: &Path, age: Duration) -> bool {
    let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };

    SystemTime::now()
        .duration_since(modified)
        .map(|elapsed| elapsed > age)
        .unwrap_or(false)
}

/// Extract PID from a filename like "cyrepl-12345.log"
fn extract_pid_from_filename(name: &str) -> Option<u32> {
    let without_ext = name.strip_suffix(".log")?;
    let pid_str = without_ext.strip_prefix("cyrepl-")?;
    pid_str.parse().ok()
}

/// Check if a process with the given PID is still running.
///
/// Signal 0 performs the permission and existence checks without
/// delivering anything; EPERM still means the process exists.
pub fn is_process_running(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

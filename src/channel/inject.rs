//! Attaching to a running process.
//!
//! The console listens on a private Unix socket, asks an external injector
//! to load the agent library into the target, and waits for the agent to
//! connect back. The accepted stream becomes the remote transport.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("unable to find process `{0}'")]
    ProcessNotFound(String),

    #[error("no agent library configured (set inject.library in the config file)")]
    NoLibrary,

    #[error("failed to set up socket {path}: {source}")]
    Socket {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("injector `{command}` failed: {reason}")]
    Injector { command: String, reason: String },

    #[error("target never connected back: {0}")]
    Accept(#[source] io::Error),
}

/// Loads a library into another process.
pub trait Injector {
    fn inject(&mut self, pid: u32, library: &Path, args: &[&str]) -> Result<(), InjectError>;
}

/// Runs `<command> <pid> <library> <args...>` and waits for it.
#[derive(Debug, Clone)]
pub struct CommandInjector {
    command: String,
}

impl CommandInjector {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Injector for CommandInjector {
    fn inject(&mut self, pid: u32, library: &Path, args: &[&str]) -> Result<(), InjectError> {
        tracing::info!("Injecting {} into {} via {}", library.display(), pid, self.command);
        let status = Command::new(&self.command)
            .arg(pid.to_string())
            .arg(library)
            .args(args)
            .status()
            .map_err(|e| InjectError::Injector {
                command: self.command.clone(),
                reason: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(InjectError::Injector {
                command: self.command.clone(),
                reason: status.to_string(),
            })
        }
    }
}

/// Rendezvous socket for the console with process id `own_pid`.
pub fn socket_path(dir: &Path, own_pid: u32) -> PathBuf {
    dir.join(format!(".s.cy.{own_pid}"))
}

/// Removes the socket file when the handshake is over.
struct SocketFile(PathBuf);

impl Drop for SocketFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Inject the agent into `pid` and return the stream it connects with.
pub fn attach(
    pid: u32,
    library: &Path,
    socket_dir: &Path,
    injector: &mut dyn Injector,
) -> Result<UnixStream, InjectError> {
    let path = socket_path(socket_dir, std::process::id());
    let socket_error = |source| InjectError::Socket {
        path: path.clone(),
        source,
    };

    match fs::remove_file(&path) {
        Ok(()) => tracing::debug!("Removed stale socket {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(socket_error(e)),
    }

    let listener = UnixListener::bind(&path).map_err(socket_error)?;
    let guard = SocketFile(path.clone());
    // The target may run as another user
    fs::set_permissions(&path, fs::Permissions::from_mode(0o777)).map_err(socket_error)?;

    let socket_arg = path.to_string_lossy();
    injector.inject(pid, library, &[socket_arg.as_ref()])?;

    let (stream, _) = listener.accept().map_err(InjectError::Accept)?;
    tracing::info!("Process {} connected on {}", pid, path.display());
    drop(guard);
    Ok(stream)
}

/// Interpret `-p`: a pid, or the name of a running process.
pub fn resolve_process(spec: &str) -> Result<u32, InjectError> {
    if let Ok(pid) = spec.parse::<u32>() {
        return Ok(pid);
    }
    find_process_by_name(Path::new("/proc"), spec)
        .ok_or_else(|| InjectError::ProcessNotFound(spec.to_string()))
}

/// Scan `<proc_root>/<pid>/comm` for `name`; the lowest matching pid wins.
pub fn find_process_by_name(proc_root: &Path, name: &str) -> Option<u32> {
    let entries = fs::read_dir(proc_root).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let pid = entry.file_name().to_str()?.parse::<u32>().ok()?;
            let comm = fs::read_to_string(entry.path().join("comm")).ok()?;
            (comm.trim_end_matches('\n') == name).then_some(pid)
        })
        .min()
}

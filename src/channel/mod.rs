//! Execution channel: where submitted code runs.
//!
//! The target is chosen once at startup. Local targets evaluate in-process;
//! remote targets speak the framed protocol in [`frame`] over any byte
//! stream. A failed remote exchange is fatal; the channel is never
//! re-established.

pub mod agent;
pub mod completer;
pub mod evaluator;
pub mod frame;
pub mod inject;

use crate::services::signal_handler::{Mode, CONTROLLER};
use evaluator::Evaluator;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// A byte stream to a remote target.
pub trait Transport: Read + Write {}

impl<T: Read + Write> Transport for T {}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection to target closed")]
    Closed,

    #[error("channel i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("frame of {0} bytes is too large")]
    TooLarge(usize),

    #[error("protocol error: {0}")]
    Protocol(&'static str),

    #[error("{0} is not supported on a remote target")]
    Unsupported(&'static str),

    #[error("missing colon in hostspec")]
    MissingColon,

    #[error("invalid port `{0}'")]
    InvalidPort(String),

    #[error("unable to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Value(String),
    NoValue,
}

pub enum Target {
    Local(Box<dyn Evaluator>),
    Remote(Box<dyn Transport>),
}

/// Where `-r` connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAddress {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl FromStr for RemoteAddress {
    type Err = ChannelError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if let Some(path) = spec.strip_prefix("unix:") {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        let (host, port) = spec.rsplit_once(':').ok_or(ChannelError::MissingColon)?;
        let port = port
            .parse()
            .map_err(|_| ChannelError::InvalidPort(port.to_string()))?;
        Ok(Self::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl std::fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Puts the controller back into the mode it was in before an exchange,
/// whichever way the exchange ends.
struct ModeGuard(Mode);

impl ModeGuard {
    fn enter(mode: Mode) -> Self {
        let previous = CONTROLLER.mode();
        CONTROLLER.set_mode(mode);
        Self(previous)
    }
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        CONTROLLER.set_mode(self.0);
    }
}

pub struct ExecutionChannel {
    target: Target,
}

impl ExecutionChannel {
    pub fn local(evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            target: Target::Local(evaluator),
        }
    }

    pub fn remote(transport: Box<dyn Transport>) -> Self {
        Self {
            target: Target::Remote(transport),
        }
    }

    /// Connect to a target that is already listening.
    pub fn connect(address: &RemoteAddress) -> Result<Self, ChannelError> {
        let transport: Box<dyn Transport> = match address {
            RemoteAddress::Unix(path) => {
                let stream = UnixStream::connect(path).map_err(|source| ChannelError::Connect {
                    address: address.to_string(),
                    source,
                })?;
                Box::new(stream)
            }
            RemoteAddress::Tcp { host, port } => Box::new(connect_tcp(host, *port)?),
        };
        tracing::info!("Connected to {}", address);
        Ok(Self::remote(transport))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.target, Target::Remote(_))
    }

    /// Run `source` on the target and wait for its result.
    pub fn send(&mut self, source: &str) -> Result<Reply, ChannelError> {
        match &mut self.target {
            Target::Local(evaluator) => {
                let _mode = ModeGuard::enter(Mode::Evaluating);
                CONTROLLER.clear_cancel();
                let result = evaluator.evaluate(source);
                CONTROLLER.clear_cancel();
                Ok(result.map_or(Reply::NoValue, Reply::Value))
            }
            Target::Remote(transport) => {
                let _mode = ModeGuard::enter(Mode::SendingRequest);
                tracing::trace!("sending {} byte request", source.len());
                frame::write_frame(&mut *transport, source.as_bytes())?;

                CONTROLLER.set_mode(Mode::AwaitingResponse);
                match frame::read_response(&mut *transport)? {
                    None => Ok(Reply::NoValue),
                    Some(payload) => Ok(Reply::Value(
                        String::from_utf8_lossy(&payload).into_owned(),
                    )),
                }
            }
        }
    }

    pub fn collect_garbage(&mut self) -> Result<(), ChannelError> {
        match &mut self.target {
            Target::Local(evaluator) => {
                evaluator.collect_garbage();
                Ok(())
            }
            Target::Remote(_) => Err(ChannelError::Unsupported("?gc")),
        }
    }

    /// Drop the evaluation context and start over.
    pub fn destroy(&mut self) -> anyhow::Result<()> {
        match &mut self.target {
            Target::Local(evaluator) => evaluator.reset(),
            Target::Remote(_) => Err(ChannelError::Unsupported("?destroy").into()),
        }
    }
}

/// Try every address `host` resolves to, in order.
fn connect_tcp(host: &str, port: u16) -> Result<TcpStream, ChannelError> {
    let address = format!("{}:{}", host, port);
    let candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| ChannelError::Connect {
            address: address.clone(),
            source,
        })?;

    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
    for candidate in candidates {
        match TcpStream::connect(candidate) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("connect to {} failed: {}", candidate, e);
                last_error = e;
            }
        }
    }
    Err(ChannelError::Connect {
        address,
        source: last_error,
    })
}

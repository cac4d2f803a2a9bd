//! The remote end of the wire protocol: what runs inside an attached
//! process. Each request frame is evaluated and answered with the rendered
//! value or the no-value marker.

use super::evaluator::Evaluator;
use super::{frame, ChannelError, Transport};
use crate::services::signal_handler::{Mode, CONTROLLER};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Answer requests until the console hangs up. Returns the number of
/// requests served.
pub fn serve(transport: &mut dyn Transport, evaluator: &mut dyn Evaluator) -> Result<usize, ChannelError> {
    let mut served = 0;
    while let Some(request) = frame::read_request(&mut *transport)? {
        let source = String::from_utf8_lossy(&request);
        tracing::trace!("agent evaluating {} bytes", request.len());

        CONTROLLER.clear_cancel();
        CONTROLLER.set_mode(Mode::Evaluating);
        let result = evaluator.evaluate(&source);
        CONTROLLER.set_mode(Mode::Idle);

        match result {
            Some(value) => frame::write_frame(&mut *transport, value.as_bytes())?,
            None => frame::write_no_value(&mut *transport)?,
        }
        served += 1;
    }
    tracing::debug!("console disconnected after {} requests", served);
    Ok(served)
}

/// Connect to the console's rendezvous socket and serve it.
pub fn run(socket: &Path, evaluator: &mut dyn Evaluator) -> anyhow::Result<()> {
    use anyhow::Context as _;

    let mut stream = UnixStream::connect(socket)
        .with_context(|| format!("Failed to connect to {}", socket.display()))?;
    tracing::info!("Agent connected to {}", socket.display());
    serve(&mut stream, evaluator)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ExecutionChannel, Reply};

    struct Lengths;

    impl Evaluator for Lengths {
        fn evaluate(&mut self, source: &str) -> Option<String> {
            match source {
                "nothing" => None,
                other => Some(other.len().to_string()),
            }
        }
        fn collect_garbage(&mut self) {}
        fn reset(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_serves_until_hangup() {
        let (client, mut server) = UnixStream::pair().unwrap();
        let agent = std::thread::spawn(move || serve(&mut server, &mut Lengths).unwrap());

        let mut channel = ExecutionChannel::remote(Box::new(client));
        assert_eq!(channel.send("abcd").unwrap(), Reply::Value("4".into()));
        assert_eq!(channel.send("nothing").unwrap(), Reply::NoValue);
        drop(channel);

        assert_eq!(agent.join().unwrap(), 2);
    }
}

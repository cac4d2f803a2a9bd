//! Wire framing: a 4-byte length in native byte order followed by the
//! payload. A response length of [`NO_VALUE`] carries no payload and means
//! the evaluation produced nothing, which is distinct from an empty result.

use super::ChannelError;
use std::io::{self, Read, Write};

pub const NO_VALUE: u32 = u32::MAX;

/// Upper bound on the buffer reserved before any payload bytes arrive.
const INITIAL_CAPACITY: usize = 64 * 1024;

fn encode_len(len: usize) -> Result<[u8; 4], ChannelError> {
    match u32::try_from(len) {
        Ok(len) if len != NO_VALUE => Ok(len.to_ne_bytes()),
        _ => Err(ChannelError::TooLarge(len)),
    }
}

/// Write one frame carrying `payload`.
pub fn write_frame(out: &mut (impl Write + ?Sized), payload: &[u8]) -> Result<(), ChannelError> {
    out.write_all(&encode_len(payload.len())?)?;
    out.write_all(payload)?;
    out.flush()?;
    Ok(())
}

/// Write the "no value" marker.
pub fn write_no_value(out: &mut (impl Write + ?Sized)) -> Result<(), ChannelError> {
    out.write_all(&NO_VALUE.to_ne_bytes())?;
    out.flush()?;
    Ok(())
}

/// Read `len` payload bytes. The buffer grows with the bytes received, not
/// with the announced length.
fn read_payload(input: &mut (impl Read + ?Sized), len: u32) -> Result<Vec<u8>, ChannelError> {
    let len = len as usize;
    let mut payload = Vec::with_capacity(len.min(INITIAL_CAPACITY));
    Read::take(&mut *input, len as u64).read_to_end(&mut payload)?;
    if payload.len() < len {
        return Err(ChannelError::Closed);
    }
    Ok(payload)
}

/// Read a response frame. `None` is the "no value" marker.
pub fn read_response(input: &mut (impl Read + ?Sized)) -> Result<Option<Vec<u8>>, ChannelError> {
    let mut len = [0u8; 4];
    input.read_exact(&mut len).map_err(eof_is_closed)?;
    let len = u32::from_ne_bytes(len);
    if len == NO_VALUE {
        return Ok(None);
    }
    read_payload(input, len).map(Some)
}

/// Read a request frame. `None` means the peer closed the connection
/// between frames.
pub fn read_request(input: &mut (impl Read + ?Sized)) -> Result<Option<Vec<u8>>, ChannelError> {
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        match input.read(&mut len[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(ChannelError::Closed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    let len = u32::from_ne_bytes(len);
    if len == NO_VALUE {
        return Err(ChannelError::Protocol("request frame without payload"));
    }
    read_payload(input, len).map(Some)
}

fn eof_is_closed(e: io::Error) -> ChannelError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ChannelError::Closed
    } else {
        ChannelError::Io(e)
    }
}

//! Framed byte transport
//!
//! Applied Motion drives wrap every request and reply as
//! `0x00 0x07 <ASCII payload> 0x0D`. This module owns that framing and the
//! [`Connector`] seam used to open the underlying stream.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Frame header preceding every payload
pub const FRAME_HEADER: [u8; 2] = [0x00, 0x07];

/// End-of-message byte (carriage return)
pub const FRAME_END: u8 = b'\r';

/// Combined trait for the byte streams a motor talks over
pub trait ReadWrite: Read + Write + Send {}

impl<T: Read + Write + Send> ReadWrite for T {}

/// Opens byte streams to a motor controller
pub trait Connector: Send + Sync {
    /// Open a stream to `ip:port`; reads and writes must honour `timeout`
    fn connect(&self, ip: &str, port: u16, timeout: Duration) -> io::Result<Box<dyn ReadWrite>>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, ip: &str, port: u16, timeout: Duration) -> io::Result<Box<dyn ReadWrite>> {
        let addr: SocketAddr = format!("{ip}:{port}")
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{ip}:{port}: {e}")))?;

        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

/// Wrap an ASCII command in the frame header and terminator
pub fn encode_frame(command: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.len() + 3);
    frame.extend_from_slice(&FRAME_HEADER);
    frame.extend_from_slice(command.as_bytes());
    frame.push(FRAME_END);
    frame
}

/// Write one framed command
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, command: &str) -> io::Result<()> {
    writer.write_all(&encode_frame(command))?;
    writer.flush()
}

/// Read one framed reply and return its payload.
///
/// Bytes ahead of the header are discarded, partial reads are buffered
/// until the terminator arrives and anything after the terminator is
/// dropped. A closed stream is reported as `UnexpectedEof`.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, chunk_size: usize) -> io::Result<Vec<u8>> {
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut pending: Vec<u8> = Vec::new();
    let mut in_frame = false;

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed before end of message",
            ));
        }
        pending.extend_from_slice(&chunk[..n]);

        if !in_frame {
            match find_header(&pending) {
                Some(pos) => {
                    pending.drain(..pos + FRAME_HEADER.len());
                    in_frame = true;
                }
                None => {
                    // keep a trailing 0x00, it may start a split header
                    let keep = usize::from(pending.last() == Some(&FRAME_HEADER[0]));
                    let discard = pending.len() - keep;
                    pending.drain(..discard);
                    continue;
                }
            }
        }

        if let Some(end) = pending.iter().position(|&b| b == FRAME_END) {
            pending.truncate(end);
            return Ok(pending);
        }
    }
}

fn find_header(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_HEADER.len()).position(|w| w == FRAME_HEADER)
}

/// True when the error means the socket itself is gone and a reconnect
/// is worth attempting. Timeouts are not connection level.
pub fn is_connection_level(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

/// True for read/write timeouts
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

//! Line-delimited transport for the host bridge.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from the host shim
//! - stdout: sends messages to the host shim
//! - logging never goes to stdout
//!
//! The transport is generic over its reader and writer so tests can drive
//! it with in-memory streams; [`StdioTransport`] is the production form.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::bridge::protocol::{
    JsonRpcError, JsonRpcResponse, OutgoingNotification, OutgoingRequest,
};

/// Transport over the process's stdin/stdout.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

/// A newline-delimited JSON message stream.
pub struct LineTransport<R, W> {
    /// Buffered reader for incoming lines.
    reader: R,
    /// Sink for outgoing lines.
    writer: W,
    /// Bytes of a line whose read was cancelled before its newline arrived.
    pending: Vec<u8>,
}

impl StdioTransport {
    /// Creates a transport bound to stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport from a reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            pending: Vec::new(),
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the stream is closed (EOF).
    ///
    /// Cancel safe: bytes read before the future is dropped are kept and
    /// prefixed to the next line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the line is not UTF-8.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let bytes_read = self.reader.read_until(b'\n', &mut self.pending).await?;

        if bytes_read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let mut line = String::from_utf8(std::mem::take(&mut self.pending))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Remove the trailing newline
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a JSON-RPC response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_json(response).await
    }

    /// Writes a JSON-RPC error.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_json(error).await
    }

    /// Writes a request addressed to the host shim.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_request(&mut self, request: &OutgoingRequest) -> io::Result<()> {
        self.write_json(request).await
    }

    /// Writes a notification addressed to the host shim.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_notification(
        &mut self,
        notification: &OutgoingNotification,
    ) -> io::Result<()> {
        self.write_json(notification).await
    }

    async fn write_json<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

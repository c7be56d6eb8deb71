//! LSP Transport Layer
//!
//! Handles LSP message framing with Content-Length headers over any
//! async byte stream (child stdio in production, duplex pipes in tests).

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::protocol::Message;
use crate::error::LspError;

const CONTENT_LENGTH: &str = "content-length";

/// Upper bound on a single frame body (64 MiB)
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Frame decoder for the inbound half of a connection
pub struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next message
    ///
    /// ```text
    /// Content-Length: 123\r\n
    /// \r\n
    /// {"jsonrpc":"2.0",...}
    /// ```
    ///
    /// EOF before any header byte is `ConnectionClosed`; everything else that
    /// does not form a valid frame is `Protocol`.
    pub async fn read_message(&mut self) -> Result<Message, LspError> {
        let content_length = self.read_headers().await?;

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            LspError::Protocol(format!(
                "Truncated body (expected {} bytes): {}",
                content_length, e
            ))
        })?;

        let json = String::from_utf8(body)
            .map_err(|e| LspError::Protocol(format!("Body is not valid UTF-8: {}", e)))?;

        tracing::trace!("LSP <- {}", json);

        Message::parse(&json).map_err(|e| LspError::Protocol(format!("Invalid message: {}", e)))
    }

    /// Read headers and return Content-Length
    async fn read_headers(&mut self) -> Result<usize, LspError> {
        let mut content_length: Option<usize> = None;
        let mut raw = Vec::new();
        let mut first = true;

        loop {
            raw.clear();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut raw)
                .await
                .map_err(|e| LspError::ConnectionClosed(format!("Read failed: {}", e)))?;

            if bytes_read == 0 {
                return Err(if first {
                    LspError::ConnectionClosed("Server closed connection".into())
                } else {
                    LspError::Protocol("EOF inside frame header".into())
                });
            }
            first = false;

            let line = std::str::from_utf8(&raw)
                .map_err(|_| LspError::Protocol("Non-ASCII header line".into()))?
                .trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| LspError::Protocol(format!("Malformed header: {:?}", line)))?;

            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
                let parsed = value.trim().parse::<usize>().map_err(|_| {
                    LspError::Protocol(format!("Invalid Content-Length: {:?}", value.trim()))
                })?;
                if parsed > MAX_FRAME_BYTES {
                    return Err(LspError::Protocol(format!(
                        "Content-Length {} exceeds limit of {} bytes",
                        parsed, MAX_FRAME_BYTES
                    )));
                }
                content_length = Some(parsed);
            }
            // Other headers (Content-Type) are ignored
        }

        content_length.ok_or_else(|| LspError::Protocol("Missing Content-Length".into()))
    }
}

/// Encode a JSON payload as one LSP frame
pub fn encode_frame(json: &str) -> Vec<u8> {
    let mut frame = format!("Content-Length: {}\r\n\r\n", json.len()).into_bytes();
    frame.extend_from_slice(json.as_bytes());
    frame
}

/// Write a raw JSON message with LSP framing
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> std::io::Result<()> {
    tracing::trace!("LSP -> {}", json);

    writer.write_all(&encode_frame(json)).await?;
    writer.flush().await
}

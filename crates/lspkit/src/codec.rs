//! LSP base-protocol framing: `Content-Length: N\r\n\r\n<body>` over a
//! byte-oriented, buffered stream.

use crate::message::Message;
use lspkit_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Reads framed JSON-RPC messages off a byte stream.
///
/// Byte-oriented and buffered. A malformed frame is fatal
/// to the stream: callers must treat any `Err` from [`FrameReader::read_frame`]
/// or [`FrameReader::read_message`] as grounds to abandon the transport
/// rather than try to resynchronize mid-stream.
pub struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read one frame's raw body bytes (header parsed and discarded).
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut content_length: Option<usize> = None;
        loop {
            let mut line = String::new();
            let n = self
                .inner
                .read_line(&mut line)
                .await
                .map_err(Error::from)?;
            if n == 0 {
                return Err(Error::Eof);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::Framing(format!("header missing ':': {line:?}")));
            };
            if name.trim().eq_ignore_ascii_case("content-length") {
                let value = value.trim();
                let length: usize = value
                    .parse()
                    .map_err(|_| Error::Framing(format!("non-numeric Content-Length: {value:?}")))?;
                content_length = Some(length);
            }
            // Other headers (e.g. Content-Type) are ignored.
        }
        let length = content_length.ok_or_else(|| Error::Framing("missing Content-Length".into()))?;
        let mut body = vec![0u8; length];
        tokio::io::AsyncReadExt::read_exact(&mut self.inner, &mut body)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::Eof
                } else {
                    Error::from(e)
                }
            })?;
        Ok(body)
    }

    pub async fn read_message(&mut self) -> Result<Message> {
        let body = self.read_frame().await?;
        Message::decode(&body)
    }
}

/// Writes framed JSON-RPC messages to a byte stream.
///
/// Writes are not internally serialized; that job belongs to
/// the Transport, which owns exactly one writer task per connection.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        let body = message.encode()?;
        self.write_frame(&body).await
    }

    pub async fn write_frame(&mut self, body: &[u8]) -> Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.inner.write_all(header.as_bytes()).await.map_err(Error::from)?;
        self.inner.write_all(body).await.map_err(Error::from)?;
        self.inner.flush().await.map_err(Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lspkit_core::id::RequestId;

    #[tokio::test]
    async fn writer_then_reader_round_trips_a_body() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        let msg = Message::request(RequestId::Int(1), "textDocument/hover", serde_json::json!({}));
        writer.write_message(&msg).await.unwrap();

        let decoded = reader.read_message().await.unwrap();
        match decoded {
            Message::Request(r) => assert_eq!(r.method, "textDocument/hover"),
            _ => panic!("expected request"),
        }
    }

    #[tokio::test]
    async fn whitespace_around_content_length_is_accepted() {
        let (mut client, server) = tokio::io::duplex(4096);
        let body = b"{\"jsonrpc\":\"2.0\",\"method\":\"exit\"}";
        let frame = format!("Content-Length:  {}  \r\n\r\n", body.len());
        client.write_all(frame.as_bytes()).await.unwrap();
        client.write_all(body).await.unwrap();

        let mut reader = FrameReader::new(server);
        let msg = reader.read_message().await.unwrap();
        assert!(matches!(msg, Message::Notification(n) if n.method == "exit"));
    }

    #[tokio::test]
    async fn non_numeric_content_length_is_rejected() {
        let (mut client, server) = tokio::io::duplex(4096);
        client
            .write_all(b"Content-Length: abc\r\n\r\n")
            .await
            .unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
    }

    #[tokio::test]
    async fn zero_byte_body_is_legal_framing_but_rejected_by_the_codec() {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(b"Content-Length: 0\r\n\r\n").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        let body = reader.read_frame().await.unwrap();
        assert!(body.is_empty());
        assert!(matches!(Message::decode(&body), Err(Error::Codec(_))));
    }

    #[tokio::test]
    async fn premature_eof_mid_body_is_an_eof_error() {
        let (mut client, server) = tokio::io::duplex(4096);
        client.write_all(b"Content-Length: 10\r\n\r\nabc").await.unwrap();
        drop(client);

        let mut reader = FrameReader::new(server);
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, Error::Eof));
    }
}

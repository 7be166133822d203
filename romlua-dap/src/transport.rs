// DAP wire framing
//
// `Content-Length: N\r\n\r\n` followed by N bytes of JSON

use crate::protocol::ProtocolMessage;
use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest DAP message accepted from the client (16MB)
const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Read one message. `Ok(None)` on a clean EOF between messages.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<ProtocolMessage>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            if saw_header {
                return Err(anyhow!("Connection closed inside message header"));
            }
            return Ok(None);
        }
        saw_header = true;

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = Some(value.trim().parse().context("Invalid Content-Length")?);
        }
    }

    let len = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;
    if len > MAX_CONTENT_LENGTH {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    let message = serde_json::from_slice(&buf).context("Invalid DAP message")?;
    Ok(Some(message))
}

pub async fn write_message<W>(writer: &mut W, message: &ProtocolMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(message)?;
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Event, Request};
    use serde_json::{json, Value};
    use tokio::io::BufReader;

    fn framed(json: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", json.len(), json).into_bytes()
    }

    #[tokio::test]
    async fn test_read_two_messages() {
        let mut bytes = framed(r#"{"seq":1,"type":"request","command":"initialize","arguments":{}}"#);
        bytes.extend(framed(r#"{"seq":2,"type":"request","command":"threads"}"#));
        let mut reader = BufReader::new(bytes.as_slice());

        let first = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(
            first,
            ProtocolMessage::Request(Request {
                seq: 1,
                command: "initialize".into(),
                arguments: json!({}),
            })
        );

        let second = read_message(&mut reader).await.unwrap().unwrap();
        assert!(matches!(second, ProtocolMessage::Request(Request { seq: 2, .. })));

        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let bytes = b"X-Other: 1\r\n\r\n{}".to_vec();
        let mut reader = BufReader::new(bytes.as_slice());
        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let bytes = b"Content-Length: 10\r\n".to_vec();
        let mut reader = BufReader::new(bytes.as_slice());
        assert!(read_message(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let message = ProtocolMessage::Event(Event {
            seq: 7,
            event: "stopped".into(),
            body: Some(json!({"reason": "breakpoint", "threadId": 1})),
        });

        let mut out = Vec::new();
        write_message(&mut out, &message).await.unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("Content-Length: "));

        let mut reader = BufReader::new(out.as_slice());
        let back = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(back, message);

        let body: Value = serde_json::to_value(&back).unwrap();
        assert_eq!(body["type"], "event");
    }
}

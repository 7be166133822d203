// Remote transport event loop
//
// One task owns both halves of the byte stream. Outbound frames are queued by
// the session and written in order; inbound bytes are reassembled, decoded and
// forwarded as notifications. There is no reply routing: the protocol has no
// request ids.

use crate::events::{parse_response, Response};
use crate::protocol::{hex_dump, BridgeError, BridgeResult, CommandPacket};
use crate::reassembler::FrameReassembler;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Inbound notifications are not dropped, so a slow consumer stalls reads
const INBOUND_CHANNEL_SIZE: usize = 256;

/// Something that happened on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Response(Response),
    /// Connection ended (EOF, IO error or protocol violation)
    Closed,
}

/// Fire-and-forget handle for queueing outbound commands
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl CommandSender {
    /// Sender plus the raw frame stream it feeds, for custom transports
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a command; never waits for the write
    pub fn send(&self, packet: &CommandPacket) -> BridgeResult<()> {
        let frame = packet.encode();
        debug!("Sending {}: {}", packet.name(), hex_dump(&frame));

        self.tx.send(frame).map_err(|_| BridgeError::ConnectionClosed)
    }
}

/// Start the event loop task over any byte stream
pub fn spawn_event_loop<R, W>(
    reader: R,
    writer: W,
    max_frame_size: usize,
) -> (CommandSender, mpsc::Receiver<Inbound>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (commands, command_rx) = CommandSender::channel();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_SIZE);

    tokio::spawn(event_loop_task(
        reader,
        writer,
        command_rx,
        inbound_tx,
        FrameReassembler::with_max_frame_size(max_frame_size),
    ));

    (commands, inbound_rx)
}

async fn event_loop_task<R, W>(
    mut reader: R,
    mut writer: W,
    mut command_rx: mpsc::UnboundedReceiver<Bytes>,
    inbound_tx: mpsc::Sender<Inbound>,
    mut reassembler: FrameReassembler,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Event loop started");

    loop {
        tokio::select! {
            // Outgoing commands
            frame = command_rx.recv() => {
                let Some(frame) = frame else {
                    info!("Session released the transport");
                    break;
                };

                if let Err(e) = write_frame(&mut writer, &frame).await {
                    error!("Failed to write command: {}", e);
                    break;
                }
            }

            // Incoming bytes
            result = reader.read_buf(reassembler.buffer_mut()) => {
                match result {
                    Ok(0) => {
                        info!("Remote closed the connection");
                        break;
                    }
                    Ok(n) => {
                        debug!("Read {} bytes, {} buffered", n, reassembler.pending());
                        if !dispatch_payloads(&mut reassembler, &inbound_tx).await {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read from remote: {}", e);
                        break;
                    }
                }
            }
        }
    }

    if reassembler.pending() > 0 {
        warn!("Discarding {} bytes of partial frame", reassembler.pending());
        reassembler.clear();
    }

    inbound_tx.send(Inbound::Closed).await.ok();
    writer.shutdown().await.ok();

    info!("Event loop shutting down");
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Decode and forward every complete payload. Returns false when the
/// connection must be dropped.
async fn dispatch_payloads(
    reassembler: &mut FrameReassembler,
    inbound_tx: &mpsc::Sender<Inbound>,
) -> bool {
    loop {
        let payload = match reassembler.next_payload() {
            Ok(Some(payload)) => payload,
            Ok(None) => return true,
            Err(e) => {
                error!("Protocol violation, dropping connection: {}", e);
                return false;
            }
        };

        match parse_response(&payload) {
            Ok(response) => {
                if inbound_tx.send(Inbound::Response(response)).await.is_err() {
                    warn!("Notification receiver dropped");
                    return false;
                }
            }
            Err(BridgeError::UnknownResponseCode(code)) => {
                warn!(
                    "Unknown response code {}, discarding frame: {}",
                    code,
                    hex_dump(&payload)
                );
            }
            Err(e) => {
                // Declared length already matched, so this is a malformed payload
                error!("Malformed frame ({} bytes): {}", payload.len(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{self, response_codes};
    use crate::events::tests::stop_payload;
    use crate::protocol::{encode_frame, DEFAULT_MAX_FRAME_SIZE};
    use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt};

    fn spawn_over_duplex() -> (CommandSender, mpsc::Receiver<Inbound>, tokio::io::DuplexStream) {
        let (local, remote) = duplex(4096);
        let (reader, writer) = split(local);
        let (sender, inbound) = spawn_event_loop(reader, writer, DEFAULT_MAX_FRAME_SIZE);
        (sender, inbound, remote)
    }

    #[tokio::test]
    async fn test_commands_are_framed_in_order() {
        let (sender, _inbound, mut remote) = spawn_over_duplex();

        sender.send(&commands::resume()).unwrap();
        sender.send(&commands::bp_add("a.lua", 3).unwrap()).unwrap();

        let mut buf = vec![0u8; 5 + 4 + 12];
        remote.read_exact(&mut buf).await.unwrap();

        assert_eq!(&buf[..5], &[0, 0, 0, 1, 3]);
        assert_eq!(&buf[5..9], &[0, 0, 0, 12]);
        assert_eq!(buf[9], 1);
    }

    #[tokio::test]
    async fn test_byte_at_a_time_delivery() {
        let (_sender, mut inbound, mut remote) = spawn_over_duplex();

        let mut stream = encode_frame(&stop_payload("main.lua", 10, "update", &[("x", "42")], &[])).to_vec();
        stream.extend_from_slice(&encode_frame(&[response_codes::CONTINUED]));

        for byte in stream {
            remote.write_all(&[byte]).await.unwrap();
            remote.flush().await.unwrap();
        }

        match inbound.recv().await.unwrap() {
            Inbound::Response(Response::Stop(snapshot)) => {
                assert_eq!(snapshot.file, "main.lua");
                assert_eq!(snapshot.line, 10);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(inbound.recv().await.unwrap(), Inbound::Response(Response::Continued));
    }

    #[tokio::test]
    async fn test_bad_frames_do_not_affect_later_ones() {
        let (_sender, mut inbound, mut remote) = spawn_over_duplex();

        let mut stream = Vec::new();
        // Unknown code
        stream.extend_from_slice(&encode_frame(&[77, 1, 2]));
        // STOP with truncated body
        stream.extend_from_slice(&encode_frame(&[response_codes::STOP, 0, 9, b'a']));
        stream.extend_from_slice(&encode_frame(&[response_codes::CONTINUED]));
        remote.write_all(&stream).await.unwrap();

        assert_eq!(inbound.recv().await.unwrap(), Inbound::Response(Response::Continued));
    }

    #[tokio::test]
    async fn test_remote_close_reports_closed() {
        let (sender, mut inbound, mut remote) = spawn_over_duplex();

        // Half a frame, then EOF
        remote.write_all(&[0, 0, 0, 8, 100]).await.unwrap();
        drop(remote);

        assert_eq!(inbound.recv().await.unwrap(), Inbound::Closed);
        assert!(inbound.recv().await.is_none());

        // Task is gone, so the queue is closed
        tokio::task::yield_now().await;
        assert!(sender.send(&commands::resume()).is_err());
    }

    #[tokio::test]
    async fn test_oversized_frame_drops_connection() {
        let (local, mut remote) = duplex(64);
        let (reader, writer) = split(local);
        let (_sender, mut inbound) = spawn_event_loop(reader, writer, 16);

        remote.write_all(&[0, 0, 1, 0]).await.unwrap();

        assert_eq!(inbound.recv().await.unwrap(), Inbound::Closed);
    }

    #[tokio::test]
    async fn test_dropping_sender_closes_transport() {
        let (sender, mut inbound, mut remote) = spawn_over_duplex();
        drop(sender);

        assert_eq!(inbound.recv().await.unwrap(), Inbound::Closed);

        let mut buf = Vec::new();
        assert_eq!(remote.read_to_end(&mut buf).await.unwrap(), 0);
    }
}

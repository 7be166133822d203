// Remote connection management
//
// Opens the TCP stream to the remote runtime and starts the event loop

use crate::eventloop::{spawn_event_loop, CommandSender, Inbound};
use crate::protocol::{BridgeResult, DEFAULT_MAX_FRAME_SIZE};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::info;

/// Default endpoint of the remote debug agent
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4712;

/// Both directions of a live connection: a command queue and a
/// notification stream
#[derive(Debug)]
pub struct RemoteLink {
    pub commands: CommandSender,
    pub inbound: mpsc::Receiver<Inbound>,
}

impl RemoteLink {
    /// Connect to the remote runtime over TCP
    pub async fn connect(host: &str, port: u16) -> BridgeResult<Self> {
        info!("Connecting to Lua debugger on {}:{}...", host, port);

        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;

        info!("Connected to Lua debugger on {}:{}", host, port);

        let (reader, writer) = stream.into_split();
        Ok(Self::spawn(reader, writer, DEFAULT_MAX_FRAME_SIZE))
    }

    /// Run the protocol over an already established byte stream
    pub fn spawn<R, W>(reader: R, writer: W, max_frame_size: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (commands, inbound) = spawn_event_loop(reader, writer, max_frame_size);
        Self { commands, inbound }
    }

    pub fn into_parts(self) -> (CommandSender, mpsc::Receiver<Inbound>) {
        (self.commands, self.inbound)
    }
}

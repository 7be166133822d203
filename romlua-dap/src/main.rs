// Rom Lua debug adapter
//
// Speaks the Debug Adapter Protocol on stdio and drives a remote Lua runtime
// over its binary debug protocol

use anyhow::Result;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod config;
mod handlers;
mod protocol;
mod transport;

use handlers::{Flow, RequestHandler};
use protocol::{ProtocolMessage, Request};

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing to stderr only - stdout is reserved for DAP
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("romlua_dap=info".parse()?)
                .add_directive("romlua_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("Starting Rom Lua debug adapter...");

    let requests = spawn_stdin_reader();
    let mut stdout = tokio::io::stdout();

    run(requests, &mut stdout).await?;

    info!("Debug adapter shutting down");
    Ok(())
}

/// Read DAP messages off stdin on their own task so a partially read message
/// is never lost to `select!`
fn spawn_stdin_reader() -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut reader = BufReader::new(tokio::io::stdin());
        loop {
            match transport::read_message(&mut reader).await {
                Ok(Some(ProtocolMessage::Request(request))) => {
                    if tx.send(request).await.is_err() {
                        break;
                    }
                }
                Ok(Some(other)) => warn!("Ignoring non-request message: {:?}", other),
                Ok(None) => {
                    info!("Client disconnected");
                    break;
                }
                Err(e) => {
                    error!("Read error: {:#}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Single reaction loop: client requests and remote notifications are
/// handled one at a time, in arrival order
async fn run<W>(mut requests: mpsc::Receiver<Request>, writer: &mut W) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut handler = RequestHandler::new();

    info!("Debug adapter ready, waiting for requests...");

    loop {
        let (messages, flow) = tokio::select! {
            request = requests.recv() => match request {
                Some(request) => handler.handle_request(request).await,
                None => {
                    handler.handle_request(Request {
                        seq: 0,
                        command: "disconnect".to_string(),
                        arguments: serde_json::Value::Null,
                    }).await;
                    break;
                }
            },
            inbound = handler.next_inbound() => (handler.handle_inbound(inbound), Flow::Continue),
        };

        for message in &messages {
            debug!("Sending: {:?}", message);
            transport::write_message(writer, message).await?;
        }

        if flow == Flow::Exit {
            break;
        }
    }

    Ok(())
}

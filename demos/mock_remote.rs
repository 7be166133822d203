// Stand-in for the Lua runtime's debug agent
//
// Listens on 127.0.0.1:4712, logs every command it receives and answers
// execution commands the way the real agent does: CONTINUED, then a STOP at
// the next line.

use bytes::{BufMut, BytesMut};
use romlua_client::commands::{command_codes, command_name, response_codes};
use romlua_client::protocol::encode_frame;
use romlua_client::reader::{read_i32, read_string, read_u8};
use romlua_client::writer::{write_i32, write_string, write_u8};
use romlua_client::FrameReassembler;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;

fn stop(file: &str, line: i32, counter: i32) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    write_u8(&mut data, response_codes::STOP);
    write_string(&mut data, file)?;
    write_i32(&mut data, line);
    write_string(&mut data, "update")?;
    write_i32(&mut data, 2);
    write_string(&mut data, "counter")?;
    write_string(&mut data, &counter.to_string())?;
    write_string(&mut data, "self")?;
    write_string(&mut data, "table: 0x5581a2c0")?;
    write_i32(&mut data, 1);
    write_string(&mut data, "_VERSION")?;
    write_string(&mut data, "Lua 5.4")?;
    Ok(data)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("mock_remote=info,romlua_client=debug")
        .init();

    let listener = TcpListener::bind("127.0.0.1:4712").await?;
    info!("Mock Lua agent listening on 127.0.0.1:4712");

    let (mut socket, peer) = listener.accept().await?;
    info!("Debugger attached from {}", peer);

    let mut reassembler = FrameReassembler::new();
    let mut file = String::from("main.lua");
    let mut line = 1;
    let mut counter = 0;
    let mut chunk = BytesMut::with_capacity(1024);

    loop {
        chunk.clear();
        if socket.read_buf(&mut chunk).await? == 0 {
            info!("Debugger detached");
            return Ok(());
        }

        for payload in reassembler.push(&chunk)? {
            let mut buf = &payload[..];
            let code = read_u8(&mut buf)?;
            info!("<- {}", command_name(code));

            let mut out = BytesMut::new();
            match code {
                command_codes::BP_ADD => {
                    file = read_string(&mut buf)?;
                    line = read_i32(&mut buf)?;
                    info!("   breakpoint {}:{}", file, line);
                    // Pretend the breakpoint is hit right away
                    out.put_slice(&encode_frame(&stop(&file, line, counter)?));
                }
                command_codes::BP_CLEAR_FILE => {
                    info!("   clear {}", read_string(&mut buf)?);
                }
                command_codes::CONTINUE
                | command_codes::STEP_IN
                | command_codes::STEP_OUT
                | command_codes::STEP_NEXT => {
                    counter += 1;
                    line += 1;
                    out.put_slice(&encode_frame(&[response_codes::CONTINUED]));
                    out.put_slice(&encode_frame(&stop(&file, line, counter)?));
                }
                _ => info!("   (ignored)"),
            }

            socket.write_all(&out).await?;
        }
    }
}

// Connect to a running Lua debug agent, set one breakpoint and print
// whatever the remote reports until it disconnects

use romlua_client::{DebugSession, Notification, RemoteLink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("romlua_client=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let file = args.next().unwrap_or_else(|| "main.lua".to_string());
    let line: i32 = args.next().map(|l| l.parse()).transpose()?.unwrap_or(1);

    println!("Connecting to Lua debugger at 127.0.0.1:4712...");

    let mut session = DebugSession::new();
    session.begin_connect();

    let (commands, mut inbound) = RemoteLink::connect("127.0.0.1", 4712).await?.into_parts();
    session.attach(commands);
    println!("✓ Connected");

    let accepted = session.set_breakpoints(&file, &[line]);
    println!("✓ Breakpoint set at {}:{} (verified: {})", file, line, accepted[0].verified);

    while let Some(event) = inbound.recv().await {
        match session.handle_inbound(event) {
            Some(Notification::Stopped { .. }) => {
                let frame = &session.stack_trace()[0];
                println!("⏸  Stopped in {} at {}:{}", frame.name, frame.file, frame.line);
                for scope in session.scopes() {
                    println!("   {}:", scope.name);
                    for var in session.variables(scope.variables_reference) {
                        println!("     {} = {}", var.name, var.value);
                    }
                }
                session.resume();
            }
            Some(Notification::Continued { .. }) => println!("▶  Continued"),
            Some(Notification::Terminated) => {
                println!("Remote disconnected");
                break;
            }
            None => {}
        }
    }

    Ok(())
}

// Remote Lua debugging client library
//
// Bridges a debugging front-end to a running Lua program that speaks a compact
// length-prefixed binary protocol:
// - Frame encoding and payload primitives
// - Stream reassembly over arbitrarily chunked reads
// - Fire-and-forget commands, unsolicited stop/continue notifications
// - Session state: breakpoints, execution snapshot, scope handles

pub mod commands;
pub mod connection;
pub mod eventloop;
pub mod events;
pub mod protocol;
pub mod reader;
pub mod reassembler;
pub mod session;
pub mod types;
pub mod writer;

pub use connection::RemoteLink;
pub use eventloop::{CommandSender, Inbound};
pub use events::Response;
pub use protocol::{BridgeError, BridgeResult};
pub use reassembler::FrameReassembler;
pub use session::{ConnectionState, DebugSession, Notification};

// Debug session state
//
// Owns the connection handle, the breakpoint table, the latest execution
// snapshot and the scope handles. Commands go out fire-and-forget; stop and
// continue notifications come back on their own and are applied through
// `handle_inbound`. Nothing here blocks.

use crate::commands;
use crate::eventloop::{CommandSender, Inbound};
use crate::events::Response;
use crate::protocol::{BridgeError, CommandPacket};
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// Every stop is reported with this reason; the protocol carries none
pub const STOP_REASON: &str = "breakpoint";

const FIRST_HANDLE: VariablesReference = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Terminated,
}

/// Raised for the client-facing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Stopped {
        thread_id: ThreadId,
        reason: &'static str,
    },
    Continued {
        thread_id: ThreadId,
    },
    Terminated,
}

/// Maps opaque references back to scopes
#[derive(Debug)]
pub struct VariableHandles {
    next: VariablesReference,
    scopes: HashMap<VariablesReference, ScopeKind>,
}

impl Default for VariableHandles {
    fn default() -> Self {
        Self {
            next: FIRST_HANDLE,
            scopes: HashMap::new(),
        }
    }
}

impl VariableHandles {
    pub fn create(&mut self, kind: ScopeKind) -> VariablesReference {
        let reference = self.next;
        self.next += 1;
        self.scopes.insert(reference, kind);
        reference
    }

    pub fn get(&self, reference: VariablesReference) -> Option<ScopeKind> {
        self.scopes.get(&reference).copied()
    }
}

#[derive(Debug)]
pub struct DebugSession {
    state: ConnectionState,
    outbound: Option<CommandSender>,
    program: Option<String>,
    breakpoints: HashMap<String, BTreeMap<i32, Breakpoint>>,
    snapshot: Option<ExecutionSnapshot>,
    handles: VariableHandles,
    locals_ref: Option<VariablesReference>,
    globals_ref: Option<VariablesReference>,
}

impl Default for DebugSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugSession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            outbound: None,
            program: None,
            breakpoints: HashMap::new(),
            snapshot: None,
            handles: VariableHandles::default(),
            locals_ref: None,
            globals_ref: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Program path from the launch request, shown until the first stop
    pub fn set_program(&mut self, program: Option<String>) {
        self.program = program;
    }

    // ---- connection lifecycle ----

    pub fn begin_connect(&mut self) {
        if self.state == ConnectionState::Terminated {
            warn!("Session already terminated, not reconnecting");
            return;
        }
        self.state = ConnectionState::Connecting;
    }

    /// Transport is up; commands flow from here on
    pub fn attach(&mut self, outbound: CommandSender) {
        if self.state == ConnectionState::Terminated {
            warn!("Ignoring connection for terminated session");
            return;
        }
        info!("Session connected");
        self.outbound = Some(outbound);
        self.state = ConnectionState::Connected;
    }

    /// Drop the transport. Returns the notification on the first call only.
    pub fn terminate(&mut self) -> Option<Notification> {
        if self.state == ConnectionState::Terminated {
            return None;
        }

        info!("Session terminated");
        // Dropping the sender ends the transport task
        self.outbound = None;
        self.state = ConnectionState::Terminated;
        Some(Notification::Terminated)
    }

    fn send(&self, packet: CommandPacket) {
        match (&self.state, &self.outbound) {
            (ConnectionState::Connected, Some(tx)) => {
                if let Err(e) = tx.send(&packet) {
                    warn!("Dropping {}: {}", packet.name(), e);
                }
            }
            _ => {
                warn!(
                    "Dropping {}: {} (state {:?})",
                    packet.name(),
                    BridgeError::TransportUnavailable,
                    self.state
                );
            }
        }
    }

    // ---- breakpoints ----

    /// Replace every breakpoint in `file` with `lines`
    ///
    /// The remote never rejects a line, so each one is reported verified.
    /// Only a path too long to encode yields unverified breakpoints.
    pub fn set_breakpoints(&mut self, file: &str, lines: &[i32]) -> Vec<Breakpoint> {
        let encodable = match commands::bp_clear_file(file) {
            Ok(packet) => {
                self.send(packet);
                true
            }
            Err(e) => {
                error!("Cannot send breakpoints for {}: {}", file, e);
                false
            }
        };

        let mut accepted = Vec::with_capacity(lines.len());
        for &line in lines {
            if encodable {
                match commands::bp_add(file, line) {
                    Ok(packet) => self.send(packet),
                    Err(e) => error!("Cannot encode breakpoint {}:{}: {}", file, line, e),
                }
            }

            accepted.push(Breakpoint {
                file: file.to_string(),
                line,
                verified: encodable,
            });
        }

        let table = self.breakpoints.entry(file.to_string()).or_default();
        table.clear();
        for breakpoint in &accepted {
            table.insert(breakpoint.line, breakpoint.clone());
        }

        debug!("{} breakpoint(s) set in {}", accepted.len(), file);
        accepted
    }

    /// Current breakpoints for a file, by line
    pub fn breakpoints(&self, file: &str) -> Vec<Breakpoint> {
        self.breakpoints
            .get(file)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    // ---- execution control ----

    pub fn resume(&self) {
        self.send(commands::resume());
    }

    pub fn step_in(&self) {
        self.send(commands::step_in());
    }

    pub fn step_out(&self) {
        self.send(commands::step_out());
    }

    pub fn step_next(&self) {
        self.send(commands::step_next());
    }

    // ---- inbound ----

    /// Replace the snapshot wholesale
    pub fn on_stop(&mut self, snapshot: ExecutionSnapshot) -> Notification {
        info!(
            "Stopped at {}:{} in {} ({} locals, {} globals)",
            snapshot.file,
            snapshot.line,
            snapshot.function,
            snapshot.locals.len(),
            snapshot.globals.len()
        );
        self.snapshot = Some(snapshot);

        Notification::Stopped {
            thread_id: MAIN_THREAD_ID,
            reason: STOP_REASON,
        }
    }

    /// The last snapshot stays visible until the next stop
    pub fn on_continued(&mut self) -> Notification {
        info!("Continued execution");
        Notification::Continued {
            thread_id: MAIN_THREAD_ID,
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) -> Option<Notification> {
        match inbound {
            Inbound::Response(Response::Stop(snapshot)) => Some(self.on_stop(snapshot)),
            Inbound::Response(Response::Continued) => Some(self.on_continued()),
            Inbound::Closed => match self.state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    warn!("{}", BridgeError::ConnectionClosed);
                    self.terminate()
                }
                _ => None,
            },
        }
    }

    // ---- queries ----

    pub fn threads(&self) -> Vec<ThreadInfo> {
        vec![ThreadInfo {
            id: MAIN_THREAD_ID,
            name: MAIN_THREAD_NAME.to_string(),
        }]
    }

    /// Single synthetic frame at the last known position
    pub fn stack_trace(&self) -> Vec<StackFrame> {
        let (file, line, function) = match &self.snapshot {
            Some(s) => (s.file.clone(), s.line, s.function.as_str()),
            None => (self.program.clone().unwrap_or_default(), 1, ""),
        };

        let name = if function.is_empty() {
            "<unknown>".to_string()
        } else {
            function.to_string()
        };

        vec![StackFrame {
            id: TOP_FRAME_ID,
            name,
            file,
            line,
            column: 1,
        }]
    }

    /// Locals and globals; the handles are minted once per session
    pub fn scopes(&mut self) -> Vec<Scope> {
        let handles = &mut self.handles;
        let locals = *self
            .locals_ref
            .get_or_insert_with(|| handles.create(ScopeKind::Locals));
        let globals = *self
            .globals_ref
            .get_or_insert_with(|| handles.create(ScopeKind::Globals));

        [(ScopeKind::Locals, locals), (ScopeKind::Globals, globals)]
            .into_iter()
            .map(|(kind, variables_reference)| Scope {
                name: kind.display_name().to_string(),
                kind,
                variables_reference,
                expensive: true,
            })
            .collect()
    }

    pub fn variables(&self, reference: VariablesReference) -> Vec<Variable> {
        let Some(kind) = self.handles.get(reference) else {
            warn!("Unknown scope for handle: {}", reference);
            return Vec::new();
        };

        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };

        let vars = match kind {
            ScopeKind::Locals => &snapshot.locals,
            ScopeKind::Globals => &snapshot.globals,
        };

        vars.iter()
            .map(|(name, value)| Variable {
                name: name.clone(),
                value: value.clone(),
                variables_reference: 0,
            })
            .collect()
    }

    /// Resolve a bare variable name against the snapshot
    pub fn evaluate(&self, name: &str) -> Option<String> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.lookup(name.trim()))
            .map(str::to_string)
    }
}

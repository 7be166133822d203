// DAP request handlers
//
// Maps client requests onto the debug session and session notifications
// onto DAP events. Every request is answered immediately: execution
// commands are fire-and-forget and their effects show up later as events.

use crate::config::LaunchConfig;
use crate::protocol::*;
use romlua_client::session::{ConnectionState, DebugSession, Notification};
use romlua_client::{Inbound, RemoteLink};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What the main loop should do after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct RequestHandler {
    seq: i64,
    session: DebugSession,
    inbound: Option<mpsc::Receiver<Inbound>>,
}

impl Default for RequestHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHandler {
    pub fn new() -> Self {
        Self {
            seq: 0,
            session: DebugSession::new(),
            inbound: None,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &DebugSession {
        &self.session
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn response(&mut self, request: &Request, result: Result<Option<Value>, String>) -> ProtocolMessage {
        let seq = self.next_seq();
        let (success, message, body) = match result {
            Ok(body) => (true, None, body),
            Err(message) => {
                warn!("{} failed: {}", request.command, message);
                (false, Some(message), None)
            }
        };

        ProtocolMessage::Response(Response {
            seq,
            request_seq: request.seq,
            success,
            command: request.command.clone(),
            message,
            body,
        })
    }

    fn event(&mut self, event: &str, body: Option<Value>) -> ProtocolMessage {
        ProtocolMessage::Event(Event {
            seq: self.next_seq(),
            event: event.to_string(),
            body,
        })
    }

    /// Wait for the next transport notification; pends forever without one
    pub async fn next_inbound(&mut self) -> Inbound {
        if let Some(rx) = self.inbound.as_mut() {
            if let Some(inbound) = rx.recv().await {
                return inbound;
            }
            self.inbound = None;
        }
        std::future::pending().await
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) -> Vec<ProtocolMessage> {
        match self.session.handle_inbound(inbound) {
            Some(notification) => vec![self.notification_event(notification)],
            None => Vec::new(),
        }
    }

    fn notification_event(&mut self, notification: Notification) -> ProtocolMessage {
        match notification {
            Notification::Stopped { thread_id, reason } => self.event(
                "stopped",
                Some(json!({
                    "reason": reason,
                    "threadId": thread_id,
                    "allThreadsStopped": true
                })),
            ),
            Notification::Continued { thread_id } => self.event(
                "continued",
                Some(json!({
                    "threadId": thread_id,
                    "allThreadsContinued": true
                })),
            ),
            Notification::Terminated => self.event("terminated", None),
        }
    }

    pub async fn handle_request(&mut self, request: Request) -> (Vec<ProtocolMessage>, Flow) {
        debug!("Request {} (seq {})", request.command, request.seq);

        let mut out = Vec::new();
        let mut flow = Flow::Continue;

        let result = match request.command.as_str() {
            "initialize" => Ok(Some(capabilities())),
            "launch" => {
                let result = self.handle_launch(&request.arguments).await;
                let connected = result.is_ok();
                out.push(self.response(&request, result));
                // Configuration (breakpoints) only makes sense once commands can flow
                if connected {
                    out.push(self.event("initialized", None));
                } else if let Some(n) = self.session.terminate() {
                    out.push(self.notification_event(n));
                }
                return (out, flow);
            }
            "configurationDone" => Ok(None),
            "setBreakpoints" => self.handle_set_breakpoints(&request.arguments),
            "threads" => Ok(Some(self.handle_threads())),
            "stackTrace" => Ok(Some(self.handle_stack_trace())),
            "scopes" => Ok(Some(self.handle_scopes())),
            "variables" => self.handle_variables(&request.arguments),
            "continue" => {
                self.session.resume();
                Ok(Some(json!({ "allThreadsContinued": true })))
            }
            "next" => {
                self.session.step_next();
                Ok(None)
            }
            "stepIn" => {
                self.session.step_in();
                Ok(None)
            }
            "stepOut" => {
                self.session.step_out();
                Ok(None)
            }
            "evaluate" => self.handle_evaluate(&request.arguments),
            "terminate" | "disconnect" => {
                if request.command == "disconnect" {
                    flow = Flow::Exit;
                }
                let terminated = self.session.terminate();
                self.inbound = None;
                out.push(self.response(&request, Ok(None)));
                if let Some(n) = terminated {
                    out.push(self.notification_event(n));
                }
                return (out, flow);
            }
            other => Err(format!("Unsupported request: {}", other)),
        };

        out.push(self.response(&request, result));
        (out, flow)
    }

    async fn handle_launch(&mut self, arguments: &Value) -> Result<Option<Value>, String> {
        // A terminated session never reconnects
        if self.session.state() == ConnectionState::Terminated {
            return Err("Session terminated".to_string());
        }

        let config = LaunchConfig::from_arguments(arguments)
            .map_err(|e| format!("Invalid launch arguments: {}", e))?;

        self.session.set_program(config.program.clone());
        self.session.begin_connect();

        let connect = RemoteLink::connect(&config.host, config.port);
        let link = match tokio::time::timeout(config.connect_timeout(), connect).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                error!("Failed to connect to {}:{}: {}", config.host, config.port, e);
                return Err(format!("Failed to connect to {}:{}: {}", config.host, config.port, e));
            }
            Err(_) => {
                error!("Timed out connecting to {}:{}", config.host, config.port);
                return Err(format!(
                    "Timed out after {}ms connecting to {}:{}",
                    config.connect_timeout_ms, config.host, config.port
                ));
            }
        };

        let (commands, inbound) = link.into_parts();
        self.session.attach(commands);
        self.inbound = Some(inbound);

        info!("Launched {:?} against {}:{}", config.program, config.host, config.port);
        Ok(None)
    }

    fn handle_set_breakpoints(&mut self, arguments: &Value) -> Result<Option<Value>, String> {
        let args: SetBreakpointsArguments = parse_arguments(arguments)?;
        let path = args
            .source
            .path
            .clone()
            .ok_or_else(|| "Missing 'source.path'".to_string())?;

        let breakpoints: Vec<Value> = self
            .session
            .set_breakpoints(&path, &args.requested_lines())
            .into_iter()
            .map(|bp| {
                json!({
                    "verified": bp.verified,
                    "line": bp.line,
                    "source": { "path": bp.file }
                })
            })
            .collect();

        Ok(Some(json!({ "breakpoints": breakpoints })))
    }

    fn handle_threads(&self) -> Value {
        let threads: Vec<Value> = self
            .session
            .threads()
            .into_iter()
            .map(|t| json!({ "id": t.id, "name": t.name }))
            .collect();

        json!({ "threads": threads })
    }

    fn handle_stack_trace(&self) -> Value {
        let frames: Vec<Value> = self
            .session
            .stack_trace()
            .into_iter()
            .map(|f| {
                let name = Path::new(&f.file)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                json!({
                    "id": f.id,
                    "name": f.name,
                    "source": { "name": name, "path": f.file },
                    "line": f.line,
                    "column": f.column
                })
            })
            .collect();

        let total = frames.len();
        json!({ "stackFrames": frames, "totalFrames": total })
    }

    fn handle_scopes(&mut self) -> Value {
        let scopes: Vec<Value> = self
            .session
            .scopes()
            .into_iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "variablesReference": s.variables_reference,
                    "expensive": s.expensive
                })
            })
            .collect();

        json!({ "scopes": scopes })
    }

    fn handle_variables(&self, arguments: &Value) -> Result<Option<Value>, String> {
        let args: VariablesArguments = parse_arguments(arguments)?;

        let variables: Vec<Value> = self
            .session
            .variables(args.variables_reference)
            .into_iter()
            .map(|v| {
                json!({
                    "name": v.name,
                    "value": v.value,
                    "variablesReference": v.variables_reference
                })
            })
            .collect();

        Ok(Some(json!({ "variables": variables })))
    }

    fn handle_evaluate(&self, arguments: &Value) -> Result<Option<Value>, String> {
        let args: EvaluateArguments = parse_arguments(arguments)?;
        debug!("Evaluate {:?} in context {:?}", args.expression, args.context);

        match self.session.evaluate(&args.expression) {
            Some(result) => Ok(Some(json!({ "result": result, "variablesReference": 0 }))),
            None => Err(format!("'{}' is not available", args.expression)),
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, String> {
    serde_json::from_value(arguments.clone()).map_err(|e| format!("Invalid arguments: {}", e))
}

fn capabilities() -> Value {
    json!({
        "supportsConfigurationDoneRequest": true,
        "supportsEvaluateForHovers": true,
        "supportsStepBack": false,
        "supportsDataBreakpoints": false,
        "supportsCancelRequest": false,
        "supportsTerminateRequest": true
    })
}

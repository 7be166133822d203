// Response decoding
//
// Responses arrive unsolicited from the remote runtime. None of them is tied
// to a command that was sent earlier.

use crate::commands::{response_codes, response_name};
use crate::protocol::{BridgeError, BridgeResult};
use crate::reader::{read_i32, read_string, read_u8};
use crate::types::ExecutionSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Execution stopped; carries the full snapshot
    Stop(ExecutionSnapshot),
    /// Execution resumed
    Continued,
}

impl Response {
    pub fn code(&self) -> u8 {
        match self {
            Response::Stop(_) => response_codes::STOP,
            Response::Continued => response_codes::CONTINUED,
        }
    }
}

/// Decode one complete payload
pub fn parse_response(payload: &[u8]) -> BridgeResult<Response> {
    let mut buf = payload;

    let code = read_u8(&mut buf)?;
    debug!("Received {} ({} bytes)", response_name(code), payload.len());

    match code {
        response_codes::STOP => parse_stop(&mut buf).map(Response::Stop),
        response_codes::CONTINUED => Ok(Response::Continued),
        _ => Err(BridgeError::UnknownResponseCode(code)),
    }
}

fn parse_stop(buf: &mut &[u8]) -> BridgeResult<ExecutionSnapshot> {
    let file = read_string(buf)?;
    let line = read_i32(buf)?;
    let function = read_string(buf)?;
    let locals = read_variables(buf)?;
    let globals = read_variables(buf)?;

    Ok(ExecutionSnapshot {
        file,
        line,
        function,
        locals,
        globals,
    })
}

/// Count followed by (name, value) string pairs
///
/// A repeated name keeps its first position and takes the last value.
fn read_variables(buf: &mut &[u8]) -> BridgeResult<Vec<(String, String)>> {
    let count = read_i32(buf)?;

    let mut vars: Vec<(String, String)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for _ in 0..count {
        let name = read_string(buf)?;
        let value = read_string(buf)?;
        match positions.get(&name) {
            Some(&index) => vars[index].1 = value,
            None => {
                positions.insert(name.clone(), vars.len());
                vars.push((name, value));
            }
        }
    }

    Ok(vars)
}

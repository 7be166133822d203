// Debug session type definitions
//
// Views handed to the client-facing layer. All of them are derived from the
// session's breakpoint table and its latest execution snapshot.

use serde::{Deserialize, Serialize};

pub type ThreadId = i64;
pub type FrameId = i64;
pub type VariablesReference = i64;

/// The only execution thread the remote runtime exposes
pub const MAIN_THREAD_ID: ThreadId = 1;
pub const MAIN_THREAD_NAME: &str = "thread 1";

/// The only stack frame that is modelled
pub const TOP_FRAME_ID: FrameId = 1;

/// A breakpoint accepted for a (file, line) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub file: String,
    pub line: i32,
    pub verified: bool,
}

/// Where the remote program last stopped, with its variables
///
/// Variables keep wire order. Replaced wholesale on every stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub file: String,
    pub line: i32,
    pub function: String,
    pub locals: Vec<(String, String)>,
    pub globals: Vec<(String, String)>,
}

impl ExecutionSnapshot {
    /// Look up a variable, locals shadowing globals
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.locals
            .iter()
            .chain(self.globals.iter())
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub id: FrameId,
    pub name: String,
    pub file: String,
    pub line: i32,
    pub column: i32,
}

/// The two variable groups the remote reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Locals,
    Globals,
}

impl ScopeKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ScopeKind::Locals => "Locals",
            ScopeKind::Globals => "Globals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub kind: ScopeKind,
    pub variables_reference: VariablesReference,
    pub expensive: bool,
}

/// A leaf variable; nested expansion is not supported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub variables_reference: VariablesReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_locals() {
        let snapshot = ExecutionSnapshot {
            locals: vec![("x".into(), "local".into())],
            globals: vec![("x".into(), "global".into()), ("g".into(), "7".into())],
            ..Default::default()
        };

        assert_eq!(snapshot.lookup("x"), Some("local"));
        assert_eq!(snapshot.lookup("g"), Some("7"));
        assert_eq!(snapshot.lookup("missing"), None);
    }

    #[test]
    fn test_scope_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ScopeKind::Globals).unwrap(), "\"globals\"");
    }
}

// Command and response vocabulary
//
// Commands (bridge -> remote):
// 1 = BP_ADD          file string, line int
// 2 = BP_CLEAR_FILE   file string
// 3 = CONTINUE
// 4 = STEP_IN
// 5 = STEP_OUT
// 6 = STEP_NEXT
//
// Responses (remote -> bridge):
// 100 = STOP       file, line, function, locals, globals
// 104 = CONTINUED

use crate::protocol::{BridgeResult, CommandPacket};
use crate::writer::{write_i32, write_string};

pub mod command_codes {
    pub const BP_ADD: u8 = 1;
    pub const BP_CLEAR_FILE: u8 = 2;
    pub const CONTINUE: u8 = 3;
    pub const STEP_IN: u8 = 4;
    pub const STEP_OUT: u8 = 5;
    pub const STEP_NEXT: u8 = 6;
}

pub mod response_codes {
    pub const STOP: u8 = 100;
    pub const CONTINUED: u8 = 104;
}

pub fn command_name(code: u8) -> &'static str {
    match code {
        command_codes::BP_ADD => "BP_ADD",
        command_codes::BP_CLEAR_FILE => "BP_CLEAR_FILE",
        command_codes::CONTINUE => "CONTINUE",
        command_codes::STEP_IN => "STEP_IN",
        command_codes::STEP_OUT => "STEP_OUT",
        command_codes::STEP_NEXT => "STEP_NEXT",
        _ => "UNKNOWN",
    }
}

pub fn response_name(code: u8) -> &'static str {
    match code {
        response_codes::STOP => "STOP",
        response_codes::CONTINUED => "CONTINUED",
        _ => "UNKNOWN",
    }
}

/// BP_ADD(file, line)
pub fn bp_add(file: &str, line: i32) -> BridgeResult<CommandPacket> {
    let mut packet = CommandPacket::new(command_codes::BP_ADD);
    write_string(&mut packet.data, file)?;
    write_i32(&mut packet.data, line);
    Ok(packet)
}

/// BP_CLEAR_FILE(file)
pub fn bp_clear_file(file: &str) -> BridgeResult<CommandPacket> {
    let mut packet = CommandPacket::new(command_codes::BP_CLEAR_FILE);
    write_string(&mut packet.data, file)?;
    Ok(packet)
}

pub fn resume() -> CommandPacket {
    CommandPacket::new(command_codes::CONTINUE)
}

pub fn step_in() -> CommandPacket {
    CommandPacket::new(command_codes::STEP_IN)
}

pub fn step_out() -> CommandPacket {
    CommandPacket::new(command_codes::STEP_OUT)
}

pub fn step_next() -> CommandPacket {
    CommandPacket::new(command_codes::STEP_NEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bp_add_layout() {
        let packet = bp_add("a.lua", 7).unwrap();
        assert_eq!(
            packet.payload(),
            vec![1, 0, 5, b'a', b'.', b'l', b'u', b'a', 0, 0, 0, 7]
        );
    }

    #[test]
    fn test_bp_clear_file_layout() {
        let packet = bp_clear_file("x").unwrap();
        assert_eq!(packet.payload(), vec![2, 0, 1, b'x']);
    }

    #[test]
    fn test_zero_payload_commands() {
        assert_eq!(resume().payload(), vec![command_codes::CONTINUE]);
        assert_eq!(step_in().payload(), vec![command_codes::STEP_IN]);
        assert_eq!(step_out().payload(), vec![command_codes::STEP_OUT]);
        assert_eq!(step_next().payload(), vec![command_codes::STEP_NEXT]);
    }

    #[test]
    fn test_names() {
        assert_eq!(command_name(command_codes::BP_CLEAR_FILE), "BP_CLEAR_FILE");
        assert_eq!(response_name(response_codes::STOP), "STOP");
        assert_eq!(response_name(response_codes::CONTINUED), "CONTINUED");
        assert_eq!(response_name(7), "UNKNOWN");
    }
}

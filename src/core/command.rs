//! Command names carried in the 12-byte header field.
//!
//! The field holds ASCII, right-padded with NUL bytes. Anything after the
//! first NUL must also be NUL.

use crate::error::{Result, WireError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the command field in the message header
pub const COMMAND_SIZE: usize = 12;

/// Message commands this crate knows how to frame.
///
/// Whether a given codec accepts a command is decided by its
/// [`CommandRegistry`](crate::protocol::registry::CommandRegistry), not by
/// this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Command {
    Version,
    Verack,
    GetAddr,
    Ping,
    Pong,
    Inv,
    GetData,
    NotFound,
    GetBlocks,
    GetHeaders,
    MemPool,
    SendHeaders,
    FeeFilter,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::Version,
        Command::Verack,
        Command::GetAddr,
        Command::Ping,
        Command::Pong,
        Command::Inv,
        Command::GetData,
        Command::NotFound,
        Command::GetBlocks,
        Command::GetHeaders,
        Command::MemPool,
        Command::SendHeaders,
        Command::FeeFilter,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::GetAddr => "getaddr",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Inv => "inv",
            Command::GetData => "getdata",
            Command::NotFound => "notfound",
            Command::GetBlocks => "getblocks",
            Command::GetHeaders => "getheaders",
            Command::MemPool => "mempool",
            Command::SendHeaders => "sendheaders",
            Command::FeeFilter => "feefilter",
        }
    }

    /// NUL-padded header field
    pub fn to_field(self) -> [u8; COMMAND_SIZE] {
        let mut out = [0u8; COMMAND_SIZE];
        let name = self.as_str().as_bytes();
        out[..name.len()].copy_from_slice(name);
        out
    }

    /// Look up a command by name.
    pub fn from_name(name: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Parse a raw header field.
    ///
    /// # Errors
    /// - `InvalidCommand` for non-ASCII bytes or data after the padding
    /// - `UnknownCommand` for a well-formed name this crate does not know
    pub fn from_field(field: &[u8; COMMAND_SIZE]) -> Result<Command> {
        let name = command_name(field)?;
        Command::from_name(name).ok_or_else(|| WireError::UnknownCommand {
            command: name.to_string(),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate the padding of a command field and return the name part.
pub fn command_name(field: &[u8; COMMAND_SIZE]) -> Result<&str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(COMMAND_SIZE);
    let (name, padding) = field.split_at(end);

    if padding.iter().any(|&b| b != 0) {
        return Err(WireError::InvalidCommand {
            command: String::from_utf8_lossy(field).into_owned(),
            reason: "non-NUL byte after padding",
        });
    }
    if !name.iter().all(|b| b.is_ascii_graphic()) {
        return Err(WireError::InvalidCommand {
            command: String::from_utf8_lossy(name).into_owned(),
            reason: "command must be printable ASCII",
        });
    }

    // All bytes are ASCII at this point.
    std::str::from_utf8(name).map_err(|_| WireError::InvalidCommand {
        command: String::from_utf8_lossy(name).into_owned(),
        reason: "command must be printable ASCII",
    })
}

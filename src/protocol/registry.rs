//! Command registry: the table of payload decoders the codec dispatches to.
//!
//! The registry is built once, before any connection is served, and is
//! read-only afterwards. Share it with `Arc`; lookups take no locks.

use crate::core::command::Command;
use crate::core::wire::WireReader;
use crate::error::{Result, WireError};
use crate::protocol::message::{decode, Message};
use crate::protocol::version::{Capabilities, ProtocolVersion};
use std::collections::HashMap;
use std::fmt;

/// Decoder for a single command's payload
pub type PayloadDecoder = fn(&mut WireReader<'_>, &Capabilities) -> Result<Message>;

/// Registration entry for one command
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub command: Command,
    /// Lowest negotiated version at which the command may be used
    pub min_version: ProtocolVersion,
    pub decode: PayloadDecoder,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("min_version", &self.min_version)
            .finish()
    }
}

impl CommandSpec {
    pub const fn new(command: Command, min_version: ProtocolVersion, decode: PayloadDecoder) -> Self {
        Self {
            command,
            min_version,
            decode,
        }
    }

    /// Fail with `CommandNotSupported` below `min_version`.
    pub fn check_version(&self, caps: &Capabilities) -> Result<()> {
        if caps.supports(self.min_version) {
            Ok(())
        } else {
            Err(WireError::CommandNotSupported {
                command: self.command.as_str(),
                required: self.min_version.get(),
                negotiated: caps.version().get(),
            })
        }
    }
}

/// Immutable command-to-decoder table.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    specs: HashMap<Command, CommandSpec>,
}

impl CommandRegistry {
    /// A registry with nothing registered; every command is unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every command this crate implements, with its minimum version.
    pub fn standard() -> Self {
        let none = ProtocolVersion(0);
        let mut registry = Self::empty();
        for spec in [
            CommandSpec::new(Command::Version, none, decode::version),
            CommandSpec::new(Command::Verack, none, decode::verack),
            CommandSpec::new(Command::GetAddr, none, decode::getaddr),
            CommandSpec::new(Command::Ping, none, decode::ping),
            CommandSpec::new(
                Command::Pong,
                ProtocolVersion(ProtocolVersion::BIP0031.get() + 1),
                decode::pong,
            ),
            CommandSpec::new(Command::Inv, none, decode::inv),
            CommandSpec::new(Command::GetData, none, decode::getdata),
            CommandSpec::new(Command::NotFound, none, decode::notfound),
            CommandSpec::new(Command::GetBlocks, none, decode::getblocks),
            CommandSpec::new(Command::GetHeaders, none, decode::getheaders),
            CommandSpec::new(Command::MemPool, ProtocolVersion::BIP0035, decode::mempool),
            CommandSpec::new(
                Command::SendHeaders,
                ProtocolVersion::SEND_HEADERS,
                decode::sendheaders,
            ),
            CommandSpec::new(Command::FeeFilter, ProtocolVersion::FEE_FILTER, decode::feefilter),
        ] {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace the entry for `spec.command`.
    pub fn register(&mut self, spec: CommandSpec) -> &mut Self {
        self.specs.insert(spec.command, spec);
        self
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, spec: CommandSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, command: Command) -> Option<&CommandSpec> {
        self.specs.get(&command)
    }

    /// Look up a command, `UnknownCommand` if it is not registered.
    pub fn lookup(&self, command: Command) -> Result<&CommandSpec> {
        self.get(command).ok_or_else(|| WireError::UnknownCommand {
            command: command.as_str().to_string(),
        })
    }

    pub fn contains(&self, command: Command) -> bool {
        self.specs.contains_key(&command)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Registered commands in a stable order
    pub fn commands(&self) -> Vec<Command> {
        let mut out: Vec<Command> = self.specs.keys().copied().collect();
        out.sort();
        out
    }
}

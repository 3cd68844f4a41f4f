// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Synchronous client for Valve game servers and master servers.
//!
//! * [`GameServer`] queries server information, rules and players and runs
//!   RCON commands. The engine is selected by type, see [`SourceServer`] and
//!   [`GoldSrcServer`].
//! * [`MasterServer`] enumerates game servers by region and filter.
//!
//! Every instance owns its sockets and its cache. Instances are independent and
//! can be moved to other threads.

#[macro_use]
extern crate log;

mod cache;
mod endpoint;

pub mod master;
pub mod server;
pub mod settings;
pub mod socket;

use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

pub use condenser_protocol as protocol;

pub use crate::cache::{Category, ServerCache};
pub use crate::endpoint::{Connection, Endpoint, Reconnect, GAME_PORT, MASTER_PORT};
pub use crate::master::MasterServer;
pub use crate::server::{Engine, GameServer, GoldSrc, GoldSrcServer, Source, SourceServer};
pub use crate::settings::{set_retries, set_timeout};

/// Errors of the codec.
pub type ProtocolError = condenser_protocol::Error;

/// The error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No response within the receive timeout.
    #[error("Timed out")]
    Timeout,
    /// The peer reset the connection.
    #[error("Connection reset by peer")]
    ConnectionReset,
    /// The peer refused the connection.
    #[error("Connection refused")]
    ConnectionRefused,
    /// The peer closed the connection.
    #[error("Connection dropped")]
    ConnectionDropped,
    /// Failed to decode a response.
    #[error("Invalid packet: {0}")]
    PacketFormat(ProtocolError),
    /// A compressed response is damaged.
    #[error("Corrupted payload: {0}")]
    CorruptPayload(ProtocolError),
    /// The server refuses RCON connections from this client.
    #[error("Banned by the server")]
    RconBan,
    /// RCON password is not set or was rejected.
    #[error("RCON is not authenticated")]
    RconNotAuthenticated,
    /// Master server discovery ran out of retries.
    #[error("Master server discovery failed after {retries} attempts ({count} servers received)", count = .servers.len())]
    DiscoveryExhausted {
        /// Number of failed attempts.
        retries: u32,
        /// Servers received before the failure.
        servers: Vec<SocketAddrV4>,
    },
    /// The server sent a response of the wrong type.
    #[error("Unexpected response")]
    UnexpectedResponse,
    /// The address can not be resolved.
    #[error("Failed to resolve \"{0}\"")]
    NoAddress(String),
    /// Other I/O error.
    #[error(transparent)]
    Io(io::Error),
}

impl Error {
    /// Returns `true` for transport failures which may succeed if repeated.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionReset | Self::ConnectionRefused
        )
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        use io::ErrorKind as E;

        match e.kind() {
            E::WouldBlock | E::TimedOut => Self::Timeout,
            E::ConnectionReset | E::ConnectionAborted => Self::ConnectionReset,
            E::ConnectionRefused => Self::ConnectionRefused,
            E::BrokenPipe | E::NotConnected | E::UnexpectedEof => Self::ConnectionDropped,
            _ => Self::Io(e),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        if e.is_corrupt() {
            Self::CorruptPayload(e)
        } else {
            Self::PacketFormat(e)
        }
    }
}

/// A specialized `Result` type for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

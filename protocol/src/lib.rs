// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

#![deny(missing_docs)]
#![cfg_attr(all(doc, has_doc_auto_cfg), feature(doc_auto_cfg))]

//! Valve dedicated server protocols between game clients, game servers and masters.
//!
//! The crate does no I/O. It encodes requests into caller supplied buffers and
//! decodes responses received by the caller:
//!
//! * [`game`] - packets sent by a client (queries, GoldSrc RCON commands, master requests).
//! * [`server`] - packets sent by a game server.
//! * [`master`] - packets sent by a master server.
//! * [`split`] - reassembly of responses split across several datagrams.
//! * [`rcon`] - length framed Source RCON packets.
//! * [`player`] - players and parsing of the RCON `status` command.
//! * [`filter`] - master server filter strings.

mod cursor;
mod server_info;

pub mod filter;
pub mod game;
pub mod master;
pub mod player;
pub mod rcon;
pub mod server;
pub mod split;
pub mod types;

pub use cursor::CursorError;
pub use server_info::{ExtraData, ModInfo, ServerInfo, TheShip};

use thiserror::Error;

/// Header of a packet which fits into a single datagram.
pub const SIMPLE_HEADER: i32 = -1;
/// Header of a fragment of a split response.
pub const SPLIT_HEADER: i32 = -2;

/// Maximum size of a query datagram sent by Valve servers.
pub const QUERY_PACKET_SIZE: usize = 1400;
/// Maximum size of a master server datagram.
pub const MASTER_PACKET_SIZE: usize = 1500;

/// The error type for decoding and encoding packets.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Failed to decode a packet.
    #[error("Invalid packet")]
    InvalidPacket,
    /// The packet does not start with a known header.
    #[error("Invalid packet header {0:#010x}")]
    InvalidHeader(i32),
    /// The packet type byte is not known.
    #[error("Unknown packet type {0:#04x}")]
    UnknownPacketType(u8),
    /// Malformed fragment of a split response.
    #[error("Invalid split packet")]
    InvalidSplitPacket,
    /// Source RCON frame with invalid size.
    #[error("Invalid RCON frame size {0}")]
    InvalidRconFrame(i32),
    /// Invalid region.
    #[error("Invalid region")]
    InvalidRegion,
    /// Checksum of a decompressed response does not match.
    #[error("Checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    ChecksumMismatch {
        /// Checksum declared by the server.
        expected: u32,
        /// Checksum of decompressed bytes.
        actual: u32,
    },
    /// Size of a decompressed response does not match.
    #[error("Decompressed size mismatch (expected {expected}, got {actual})")]
    SizeMismatch {
        /// Size declared by the server.
        expected: u32,
        /// Size of decompressed bytes.
        actual: u32,
    },
    /// Compressed stream is damaged.
    #[error("Failed to decompress payload")]
    Decompression,
    /// Compressed responses are not supported by this build.
    #[error("Compressed responses are not supported")]
    CompressionUnsupported,
    /// Cursor error.
    #[error("{0}")]
    Cursor(#[from] CursorError),
}

impl Error {
    /// Returns `true` if a payload was received but its content is damaged.
    ///
    /// Repeating the exchange will not fix it.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::SizeMismatch { .. } | Self::Decompression
        )
    }
}

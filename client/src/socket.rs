// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Sockets connected to a single address.
//!
//! Receive operations wait for the effective timeout: the timeout passed to
//! the call, otherwise the timeout of the socket, otherwise
//! [`settings::timeout`](crate::settings::timeout).

mod master;
mod query;
mod rcon;
mod udp;

use std::fmt;

use condenser_protocol::game::{InfoRequest, PlayerRequest, QueryServers, RconCommand, RulesRequest};

use crate::ProtocolError;

pub use self::master::MasterSocket;
pub use self::query::QuerySocket;
pub use self::rcon::RconSocket;
pub use self::udp::UdpChannel;

/// Largest datagram a socket can receive.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

const REQUEST_BUFFER_SIZE: usize = 4096;

/// A packet which can be sent with a datagram socket.
pub trait Request {
    /// Encode packet to `buf`.
    fn encode(&self, buf: &mut [u8]) -> Result<usize, ProtocolError>;
}

macro_rules! impl_request {
    ($($t:ty),+ $(,)?) => {
        $(impl Request for $t {
            fn encode(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
                <$t>::encode(self, buf)
            }
        })+
    };
}

impl_request!(InfoRequest, PlayerRequest, RulesRequest, RconCommand<'_>);

impl<T: fmt::Display> Request for QueryServers<T> {
    fn encode(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        QueryServers::encode(self, buf)
    }
}

/// Returns the header of a datagram.
fn header(data: &[u8]) -> Option<i32> {
    let bytes = data.get(..4)?;
    Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

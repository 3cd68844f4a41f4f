// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use condenser_protocol::{master::QueryServersResponse, MASTER_PACKET_SIZE, SIMPLE_HEADER};

use super::{header, Request, UdpChannel};
use crate::{ProtocolError, Result};

/// A socket connected to a master server.
#[derive(Debug)]
pub struct MasterSocket {
    channel: UdpChannel,
}

impl MasterSocket {
    /// Connects to a master server.
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            channel: UdpChannel::connect(addr, MASTER_PACKET_SIZE)?,
        })
    }

    /// Sets the timeout of this socket, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.channel.set_timeout(timeout);
    }

    /// Sends a request.
    pub fn send<R: Request + ?Sized>(&self, request: &R) -> Result<()> {
        self.channel.send_request(request)
    }

    /// Receives a page of game server addresses.
    ///
    /// The end of the list is marked by [`SENTINEL`](condenser_protocol::master::SENTINEL).
    pub fn reply(&mut self) -> Result<Vec<SocketAddrV4>> {
        let data = self.channel.recv()?;
        match header(data) {
            Some(SIMPLE_HEADER) => {}
            Some(header) => return Err(ProtocolError::InvalidHeader(header).into()),
            None => return Err(ProtocolError::InvalidPacket.into()),
        }
        let page = QueryServersResponse::decode(data)?;
        Ok(page.iter().collect())
    }
}

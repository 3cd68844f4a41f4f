// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::net::SocketAddr;
use std::time::Duration;

use condenser_protocol::{
    server::Packet,
    split::{Framing, Reassembler},
    QUERY_PACKET_SIZE, SIMPLE_HEADER, SPLIT_HEADER,
};

use super::{header, Request, UdpChannel};
use crate::{ProtocolError, Result};

/// A socket for the query protocol of a game server.
#[derive(Debug)]
pub struct QuerySocket {
    channel: UdpChannel,
    reassembler: Reassembler,
}

impl QuerySocket {
    /// Connects to a game server using `framing` for split responses.
    pub fn connect(addr: SocketAddr, framing: Framing) -> Result<Self> {
        Ok(Self {
            channel: UdpChannel::connect(addr, QUERY_PACKET_SIZE)?,
            reassembler: Reassembler::new(framing),
        })
    }

    /// Returns the framing of split responses.
    pub fn framing(&self) -> Framing {
        self.reassembler.framing()
    }

    /// Returns the underlying channel.
    pub fn channel(&self) -> &UdpChannel {
        &self.channel
    }

    /// Sets the timeout of this socket, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.channel.set_timeout(timeout);
    }

    /// Sends a request.
    pub fn send<R: Request + ?Sized>(&self, request: &R) -> Result<()> {
        self.channel.send_request(request)
    }

    /// Receives a complete response.
    pub fn reply(&mut self) -> Result<Packet> {
        self.reply_timeout(None)
    }

    /// Receives a complete response waiting `timeout` for every datagram.
    ///
    /// Fragments of a previous response are dropped. A timeout in the middle
    /// of a split response fails the whole response.
    pub fn reply_timeout(&mut self, timeout: Option<Duration>) -> Result<Packet> {
        self.reassembler.clear();
        loop {
            let data = self.channel.recv_timeout(timeout)?;
            let packet = match header(data) {
                Some(SIMPLE_HEADER) => Packet::decode(data)?,
                Some(SPLIT_HEADER) => match self.reassembler.push(data)? {
                    Some(data) => Packet::decode(&data)?,
                    None => continue,
                },
                Some(header) => return Err(ProtocolError::InvalidHeader(header).into()),
                None => return Err(ProtocolError::InvalidPacket.into()),
            };

            if let Packet::LogString(ref line) = packet {
                if self.framing() == Framing::GoldSrc {
                    debug!("{}: skip log line \"{}\"", self.channel.peer_addr(), line);
                    continue;
                }
            }

            return Ok(packet);
        }
    }
}

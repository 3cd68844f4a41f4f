// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use condenser_protocol::types::Str;

use super::{Request, MAX_DATAGRAM_SIZE, REQUEST_BUFFER_SIZE};
use crate::{settings, Result};

/// A datagram socket connected to a peer.
///
/// The receive buffer grows while received datagrams fill it completely.
#[derive(Debug)]
pub struct UdpChannel {
    sock: UdpSocket,
    peer: SocketAddr,
    timeout: Option<Duration>,
    buf: Vec<u8>,
}

impl UdpChannel {
    /// Binds an ephemeral local port and connects it to `peer`.
    ///
    /// `buffer_size` is the initial size of the receive buffer.
    pub fn connect(peer: SocketAddr, buffer_size: usize) -> Result<Self> {
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let sock = UdpSocket::bind(local)?;
        sock.connect(peer)?;
        Ok(Self {
            sock,
            peer,
            timeout: None,
            buf: vec![0; buffer_size.clamp(1, MAX_DATAGRAM_SIZE)],
        })
    }

    /// Returns the address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.sock.local_addr()?)
    }

    /// Sets the timeout of this socket, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Returns the effective timeout for a call with `timeout` override.
    pub fn timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout
            .or(self.timeout)
            .unwrap_or_else(settings::timeout)
            .max(Duration::from_millis(1))
    }

    /// Sends raw bytes.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        trace!("{} <- {}", self.peer, Str(data));
        self.sock.send(data)?;
        Ok(())
    }

    /// Encodes and sends a packet.
    pub fn send_request<R: Request + ?Sized>(&self, request: &R) -> Result<()> {
        let mut buf = [0; REQUEST_BUFFER_SIZE];
        let n = request.encode(&mut buf)?;
        self.send(&buf[..n])
    }

    /// Receives a datagram with the socket timeout.
    pub fn recv(&mut self) -> Result<&[u8]> {
        self.recv_timeout(None)
    }

    /// Receives a datagram with `timeout` instead of the socket timeout.
    pub fn recv_timeout(&mut self, timeout: Option<Duration>) -> Result<&[u8]> {
        let timeout = self.timeout(timeout);
        self.sock.set_read_timeout(Some(timeout))?;

        loop {
            // a peek that fills the buffer means the datagram may be truncated
            let n = self.sock.peek(&mut self.buf)?;
            if n < self.buf.len() || self.buf.len() >= MAX_DATAGRAM_SIZE {
                break;
            }
            let size = (self.buf.len() * 2).min(MAX_DATAGRAM_SIZE);
            debug!("{}: receive buffer grows to {} bytes", self.peer, size);
            self.buf.resize(size, 0);
        }

        let n = self.sock.recv(&mut self.buf)?;
        let data = &self.buf[..n];
        trace!("{} -> {}", self.peer, Str(data));
        Ok(data)
    }
}

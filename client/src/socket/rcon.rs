// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use condenser_protocol::{
    rcon::{self, RconPacket, RconRequest},
    types::Str,
};

use crate::{settings, Error, Result};

/// Reads exactly `buf.len()` bytes, `consumed` counts bytes taken from the stream.
///
/// Returns `false` if the peer closed the connection.
fn read_frame(stream: &mut TcpStream, buf: &mut [u8], consumed: &mut usize) -> io::Result<bool> {
    let mut pos = 0;
    while pos < buf.len() {
        match stream.read(&mut buf[pos..]) {
            Ok(0) => return Ok(false),
            Ok(n) => {
                pos += n;
                *consumed += n;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// A TCP connection for Source RCON.
///
/// The connection is established by the first [`send`](Self::send).
#[derive(Debug)]
pub struct RconSocket {
    addr: SocketAddr,
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
}

impl RconSocket {
    /// Creates a new socket for `addr` without connecting.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stream: None,
            timeout: None,
        }
    }

    /// Returns the address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns `true` if the connection is established.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sets the timeout of this socket, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    fn timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout
            .or(self.timeout)
            .unwrap_or_else(settings::timeout)
            .max(Duration::from_millis(1))
    }

    fn connect(&mut self) -> Result<&mut TcpStream> {
        if self.stream.is_none() {
            let timeout = self.timeout(None);
            debug!("rcon: connecting to {}", self.addr);
            let stream = TcpStream::connect_timeout(&self.addr, timeout)?;
            stream.set_nodelay(true)?;
            stream.set_write_timeout(Some(timeout))?;
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(Error::ConnectionDropped)
    }

    /// Closes the connection.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("rcon: disconnected from {}", self.addr);
            stream.shutdown(Shutdown::Both).ok();
        }
    }

    /// Sends a request, connecting first if needed.
    pub fn send(&mut self, request: &RconRequest) -> Result<()> {
        let mut buf = vec![0; request.body.len() + rcon::MIN_FRAME_SIZE as usize + 4];
        let n = request.encode(&mut buf)?;
        trace!("rcon {} <- {}", self.addr, Str(&buf[..n]));
        let stream = self.connect()?;
        if let Err(e) = stream.write_all(&buf[..n]) {
            self.close();
            return Err(e.into());
        }
        Ok(())
    }

    /// Receives a packet with the socket timeout.
    ///
    /// Returns `None` if the server closed the connection.
    pub fn reply(&mut self) -> Result<Option<RconPacket>> {
        self.reply_timeout(None)
    }

    /// Receives a packet with `timeout` instead of the socket timeout.
    ///
    /// A read timed out before the first byte of a frame leaves the connection
    /// open, any other error closes it.
    pub fn reply_timeout(&mut self, timeout: Option<Duration>) -> Result<Option<RconPacket>> {
        let mut consumed = 0;
        match self.read_packet(timeout, &mut consumed) {
            Ok(None) => {
                debug!("rcon: {} closed the connection", self.addr);
                self.close();
                Ok(None)
            }
            Err(Error::Timeout) if consumed == 0 => Err(Error::Timeout),
            Err(Error::Timeout) => {
                // the rest of the frame would be read as the next frame
                debug!("rcon: {} timed out after {} bytes of a frame", self.addr, consumed);
                self.close();
                Err(Error::Timeout)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
            ret => ret,
        }
    }

    fn read_packet(
        &mut self,
        timeout: Option<Duration>,
        consumed: &mut usize,
    ) -> Result<Option<RconPacket>> {
        let timeout = self.timeout(timeout);
        let stream = match self.stream {
            Some(ref mut stream) => stream,
            None => return Ok(None),
        };
        stream.set_read_timeout(Some(timeout))?;

        let mut prefix = [0; 4];
        if !read_frame(stream, &mut prefix, consumed)? {
            return Ok(None);
        }
        let mut frame = vec![0; rcon::frame_size(prefix)?];
        if !read_frame(stream, &mut frame, consumed)? {
            return Ok(None);
        }
        trace!("rcon {} -> {}", self.addr, Str(&frame[..]));
        Ok(Some(RconPacket::decode(&frame)?))
    }
}

impl Drop for RconSocket {
    fn drop(&mut self) {
        self.close();
    }
}

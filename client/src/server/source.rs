// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::net::SocketAddr;
use std::time::Duration;

use condenser_protocol::{
    rcon::{RconPacket, RconRequest, ResponseKind},
    split::Framing,
};

use super::Engine;
use crate::endpoint::Reconnect;
use crate::socket::{QuerySocket, RconSocket};
use crate::{Error, Result};

/// Source engine: UDP queries and TCP RCON on the same port.
#[derive(Debug, Default)]
pub struct Source {
    query: Option<QuerySocket>,
    rcon: Option<RconSocket>,
    request_id: i32,
    authenticated: bool,
    timeout: Option<Duration>,
}

impl Source {
    /// Returns the id of the last authentication request.
    pub fn request_id(&self) -> i32 {
        self.request_id
    }

    fn rcon(&mut self) -> Result<&mut RconSocket> {
        self.rcon.as_mut().ok_or(Error::ConnectionDropped)
    }

    /// Reads the packet which follows the mirrored terminator.
    fn read_terminator_echo(&mut self) -> Result<()> {
        match self.exec_reply() {
            Ok(packet) if packet.is_terminator_echo() => Ok(()),
            Ok(packet) => {
                debug!("rcon: expected terminator echo, got {:?}", packet);
                Ok(())
            }
            Err(Error::Timeout) => {
                debug!("rcon: no terminator echo");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reads the next packet of the current command.
    ///
    /// Any sign of a lost session clears the authenticated flag.
    fn exec_reply(&mut self) -> Result<RconPacket> {
        let id = self.request_id;
        let packet = match self.rcon()?.reply() {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                debug!("rcon: connection dropped while executing a command");
                self.authenticated = false;
                return Err(Error::RconNotAuthenticated);
            }
            Err(e) => return Err(e),
        };
        if packet.kind == ResponseKind::AuthResponse || packet.id != id {
            debug!(
                "rcon: unexpected {:?} packet with id {} (expected {})",
                packet.kind, packet.id, id
            );
            self.authenticated = false;
            // frames of the lost session are still queued
            self.rcon()?.close();
            return Err(Error::RconNotAuthenticated);
        }
        Ok(packet)
    }
}

impl Reconnect for Source {
    fn init_socket(&mut self, addr: SocketAddr) -> Result<()> {
        self.disconnect();
        let mut query = QuerySocket::connect(addr, Framing::Source)?;
        query.set_timeout(self.timeout);
        let mut rcon = RconSocket::new(addr);
        rcon.set_timeout(self.timeout);
        self.query = Some(query);
        self.rcon = Some(rcon);
        Ok(())
    }
}

impl Engine for Source {
    fn socket(&mut self) -> Option<&mut QuerySocket> {
        self.query.as_mut()
    }

    fn rcon_auth(&mut self, password: &str) -> Result<bool> {
        self.authenticated = false;
        self.request_id = fastrand::i32(0..65536);
        let id = self.request_id;

        let rcon = self.rcon()?;
        // every session starts on a new connection
        rcon.close();
        rcon.send(&RconRequest::auth(id, password))?;

        // some servers send an empty response value before the auth response
        let mut packet = rcon.reply()?.ok_or(Error::RconBan)?;
        if packet.kind == ResponseKind::ResponseValue && packet.body.is_empty() {
            packet = rcon.reply()?.ok_or(Error::RconBan)?;
        }
        if packet.kind != ResponseKind::AuthResponse {
            debug!("rcon: expected auth response, got {:?}", packet);
            return Err(Error::UnexpectedResponse);
        }

        self.authenticated = packet.id == id;
        if !self.authenticated {
            info!("rcon: authentication failed (id {})", packet.id);
        }
        Ok(self.authenticated)
    }

    fn rcon_exec(&mut self, command: &str) -> Result<String> {
        if !self.authenticated {
            return Err(Error::RconNotAuthenticated);
        }
        let id = self.request_id;
        self.rcon()?.send(&RconRequest::exec(id, command))?;

        let mut response = String::new();
        let mut terminated = false;
        loop {
            let packet = self.exec_reply()?;
            if packet.is_terminator_echo() {
                trace!("rcon: skip terminator echo");
                continue;
            }
            if packet.body.is_empty() {
                if terminated {
                    self.read_terminator_echo()?;
                }
                break;
            }
            response.push_str(&packet.body);
            if !terminated {
                // the server mirrors this request after the last packet of the response
                self.rcon()?.send(&RconRequest::terminator(id))?;
                terminated = true;
            }
        }

        Ok(response.trim().to_owned())
    }

    fn rcon_authenticated(&self) -> bool {
        self.authenticated
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        if let Some(query) = self.query.as_mut() {
            query.set_timeout(timeout);
        }
        if let Some(rcon) = self.rcon.as_mut() {
            rcon.set_timeout(timeout);
        }
    }

    fn disconnect(&mut self) {
        self.query = None;
        self.rcon = None;
        self.authenticated = false;
    }
}

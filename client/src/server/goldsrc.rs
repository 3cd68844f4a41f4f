// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::net::SocketAddr;
use std::time::Duration;

use condenser_protocol::{game::RconCommand, server::Packet, split::Framing};

use super::Engine;
use crate::endpoint::Reconnect;
use crate::socket::QuerySocket;
use crate::{Error, ProtocolError, Result};

const BAD_PASSWORD: &str = "Bad rcon_password.";
const BAD_CHALLENGE: &str = "Bad challenge.";
const BANNED: &str = "banned";

/// GoldSrc engine: UDP queries and UDP RCON with a challenge number.
#[derive(Debug, Default)]
pub struct GoldSrc {
    query: Option<QuerySocket>,
    password: Option<String>,
    challenge: Option<u32>,
    hltv: bool,
    timeout: Option<Duration>,
}

impl GoldSrc {
    /// Creates an engine for a HLTV proxy.
    ///
    /// HLTV needs a fresh RCON challenge for every command and may not answer
    /// a command at all.
    pub fn hltv() -> Self {
        Self {
            hltv: true,
            ..Self::default()
        }
    }

    /// Returns `true` if the server is a HLTV proxy.
    pub fn is_hltv(&self) -> bool {
        self.hltv
    }

    /// Returns the last RCON challenge number.
    pub fn challenge(&self) -> Option<u32> {
        self.challenge
    }

    fn query(&mut self) -> Result<&mut QuerySocket> {
        self.query.as_mut().ok_or(Error::ConnectionDropped)
    }

    fn rcon_reply(&mut self) -> Result<String> {
        match self.query()?.reply()? {
            Packet::RconResponse(text) => Ok(text),
            packet => {
                debug!("rcon: expected a text response, got {:?}", packet);
                Err(Error::UnexpectedResponse)
            }
        }
    }

    /// Fetches a new RCON challenge number.
    pub fn rcon_challenge(&mut self) -> Result<u32> {
        self.query()?.send(&RconCommand::Challenge)?;
        let text = self.rcon_reply()?;
        if text.contains(BANNED) {
            return Err(Error::RconBan);
        }
        let challenge = text
            .trim_end()
            .rsplit(' ')
            .next()
            .and_then(|i| i.parse().ok())
            .ok_or(Error::PacketFormat(ProtocolError::InvalidPacket))?;
        trace!("rcon: challenge {}", challenge);
        self.challenge = Some(challenge);
        Ok(challenge)
    }

    fn check_reply(&mut self, text: &str) -> Result<()> {
        if text.contains(BANNED) {
            return Err(Error::RconBan);
        }
        if text.starts_with(BAD_PASSWORD) {
            self.password = None;
            return Err(Error::RconNotAuthenticated);
        }
        Ok(())
    }
}

impl Reconnect for GoldSrc {
    fn init_socket(&mut self, addr: SocketAddr) -> Result<()> {
        self.disconnect();
        let mut query = QuerySocket::connect(addr, Framing::GoldSrc)?;
        query.set_timeout(self.timeout);
        self.query = Some(query);
        Ok(())
    }
}

impl Engine for GoldSrc {
    fn socket(&mut self) -> Option<&mut QuerySocket> {
        self.query.as_mut()
    }

    /// Stores the password, it is checked by the first command.
    fn rcon_auth(&mut self, password: &str) -> Result<bool> {
        self.password = Some(password.to_owned());
        Ok(true)
    }

    fn rcon_exec(&mut self, command: &str) -> Result<String> {
        let password = self.password.clone().ok_or(Error::RconNotAuthenticated)?;
        let mut retry = true;
        loop {
            let challenge = match self.challenge {
                Some(challenge) if !self.hltv => challenge,
                _ => self.rcon_challenge()?,
            };
            self.query()?.send(&RconCommand::Exec {
                challenge,
                password: &password,
                command,
            })?;

            let first = match self.rcon_reply() {
                Ok(text) => text,
                Err(Error::Timeout) if self.hltv => {
                    debug!("rcon: no response from HLTV");
                    String::new()
                }
                Err(e) => return Err(e),
            };
            if retry && first.starts_with(BAD_CHALLENGE) {
                info!("rcon: challenge {} expired", challenge);
                self.challenge = None;
                retry = false;
                continue;
            }
            self.check_reply(&first)?;
            if first.is_empty() {
                return Ok(first);
            }

            // an empty command marks the end of a long response
            self.query()?.send(&RconCommand::Continue {
                challenge,
                password: &password,
            })?;
            let mut parts = vec![first];
            loop {
                match self.rcon_reply() {
                    Ok(text) if text.is_empty() => break,
                    Ok(text) => parts.push(text),
                    Err(Error::Timeout) => break,
                    Err(e) => return Err(e),
                }
            }
            return Ok(parts.join(" "));
        }
    }

    fn rcon_authenticated(&self) -> bool {
        self.password.is_some()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        if let Some(query) = self.query.as_mut() {
            query.set_timeout(timeout);
        }
    }

    fn disconnect(&mut self) {
        self.query = None;
        self.password = None;
        self.challenge = None;
    }
}

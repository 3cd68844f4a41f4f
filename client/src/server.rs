// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Game server client.

mod goldsrc;
mod source;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use condenser_protocol::{
    game::{InfoRequest, PlayerRequest, RulesRequest, NO_CHALLENGE},
    player::{self, Player},
    server::Rules,
    ServerInfo,
};

use crate::cache::{Category, ServerCache};
use crate::endpoint::{Connection, Endpoint, Reconnect, GAME_PORT};
use crate::socket::QuerySocket;
use crate::{Error, Result};

pub use self::goldsrc::GoldSrc;
pub use self::source::Source;

/// Engine specific sockets and RCON protocol.
pub trait Engine: Reconnect {
    /// Returns the query socket, `None` if disconnected.
    fn socket(&mut self) -> Option<&mut QuerySocket>;

    /// Authenticates with an RCON password.
    fn rcon_auth(&mut self, password: &str) -> Result<bool>;

    /// Executes an RCON command and returns its output.
    fn rcon_exec(&mut self, command: &str) -> Result<String>;

    /// Returns `true` if RCON commands can be executed.
    fn rcon_authenticated(&self) -> bool;

    /// Sets the timeout of all sockets, `None` to use the process-wide timeout.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    /// Releases all sockets and the RCON session.
    fn disconnect(&mut self);
}

/// A Source engine server.
pub type SourceServer = GameServer<Source>;
/// A GoldSrc engine server.
pub type GoldSrcServer = GameServer<GoldSrc>;

/// A game server client with cached responses.
#[derive(Debug)]
pub struct GameServer<E> {
    conn: Connection<E>,
    cache: ServerCache,
}

impl<E: Engine + Default> GameServer<E> {
    /// Resolves `address` and connects to the first address.
    ///
    /// The port defaults to [`GAME_PORT`].
    pub fn new(address: &str) -> Result<Self> {
        Self::with_engine(address, E::default())
    }
}

impl GameServer<GoldSrc> {
    /// Creates a client for a HLTV proxy.
    pub fn hltv(address: &str) -> Result<Self> {
        Self::with_engine(address, GoldSrc::hltv())
    }
}

impl<E: Engine> GameServer<E> {
    /// Resolves `address` and connects `engine` to the first address.
    pub fn with_engine(address: &str, engine: E) -> Result<Self> {
        Self::from_endpoint(Endpoint::resolve(address, GAME_PORT)?, engine)
    }

    /// Connects `engine` to the active address of `endpoint`.
    pub fn from_endpoint(endpoint: Endpoint, engine: E) -> Result<Self> {
        Ok(Self {
            conn: Connection::new(endpoint, engine)?,
            cache: ServerCache::default(),
        })
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        self.conn.endpoint()
    }

    /// Returns the active address.
    pub fn addr(&self) -> SocketAddr {
        self.conn.addr()
    }

    /// Returns the engine.
    pub fn engine(&self) -> &E {
        self.conn.get_ref()
    }

    /// Returns cached responses.
    pub fn cache(&self) -> &ServerCache {
        &self.cache
    }

    /// Sets the timeout of this server, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.conn.get_mut().set_timeout(timeout);
    }

    /// Connects to the next resolved address.
    ///
    /// The cache is cleared. Returns `true` if the first address is active again.
    pub fn rotate(&mut self) -> Result<bool> {
        self.cache.clear();
        self.conn.rotate()
    }

    /// Releases all sockets and the RCON session.
    ///
    /// The next query connects again.
    pub fn disconnect(&mut self) {
        self.conn.get_mut().disconnect();
    }

    /// Drops all cached responses.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn socket(&mut self) -> Result<&mut QuerySocket> {
        if self.conn.get_mut().socket().is_none() {
            self.conn.reconnect()?;
        }
        self.conn
            .get_mut()
            .socket()
            .ok_or(Error::ConnectionDropped)
    }

    /// Sends a request of `category` and caches responses.
    ///
    /// A response of another kind is cached too and the request is sent once
    /// more, with a fresh challenge number if the server sent one.
    fn request(&mut self, category: Category) -> Result<()> {
        let mut repeated = false;
        loop {
            let challenge = self.cache.challenge().unwrap_or(NO_CHALLENGE);
            let info_challenge = if repeated {
                self.cache.challenge()
            } else {
                None
            };
            let socket = self.socket()?;
            match category {
                Category::Ping | Category::Info => {
                    socket.send(&InfoRequest::new(info_challenge))?
                }
                Category::Challenge => socket.send(&PlayerRequest::default())?,
                Category::Players => socket.send(&PlayerRequest::new(challenge))?,
                Category::Rules => socket.send(&RulesRequest::new(challenge))?,
            }
            let packet = socket.reply()?;

            match self.cache.store(packet) {
                Some(stored) if stored == category => return Ok(()),
                stored if !repeated => {
                    debug!(
                        "{}: expected {:?} response, got {:?}",
                        self.addr(),
                        category,
                        stored
                    );
                    repeated = true;
                }
                _ => return Err(Error::UnexpectedResponse),
            }
        }
    }

    /// Measures the round trip time of an info request.
    pub fn update_ping(&mut self) -> Result<Duration> {
        let socket = self.socket()?;
        let start = Instant::now();
        socket.send(&InfoRequest::default())?;
        let packet = socket.reply()?;
        let ping = start.elapsed();
        self.cache.store(packet);
        self.cache.set_ping(ping);
        Ok(ping)
    }

    /// Fetches a challenge number for player and rules requests.
    pub fn update_challenge_number(&mut self) -> Result<()> {
        self.request(Category::Challenge)
    }

    /// Fetches server information.
    pub fn update_server_info(&mut self) -> Result<()> {
        self.request(Category::Info)
    }

    /// Fetches server rules.
    pub fn update_rules(&mut self) -> Result<()> {
        self.request(Category::Rules)
    }

    /// Fetches the player list.
    ///
    /// With `rcon_password` players are extended with the output of the RCON
    /// `status` command.
    pub fn update_players(&mut self, rcon_password: Option<&str>) -> Result<()> {
        self.request(Category::Players)?;

        let password = match rcon_password {
            Some(password) => password,
            None => return Ok(()),
        };
        if self.cache.players().map_or(true, |i| i.is_empty()) {
            return Ok(());
        }
        if !self.rcon_authenticated() && !self.rcon_auth(password)? {
            return Err(Error::RconNotAuthenticated);
        }
        let status = self.rcon_exec("status")?;
        if let Some(players) = self.cache.players_mut() {
            let count = player::add_status(players, &status);
            debug!("{}: extended {} players", self.addr(), count);
        }
        Ok(())
    }

    /// Measures ping, fetches server information and a challenge number.
    pub fn initialize(&mut self) -> Result<()> {
        self.update_ping()?;
        self.update_server_info()?;
        self.update_challenge_number()
    }

    /// Returns the cached round trip time, measuring it first if needed.
    pub fn ping(&mut self) -> Result<Duration> {
        match self.cache.ping() {
            Some(ping) => Ok(ping),
            None => self.update_ping(),
        }
    }

    /// Returns cached server information, fetching it first if needed.
    pub fn server_info(&mut self) -> Result<&ServerInfo> {
        if self.cache.info().is_none() {
            self.update_server_info()?;
        }
        self.cache.info().ok_or(Error::UnexpectedResponse)
    }

    /// Returns cached server rules, fetching them first if needed.
    pub fn rules(&mut self) -> Result<&Rules> {
        if self.cache.rules().is_none() {
            self.update_rules()?;
        }
        self.cache.rules().ok_or(Error::UnexpectedResponse)
    }

    /// Returns the cached player list, fetching it first if needed.
    pub fn players(&mut self) -> Result<&[Player]> {
        if self.cache.players().is_none() {
            self.update_players(None)?;
        }
        self.cache.players().ok_or(Error::UnexpectedResponse)
    }

    /// Authenticates with an RCON password.
    pub fn rcon_auth(&mut self, password: &str) -> Result<bool> {
        // reconnects after disconnect
        self.socket()?;
        self.conn.get_mut().rcon_auth(password)
    }

    /// Executes an RCON command.
    pub fn rcon_exec(&mut self, command: &str) -> Result<String> {
        self.conn.get_mut().rcon_exec(command)
    }

    /// Returns `true` if RCON commands can be executed.
    pub fn rcon_authenticated(&self) -> bool {
        self.conn.get_ref().rcon_authenticated()
    }
}

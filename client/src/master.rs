// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Master server client.

use std::fmt;
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use condenser_protocol::{game::QueryServers, master::SENTINEL, server::Region};

use crate::endpoint::{Connection, Endpoint, Reconnect, MASTER_PORT};
use crate::socket::MasterSocket;
use crate::{settings, Error, Result};

pub use condenser_protocol::master::{GOLDSRC_MASTER, SOURCE_MASTER};

#[derive(Debug, Default)]
struct Sockets {
    sock: Option<MasterSocket>,
    timeout: Option<Duration>,
}

impl Reconnect for Sockets {
    fn init_socket(&mut self, addr: SocketAddr) -> Result<()> {
        self.sock = None;
        let mut sock = MasterSocket::connect(addr)?;
        sock.set_timeout(self.timeout);
        self.sock = Some(sock);
        Ok(())
    }
}

/// Result of a single page request.
enum Page {
    /// The last page was received.
    End,
    /// New servers were received.
    More,
    /// Nothing new was received.
    Stalled,
}

/// A master server client.
#[derive(Debug)]
pub struct MasterServer {
    conn: Connection<Sockets>,
    retries: Option<u32>,
}

impl MasterServer {
    /// Resolves `address` and connects to the first address.
    ///
    /// The port defaults to [`MASTER_PORT`].
    pub fn new(address: &str) -> Result<Self> {
        Self::from_endpoint(Endpoint::resolve(address, MASTER_PORT)?)
    }

    /// Connects to the active address of `endpoint`.
    ///
    /// Other addresses of the endpoint are used for failover.
    pub fn from_endpoint(endpoint: Endpoint) -> Result<Self> {
        Ok(Self {
            conn: Connection::new(endpoint, Sockets::default())?,
            retries: None,
        })
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        self.conn.endpoint()
    }

    /// Sets the timeout of this master, `None` to use the process-wide timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        let sockets = self.conn.get_mut();
        sockets.timeout = timeout;
        if let Some(sock) = sockets.sock.as_mut() {
            sock.set_timeout(timeout);
        }
    }

    /// Sets the number of attempts per page, `None` to use the process-wide value.
    pub fn set_retries(&mut self, retries: Option<u32>) {
        self.retries = retries.map(|i| i.max(1));
    }

    /// Returns the number of attempts per page.
    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or_else(settings::retries)
    }

    fn query_page<T: fmt::Display>(
        &mut self,
        region: Region,
        filter: T,
        last: &mut SocketAddrV4,
        servers: &mut Vec<SocketAddrV4>,
    ) -> Result<Page> {
        if self.conn.get_mut().sock.is_none() {
            self.conn.reconnect()?;
        }
        let sock = self
            .conn
            .get_mut()
            .sock
            .as_mut()
            .ok_or(Error::ConnectionDropped)?;
        sock.send(&QueryServers {
            region,
            last: *last,
            filter,
        })?;
        let page = sock.reply()?;

        let mut ret = Page::Stalled;
        for (i, addr) in page.into_iter().enumerate() {
            if addr == SENTINEL {
                return Ok(Page::End);
            }
            if i == 0 && addr == *last {
                // the page starts with the last address of the previous page
                continue;
            }
            servers.push(addr);
            *last = addr;
            ret = Page::More;
        }
        Ok(ret)
    }

    /// Fetches addresses of game servers in `region` matching `filter`.
    ///
    /// Every page is requested up to [`retries`](Self::retries) times. If
    /// `force_retry` is `true` the next address of the endpoint is tried when
    /// attempts are exhausted, otherwise discovery fails. Discovery fails
    /// with [`Error::DiscoveryExhausted`] after all addresses were tried.
    pub fn get_servers<T: fmt::Display>(
        &mut self,
        region: Region,
        filter: T,
        force_retry: bool,
    ) -> Result<Vec<SocketAddrV4>> {
        let retries = self.retries();
        let mut servers = Vec::new();
        let mut last = SENTINEL;
        let mut failed = 0;
        let mut total_failed = 0;

        loop {
            match self.query_page(region, &filter, &mut last, &mut servers) {
                Ok(Page::End) => {
                    debug!(
                        "{}: received {} servers",
                        self.conn.endpoint(),
                        servers.len()
                    );
                    return Ok(servers);
                }
                Ok(Page::More) => {
                    failed = 0;
                    continue;
                }
                Ok(Page::Stalled) => {
                    debug!("{}: no new servers after {}", self.conn.endpoint(), last);
                }
                Err(e) if e.is_transport() => {
                    debug!("{}: {}", self.conn.endpoint(), e);
                }
                Err(e) => return Err(e),
            }

            failed += 1;
            total_failed += 1;
            if failed < retries {
                info!(
                    "{}: retrying page after {} ({}/{})",
                    self.conn.endpoint(),
                    last,
                    failed,
                    retries
                );
                continue;
            }

            if force_retry && !self.conn.rotate()? {
                failed = 0;
                continue;
            }

            return Err(Error::DiscoveryExhausted {
                retries: total_failed,
                servers,
            });
        }
    }
}

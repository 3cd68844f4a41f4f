// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::{Error, Result};

/// Default port of game servers.
pub const GAME_PORT: u16 = 27015;
/// Default port of master servers.
pub const MASTER_PORT: u16 = 27011;

/// Splits `host:port`, `[v6]:port` or a bare host.
fn split_host(address: &str, default_port: u16) -> Option<(&str, u16)> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, rest) = rest.split_once(']')?;
        return match rest.strip_prefix(':') {
            Some(port) => Some((host, port.parse().ok()?)),
            None if rest.is_empty() => Some((host, default_port)),
            None => None,
        };
    }

    match address.split_once(':') {
        // more than one colon is a bare IPv6 address
        Some((host, port)) if !port.contains(':') => Some((host, port.parse().ok()?)),
        _ => Some((address, default_port)),
    }
}

/// Resolved addresses of a host.
///
/// Exactly one address is active at a time.
#[derive(Clone, Debug)]
pub struct Endpoint {
    host: String,
    addrs: Vec<SocketAddr>,
    active: usize,
}

impl Endpoint {
    /// Resolves all addresses of `address`.
    ///
    /// `default_port` is used if the address has no port.
    pub fn resolve(address: &str, default_port: u16) -> Result<Self> {
        Self::resolve_all([address], default_port)
    }

    /// Resolves all addresses of every host in `list`.
    pub fn resolve_all<'a, I>(list: I, default_port: u16) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut hosts = Vec::new();
        let mut addrs = Vec::new();
        for address in list {
            let (host, port) =
                split_host(address, default_port).ok_or_else(|| no_address(address))?;
            match (host, port).to_socket_addrs() {
                Ok(iter) => {
                    for addr in iter {
                        if !addrs.contains(&addr) {
                            addrs.push(addr);
                        }
                    }
                }
                Err(e) => debug!("failed to resolve \"{}\": {}", address, e),
            }
            hosts.push(address);
        }
        Self::new(hosts.join(","), addrs)
    }

    /// Creates an endpoint from already resolved addresses.
    pub fn new(host: impl Into<String>, addrs: Vec<SocketAddr>) -> Result<Self> {
        let host = host.into();
        if addrs.is_empty() {
            return Err(Error::NoAddress(host));
        }
        trace!("{} resolved to {:?}", host, addrs);
        Ok(Self {
            host,
            addrs,
            active: 0,
        })
    }

    /// Returns the host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns all resolved addresses.
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Returns the active address.
    pub fn active(&self) -> SocketAddr {
        self.addrs[self.active]
    }

    /// Makes the next address active.
    ///
    /// Returns `true` if the first address is active again.
    pub fn rotate(&mut self) -> bool {
        self.active = (self.active + 1) % self.addrs.len();
        self.active == 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} ({})", self.host, self.active())
    }
}

fn no_address(address: &str) -> Error {
    Error::NoAddress(address.to_owned())
}

/// Owner of sockets connected to an [`Endpoint`].
pub trait Reconnect {
    /// Drops current sockets and connects new ones to `addr`.
    fn init_socket(&mut self, addr: SocketAddr) -> Result<()>;
}

/// Sockets of `T` connected to the active address of an endpoint.
#[derive(Debug)]
pub struct Connection<T> {
    endpoint: Endpoint,
    inner: T,
}

impl<T: Reconnect> Connection<T> {
    /// Connects `inner` to the active address of `endpoint`.
    pub fn new(endpoint: Endpoint, mut inner: T) -> Result<Self> {
        inner.init_socket(endpoint.active())?;
        Ok(Self { endpoint, inner })
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the active address.
    pub fn addr(&self) -> SocketAddr {
        self.endpoint.active()
    }

    /// Returns a reference to the socket owner.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Returns a mutable reference to the socket owner.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Reconnects to the active address.
    pub fn reconnect(&mut self) -> Result<()> {
        self.inner.init_socket(self.endpoint.active())
    }

    /// Reconnects to the next address.
    ///
    /// Returns `true` if rotation wrapped back to the first address.
    pub fn rotate(&mut self) -> Result<bool> {
        let wrapped = self.endpoint.rotate();
        info!("switching to {}", self.endpoint);
        self.inner.init_socket(self.endpoint.active())?;
        Ok(wrapped)
    }
}

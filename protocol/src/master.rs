// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Master server packets.

use std::net::{Ipv4Addr, SocketAddrV4};

use super::cursor::{Cursor, CursorMut};
use super::Error;

/// Address which starts and ends a list of game servers.
pub const SENTINEL: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);

/// Well-known GoldSrc master server.
pub const GOLDSRC_MASTER: &str = "hl1master.steampowered.com:27011";
/// Well-known Source master server.
pub const SOURCE_MASTER: &str = "hl2master.steampowered.com:27011";

/// A page of game server addresses.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryServersResponse<I> {
    inner: I,
}

impl QueryServersResponse<()> {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xfff\n";
}

impl<'a> QueryServersResponse<&'a [u8]> {
    /// Decode packet from `src`.
    pub fn decode(src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(QueryServersResponse::HEADER)?;
        if cur.remaining() % 6 != 0 {
            return Err(Error::InvalidPacket);
        }
        let inner = cur.get_bytes(cur.remaining())?;
        Ok(Self { inner })
    }

    /// Iterator over game server addresses.
    ///
    /// The last address of the list is [`SENTINEL`], it is not skipped.
    pub fn iter(&self) -> impl 'a + Iterator<Item = SocketAddrV4> {
        self.inner.chunks_exact(6).map(|i| {
            let ip = Ipv4Addr::new(i[0], i[1], i[2], i[3]);
            let port = u16::from_be_bytes([i[4], i[5]]);
            SocketAddrV4::new(ip, port)
        })
    }

    /// Returns `true` if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<I> QueryServersResponse<I>
where
    I: Iterator<Item = SocketAddrV4>,
{
    /// Creates a new `QueryServersResponse`.
    pub fn new(iter: I) -> Self {
        Self { inner: iter }
    }

    /// Encode packet to `buf`.
    ///
    /// If `buf` has not enougth size to hold all addresses the method must be called
    /// multiple times until the end flag equals `true`. The sentinel is written
    /// only into the last page.
    ///
    /// Returns how many bytes was written in `buf` and the end flag.
    pub fn encode(&mut self, buf: &mut [u8]) -> Result<(usize, bool), Error> {
        let mut cur = CursorMut::new(buf);
        cur.put_bytes(QueryServersResponse::HEADER)?;
        let mut is_end = false;
        while cur.available() >= 12 {
            match self.inner.next() {
                Some(i) => {
                    cur.put_array(&i.ip().octets())?.put_u16_be(i.port())?;
                }
                None => {
                    is_end = true;
                    break;
                }
            }
        }
        if is_end {
            cur.put_array(&SENTINEL.ip().octets())?
                .put_u16_be(SENTINEL.port())?;
        }
        Ok((cur.pos(), is_end))
    }
}

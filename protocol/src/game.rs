// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Game client packets.

use std::fmt;
use std::net::SocketAddrV4;

use crate::cursor::{Cursor, CursorMut};
use crate::server::Region;
use crate::Error;

/// Challenge number used to ask a server for a fresh challenge.
pub const NO_CHALLENGE: i32 = -1;

/// `A2S_INFO` request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoRequest {
    /// Challenge sent by servers that require one for info requests.
    pub challenge: Option<i32>,
}

impl InfoRequest {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xffTSource Engine Query\0";

    /// Creates a new `InfoRequest`.
    pub fn new(challenge: Option<i32>) -> Self {
        Self { challenge }
    }

    /// Decode packet from `src`.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;
        let challenge = if cur.has_remaining() {
            Some(cur.get_i32_le()?)
        } else {
            None
        };
        cur.expect_empty()?;
        Ok(Self { challenge })
    }

    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put_bytes(Self::HEADER)?;
        if let Some(challenge) = self.challenge {
            cur.put_i32_le(challenge)?;
        }
        Ok(cur.pos())
    }
}

macro_rules! challenge_request {
    ($(#[$attr:meta])* $name:ident = $header:expr) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            /// Challenge number, `-1` to request one.
            pub challenge: i32,
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(NO_CHALLENGE)
            }
        }

        impl $name {
            /// Packet header.
            pub const HEADER: &'static [u8] = $header;

            /// Creates a new request.
            pub fn new(challenge: i32) -> Self {
                Self { challenge }
            }

            /// Decode packet from `src`.
            pub fn decode(src: &[u8]) -> Result<Self, Error> {
                let mut cur = Cursor::new(src);
                cur.expect(Self::HEADER)?;
                let challenge = cur.get_i32_le()?;
                cur.expect_empty()?;
                Ok(Self { challenge })
            }

            /// Encode packet to `buf`.
            pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                Ok(CursorMut::new(buf)
                    .put_bytes(Self::HEADER)?
                    .put_i32_le(self.challenge)?
                    .pos())
            }
        }
    };
}

challenge_request! {
    /// `A2S_PLAYER` request.
    ///
    /// Also used to fetch a challenge number.
    PlayerRequest = b"\xff\xff\xff\xffU"
}

challenge_request! {
    /// `A2S_RULES` request.
    RulesRequest = b"\xff\xff\xff\xffV"
}

/// GoldSrc RCON command sent in a query datagram.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RconCommand<'a> {
    /// Ask for an RCON challenge number.
    Challenge,
    /// Execute a command.
    Exec {
        /// RCON challenge number.
        challenge: u32,
        /// RCON password.
        password: &'a str,
        /// Command line.
        command: &'a str,
    },
    /// Ask for the next part of a long response.
    Continue {
        /// RCON challenge number.
        challenge: u32,
        /// RCON password.
        password: &'a str,
    },
}

impl<'a> RconCommand<'a> {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xff";

    const CHALLENGE: &'static str = "challenge rcon";

    /// Decode packet from `src`.
    pub fn decode(src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;
        let line = cur.get_str(cur.remaining())?;
        if line == Self::CHALLENGE {
            return Ok(Self::Challenge);
        }

        let rest = line.strip_prefix("rcon ").ok_or(Error::InvalidPacket)?;
        let (challenge, rest) = rest.split_once(' ').ok_or(Error::InvalidPacket)?;
        let challenge = challenge.parse().map_err(|_| Error::InvalidPacket)?;
        Ok(match rest.split_once(' ') {
            Some((password, command)) => Self::Exec {
                challenge,
                password,
                command,
            },
            None => Self::Continue {
                challenge,
                password: rest,
            },
        })
    }

    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put_bytes(Self::HEADER)?;
        match self {
            Self::Challenge => cur.put_str(Self::CHALLENGE)?,
            Self::Exec {
                challenge,
                password,
                command,
            } => cur
                .put_str("rcon ")?
                .put_as_str(challenge)?
                .put_u8(b' ')?
                .put_str(password)?
                .put_u8(b' ')?
                .put_str(command)?,
            Self::Continue {
                challenge,
                password,
            } => cur
                .put_str("rcon ")?
                .put_as_str(challenge)?
                .put_u8(b' ')?
                .put_str(password)?,
        };
        Ok(cur.pos())
    }
}

/// Master server request for a page of game server addresses.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryServers<T> {
    /// Region of servers.
    pub region: Region,
    /// Last address of the previous page, `0.0.0.0:0` for the first page.
    pub last: SocketAddrV4,
    /// Filter string.
    pub filter: T,
}

impl QueryServers<()> {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"1";
}

impl<'a> QueryServers<&'a str> {
    /// Decode packet from `src`.
    pub fn decode(src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(QueryServers::HEADER)?;
        let region = cur.get_u8()?.try_into()?;
        let last = cur.get_cstr_as_str()?;
        let filter = match cur.get_bytes(cur.remaining())? {
            // some clients may have bug and filter will be with zero at the end
            [x @ .., 0] => x,
            x => x,
        };
        Ok(Self {
            region,
            last: last.parse().map_err(|_| Error::InvalidPacket)?,
            filter: std::str::from_utf8(filter).map_err(|_| Error::InvalidPacket)?,
        })
    }
}

impl<T: fmt::Display> QueryServers<T> {
    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        Ok(CursorMut::new(buf)
            .put_bytes(QueryServers::HEADER)?
            .put_u8(self.region as u8)?
            .put_as_str(self.last)?
            .put_u8(0)?
            .put_as_str(&self.filter)?
            .put_u8(0)?
            .pos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterFlags};
    use std::net::Ipv4Addr;

    #[test]
    fn info_request() {
        let mut buf = [0; 64];
        let n = InfoRequest::new(None).encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\xff\xff\xff\xffTSource Engine Query\0");

        let p = InfoRequest::new(Some(0x0badf00d));
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(InfoRequest::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn player_request() {
        let mut buf = [0; 64];
        let n = PlayerRequest::default().encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\xff\xff\xff\xffU\xff\xff\xff\xff");

        let p = PlayerRequest::new(0x12345678);
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\xff\xff\xff\xffU\x78\x56\x34\x12");
        assert_eq!(PlayerRequest::decode(&buf[..n]), Ok(p));
        assert!(RulesRequest::decode(&buf[..n]).is_err());
    }

    #[test]
    fn rules_request() {
        let p = RulesRequest::new(42);
        let mut buf = [0; 64];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(RulesRequest::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn rcon_command() {
        let mut buf = [0; 128];

        let n = RconCommand::Challenge.encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\xff\xff\xff\xffchallenge rcon");

        let p = RconCommand::Exec {
            challenge: 1234567890,
            password: "secret",
            command: "kick \"some player\"",
        };
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            b"\xff\xff\xff\xffrcon 1234567890 secret kick \"some player\""
        );
        assert_eq!(RconCommand::decode(&buf[..n]), Ok(p));

        let p = RconCommand::Continue {
            challenge: 1,
            password: "secret",
        };
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(RconCommand::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn query_servers() {
        let p = QueryServers {
            region: Region::Europe,
            last: SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 27015),
            filter: "\\gamedir\\cstrike\\secure\\1",
        };
        let mut buf = [0; 512];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            &b"1\x031.2.3.4:27015\0\\gamedir\\cstrike\\secure\\1\0"[..]
        );
        assert_eq!(QueryServers::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn query_servers_with_filter() {
        let filter = Filter::new()
            .gamedir("valve")
            .flag(FilterFlags::DEDICATED, true);
        let p = QueryServers {
            region: Region::RestOfTheWorld,
            last: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            filter: &filter,
        };
        let mut buf = [0; 512];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            &b"1\xff0.0.0.0:0\0\\gamedir\\valve\\dedicated\\1\0"[..]
        );
    }

    #[test]
    fn query_servers_filter_bug() {
        let p = QueryServers {
            region: Region::RestOfTheWorld,
            last: SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), 0),
            filter: "\\appid\\240\\napp\\500",
        };

        let s = b"1\xff0.0.0.0:0\x00\\appid\\240\\napp\\500\0";
        assert_eq!(QueryServers::decode(s), Ok(p.clone()));

        let s = b"1\xff0.0.0.0:0\x00\\appid\\240\\napp\\500";
        assert_eq!(QueryServers::decode(s), Ok(p));
    }

    #[test]
    fn query_servers_bad_region() {
        let s = b"1\x090.0.0.0:0\0\0";
        assert_eq!(QueryServers::decode(s), Err(Error::InvalidRegion));
    }
}

// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Source RCON packets.
//!
//! Every packet is prefixed with its size. The size counts the id, the type,
//! the body and two terminating zeros.

use crate::cursor::{Cursor, CursorMut};
use crate::Error;

/// `SERVERDATA_AUTH`.
pub const SERVERDATA_AUTH: i32 = 3;
/// `SERVERDATA_EXECCOMMAND`.
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
/// `SERVERDATA_AUTH_RESPONSE`.
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
/// `SERVERDATA_RESPONSE_VALUE`.
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Smallest frame: id, type and an empty body.
pub const MIN_FRAME_SIZE: i32 = 10;
/// Largest accepted frame.
pub const MAX_FRAME_SIZE: i32 = 65536;

/// Body of the packet sent by servers after mirroring the terminator request.
pub const TERMINATOR_ECHO: &[u8] = b"\x00\x01\x00\x00";

/// Id of a failed authentication.
pub const AUTH_FAILED: i32 = -1;

/// Checks the size prefix of a frame.
///
/// Returns how many bytes follow the prefix.
pub fn frame_size(prefix: [u8; 4]) -> Result<usize, Error> {
    let size = i32::from_le_bytes(prefix);
    if (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&size) {
        Ok(size as usize)
    } else {
        Err(Error::InvalidRconFrame(size))
    }
}

fn encode_frame(id: i32, kind: i32, body: &[u8], buf: &mut [u8]) -> Result<usize, Error> {
    let size = body.len() + MIN_FRAME_SIZE as usize;
    if size > MAX_FRAME_SIZE as usize {
        return Err(Error::InvalidRconFrame(size as i32));
    }
    Ok(CursorMut::new(buf)
        .put_i32_le(size as i32)?
        .put_i32_le(id)?
        .put_i32_le(kind)?
        .put_bytes(body)?
        .put_array(&[0, 0])?
        .pos())
}

/// A packet sent by a client.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RconRequest<'a> {
    /// Request id echoed by the server.
    pub id: i32,
    /// Packet type.
    pub kind: i32,
    /// Password or command.
    pub body: &'a str,
}

impl<'a> RconRequest<'a> {
    /// Creates an authentication request.
    pub fn auth(id: i32, password: &'a str) -> Self {
        Self {
            id,
            kind: SERVERDATA_AUTH,
            body: password,
        }
    }

    /// Creates a command request.
    pub fn exec(id: i32, command: &'a str) -> Self {
        Self {
            id,
            kind: SERVERDATA_EXECCOMMAND,
            body: command,
        }
    }

    /// Creates an empty request which marks the end of a command response.
    pub fn terminator(id: i32) -> Self {
        Self {
            id,
            kind: SERVERDATA_RESPONSE_VALUE,
            body: "",
        }
    }

    /// Decode packet from `src` including the size prefix.
    pub fn decode(src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        let size = frame_size(cur.get_array()?)?;
        if size != cur.remaining() {
            return Err(Error::InvalidPacket);
        }
        let id = cur.get_i32_le()?;
        let kind = cur.get_i32_le()?;
        let body = cur.get_cstr_as_str()?;
        cur.expect(b"\0")?;
        cur.expect_empty()?;
        Ok(Self { id, kind, body })
    }

    /// Encode packet to `buf` including the size prefix.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        encode_frame(self.id, self.kind, self.body.as_bytes(), buf)
    }
}

/// Type of a packet sent by a server.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// `SERVERDATA_RESPONSE_VALUE`.
    ResponseValue,
    /// `SERVERDATA_AUTH_RESPONSE`.
    AuthResponse,
}

impl TryFrom<i32> for ResponseKind {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            SERVERDATA_RESPONSE_VALUE => Ok(Self::ResponseValue),
            SERVERDATA_AUTH_RESPONSE => Ok(Self::AuthResponse),
            _ => Err(Error::InvalidPacket),
        }
    }
}

impl From<ResponseKind> for i32 {
    fn from(value: ResponseKind) -> Self {
        match value {
            ResponseKind::ResponseValue => SERVERDATA_RESPONSE_VALUE,
            ResponseKind::AuthResponse => SERVERDATA_AUTH_RESPONSE,
        }
    }
}

/// A packet sent by a server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RconPacket {
    /// Id of the request, `-1` if authentication failed.
    pub id: i32,
    /// Packet type.
    pub kind: ResponseKind,
    /// Text of the packet.
    pub body: String,
    echo: bool,
}

impl RconPacket {
    /// Creates a new `RconPacket`.
    pub fn new(id: i32, kind: ResponseKind, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
            echo: false,
        }
    }

    /// Returns `true` if the packet is the trailing packet of a mirrored terminator.
    pub fn is_terminator_echo(&self) -> bool {
        self.echo
    }

    /// Decode packet from a frame without the size prefix.
    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(frame);
        let id = cur.get_i32_le()?;
        let kind = ResponseKind::try_from(cur.get_i32_le()?)?;
        let raw = cur.end();
        if raw.len() < 2 {
            return Err(Error::InvalidPacket);
        }
        let text = match raw.iter().position(|&c| c == 0) {
            Some(end) => &raw[..end],
            None => return Err(Error::InvalidPacket),
        };
        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(text).into_owned(),
            echo: text.is_empty() && raw.contains(&1),
        })
    }

    /// Encode packet to `buf` including the size prefix.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = if self.echo {
            TERMINATOR_ECHO
        } else {
            self.body.as_bytes()
        };
        encode_frame(self.id, self.kind.into(), body, buf)
    }

    /// Creates the trailing packet of a mirrored terminator.
    pub fn terminator_echo(id: i32) -> Self {
        Self {
            echo: true,
            ..Self::new(id, ResponseKind::ResponseValue, "")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_request() {
        let p = RconRequest::auth(0x1234, "secret");
        let mut buf = [0; 64];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            b"\x10\x00\x00\x00\x34\x12\x00\x00\x03\x00\x00\x00secret\0\0"
        );
        assert_eq!(RconRequest::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn exec_and_terminator() {
        let mut buf = [0; 64];
        let p = RconRequest::exec(7, "status");
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(RconRequest::decode(&buf[..n]), Ok(p));

        let n = RconRequest::terminator(7).encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..n],
            b"\x0a\x00\x00\x00\x07\x00\x00\x00\x00\x00\x00\x00\0\0"
        );
    }

    #[test]
    fn response() {
        let p = RconPacket::new(7, ResponseKind::ResponseValue, "hostname: test\n");
        let mut buf = [0; 64];
        let n = p.encode(&mut buf).unwrap();
        let size = frame_size([buf[0], buf[1], buf[2], buf[3]]).unwrap();
        assert_eq!(size, n - 4);
        let p2 = RconPacket::decode(&buf[4..n]).unwrap();
        assert_eq!(p2, p);
        assert!(!p2.is_terminator_echo());
    }

    #[test]
    fn auth_failed() {
        let s = b"\xff\xff\xff\xff\x02\x00\x00\x00\0\0";
        let p = RconPacket::decode(s).unwrap();
        assert_eq!(p.id, AUTH_FAILED);
        assert_eq!(p.kind, ResponseKind::AuthResponse);
        assert_eq!(p.body, "");
    }

    #[test]
    fn terminator_echo() {
        let mut buf = [0; 64];
        let n = RconPacket::terminator_echo(7).encode(&mut buf).unwrap();
        let p = RconPacket::decode(&buf[4..n]).unwrap();
        assert!(p.is_terminator_echo());
        assert_eq!(p.body, "");

        let n = RconPacket::new(7, ResponseKind::ResponseValue, "")
            .encode(&mut buf)
            .unwrap();
        let p = RconPacket::decode(&buf[4..n]).unwrap();
        assert!(!p.is_terminator_echo());
    }

    #[test]
    fn bad_frames() {
        assert_eq!(frame_size([9, 0, 0, 0]), Err(Error::InvalidRconFrame(9)));
        assert_eq!(
            frame_size([0xff, 0xff, 0xff, 0xff]),
            Err(Error::InvalidRconFrame(-1))
        );
        assert_eq!(frame_size([0, 0, 1, 0]), Ok(65536));
        assert!(RconPacket::decode(b"\x01\x00\x00\x00\x05\x00\x00\x00\0\0").is_err());
        assert!(RconPacket::decode(b"\x01\x00\x00\x00\x00\x00\x00\x00ab").is_err());
    }
}

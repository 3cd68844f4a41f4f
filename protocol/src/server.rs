// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Game server packets.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use log::debug;

use crate::cursor::{Cursor, CursorMut};
use crate::player::Player;
use crate::types::Str;
use crate::{Error, ServerInfo, SIMPLE_HEADER};

/// Server rules (console variables).
pub type Rules = BTreeMap<String, String>;

/// Server operating system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Os {
    /// Linux.
    Linux,
    /// Windows.
    Windows,
    /// Mac OS.
    Mac,
    /// Unknown.
    #[default]
    Unknown,
}

impl From<u8> for Os {
    fn from(value: u8) -> Self {
        // GoldSrc servers send upper case letters
        match value.to_ascii_lowercase() {
            b'l' => Os::Linux,
            b'w' => Os::Windows,
            b'm' | b'o' => Os::Mac,
            _ => Os::Unknown,
        }
    }
}

impl From<Os> for u8 {
    fn from(value: Os) -> Self {
        match value {
            Os::Linux => b'l',
            Os::Windows => b'w',
            Os::Mac => b'm',
            Os::Unknown => b'?',
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Os::Linux => "Linux",
            Os::Windows => "Windows",
            Os::Mac => "Mac",
            Os::Unknown => "Unknown",
        };
        write!(fmt, "{}", s)
    }
}

/// Type of game server.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ServerType {
    /// Dedicated server.
    Dedicated,
    /// Non-dedicated (listen) server.
    Local,
    /// SourceTV or HLTV proxy.
    Proxy,
    /// Unknown.
    #[default]
    Unknown,
}

impl From<u8> for ServerType {
    fn from(value: u8) -> Self {
        match value.to_ascii_lowercase() {
            b'd' => Self::Dedicated,
            b'l' => Self::Local,
            b'p' => Self::Proxy,
            _ => Self::Unknown,
        }
    }
}

impl From<ServerType> for u8 {
    fn from(value: ServerType) -> Self {
        match value {
            ServerType::Dedicated => b'd',
            ServerType::Local => b'l',
            ServerType::Proxy => b'p',
            ServerType::Unknown => b'?',
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use ServerType as E;

        let s = match self {
            E::Dedicated => "dedicated",
            E::Local => "local",
            E::Proxy => "proxy",
            E::Unknown => "unknown",
        };

        write!(fmt, "{}", s)
    }
}

/// Region of the world used to filter master server lists.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Region {
    /// US east coast.
    USEastCoast = 0x00,
    /// US west coast.
    USWestCoast = 0x01,
    /// South America.
    SouthAmerica = 0x02,
    /// Europe.
    Europe = 0x03,
    /// Asia.
    Asia = 0x04,
    /// Australia.
    Australia = 0x05,
    /// Middle east.
    MiddleEast = 0x06,
    /// Africa.
    Africa = 0x07,
    /// All regions.
    #[default]
    RestOfTheWorld = 0xff,
}

impl TryFrom<u8> for Region {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Region::USEastCoast),
            0x01 => Ok(Region::USWestCoast),
            0x02 => Ok(Region::SouthAmerica),
            0x03 => Ok(Region::Europe),
            0x04 => Ok(Region::Asia),
            0x05 => Ok(Region::Australia),
            0x06 => Ok(Region::MiddleEast),
            0x07 => Ok(Region::Africa),
            0xff => Ok(Region::RestOfTheWorld),
            _ => Err(Error::InvalidRegion),
        }
    }
}

bitflags! {
    /// Boolean properties of a game server.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct ServerFlags: u8 {
        /// Server is password protected.
        const PASSWORD  = 1 << 0;
        /// Server uses anti-cheat.
        const SECURE    = 1 << 1;
    }
}

/// Packet type bytes of game server responses.
pub mod kind {
    /// `S2A_INFO2`.
    pub const INFO: u8 = b'I';
    /// `S2A_INFO_DETAILED` (obsolete GoldSrc).
    pub const INFO_DETAILED: u8 = b'm';
    /// `S2A_PLAYER`.
    pub const PLAYERS: u8 = b'D';
    /// `S2A_RULES`.
    pub const RULES: u8 = b'E';
    /// `S2C_CHALLENGE`.
    pub const CHALLENGE: u8 = b'A';
    /// GoldSrc RCON response.
    pub const RCON: u8 = b'l';
    /// GoldSrc `challenge rcon` response. The byte is part of the text.
    pub const RCON_CHALLENGE: u8 = b'c';
    /// `S2A_LOGSTRING`.
    pub const LOG_STRING: u8 = b'R';
}

/// A response of a game server.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Server information.
    Info(ServerInfo),
    /// List of players.
    Players(Vec<Player>),
    /// Server rules.
    Rules(Rules),
    /// Challenge number for the next request.
    Challenge(i32),
    /// Text of a GoldSrc RCON response.
    RconResponse(String),
    /// Unsolicited log line.
    LogString(String),
}

fn decode_players(cur: &mut Cursor) -> Result<Vec<Player>, Error> {
    let count = cur.get_u8()?;
    let mut players = Vec::with_capacity(count as usize);
    while cur.has_remaining() {
        players.push(Player {
            index: cur.get_u8()?,
            name: cur.get_cstr_lossy()?,
            score: cur.get_i32_le()?,
            time: cur.get_f32_le()?,
            status: None,
        });
    }
    if players.len() != count as usize {
        debug!(
            "S2A_PLAYER announced {} players, received {}",
            count,
            players.len()
        );
    }
    Ok(players)
}

fn decode_rules(cur: &mut Cursor) -> Result<Rules, Error> {
    let count = cur.get_u16_le()?;
    let mut rules = Rules::new();
    for _ in 0..count {
        let name = cur.get_cstr_lossy()?;
        if name.is_empty() {
            break;
        }
        let value = cur.get_cstr_lossy_or_rest();
        rules.insert(name, value);
    }
    Ok(rules)
}

fn decode_text(cur: &mut Cursor) -> String {
    let s = cur.get_cstr_lossy_or_rest();
    s.trim_end_matches(['\n', '\0']).to_owned()
}

impl Packet {
    /// Decode packet from `src`.
    ///
    /// `src` must be a complete response starting with the simple header.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        let header = cur.get_i32_le()?;
        if header != SIMPLE_HEADER {
            return Err(Error::InvalidHeader(header));
        }

        let packet = match cur.get_u8()? {
            kind::INFO => Self::Info(ServerInfo::decode_source(&mut cur)?),
            kind::INFO_DETAILED => Self::Info(ServerInfo::decode_goldsrc(&mut cur)?),
            kind::PLAYERS => Self::Players(decode_players(&mut cur)?),
            kind::RULES => Self::Rules(decode_rules(&mut cur)?),
            kind::CHALLENGE => Self::Challenge(cur.get_i32_le()?),
            kind::RCON => Self::RconResponse(decode_text(&mut cur)),
            kind::RCON_CHALLENGE => {
                let text = decode_text(&mut cur);
                Self::RconResponse(format!("c{}", text))
            }
            kind::LOG_STRING => Self::LogString(decode_text(&mut cur)),
            t => {
                debug!("unknown packet {}", Str(src));
                return Err(Error::UnknownPacketType(t));
            }
        };

        Ok(packet)
    }

    /// Encode packet to `buf` as a game server sends it.
    ///
    /// Server information with an address is encoded as `S2A_INFO_DETAILED`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put_i32_le(SIMPLE_HEADER)?;
        match self {
            Self::Info(info) if info.address.is_some() => {
                cur.put_u8(kind::INFO_DETAILED)?;
                info.encode_goldsrc(&mut cur)?;
            }
            Self::Info(info) => {
                cur.put_u8(kind::INFO)?;
                info.encode_source(&mut cur)?;
            }
            Self::Players(players) => {
                cur.put_u8(kind::PLAYERS)?.put_u8(players.len() as u8)?;
                for i in players {
                    cur.put_u8(i.index)?
                        .put_cstr(&i.name)?
                        .put_i32_le(i.score)?
                        .put_f32_le(i.time)?;
                }
            }
            Self::Rules(rules) => {
                cur.put_u8(kind::RULES)?.put_u16_le(rules.len() as u16)?;
                for (name, value) in rules {
                    cur.put_cstr(name)?.put_cstr(value)?;
                }
            }
            Self::Challenge(challenge) => {
                cur.put_u8(kind::CHALLENGE)?.put_i32_le(*challenge)?;
            }
            Self::RconResponse(text) if text.starts_with("challenge") => {
                cur.put_str(text)?.put_u8(b'\n')?.put_u8(0)?;
            }
            Self::RconResponse(text) => {
                cur.put_u8(kind::RCON)?.put_cstr(text)?;
            }
            Self::LogString(text) => {
                cur.put_u8(kind::LOG_STRING)?.put_cstr(text)?;
            }
        }
        Ok(cur.pos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExtraData, ModInfo, TheShip};

    fn round_trip(p: Packet) {
        let mut buf = [0; 1400];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(Packet::decode(&buf[..n]), Ok(p));
    }

    #[test]
    fn challenge() {
        let s = b"\xff\xff\xff\xffA\x78\x56\x34\x12";
        assert_eq!(Packet::decode(s), Ok(Packet::Challenge(0x12345678)));
    }

    #[test]
    fn info_source() {
        let s = b"\xff\xff\xff\xffI\x11Test Server\0de_dust2\0cstrike\0Counter-Strike\0\
                  \xf0\x00\x05\x10\x01dl\x00\x011.0.0.1\0\
                  \x81\x87\x69\xf0\x00\x00\x00\x00\x00\x00\x00";
        let info = match Packet::decode(s) {
            Ok(Packet::Info(info)) => info,
            p => panic!("unexpected {:?}", p),
        };
        assert_eq!(info.protocol, 17);
        assert_eq!(info.name, "Test Server");
        assert_eq!(info.map, "de_dust2");
        assert_eq!(info.folder, "cstrike");
        assert_eq!(info.app_id, 240);
        assert_eq!(info.players, 5);
        assert_eq!(info.max_players, 16);
        assert_eq!(info.bots, 1);
        assert_eq!(info.server_type, ServerType::Dedicated);
        assert_eq!(info.os, Os::Linux);
        assert!(!info.has_password());
        assert!(info.is_secure());
        assert_eq!(info.version, "1.0.0.1");
        assert_eq!(info.extra.port, Some(27015));
        assert_eq!(info.extra.game_id, Some(240));
        assert_eq!(info.extra.steam_id, None);
        assert_eq!(info.extra.keywords, None);
    }

    #[test]
    fn info_source_extra() {
        round_trip(Packet::Info(ServerInfo {
            protocol: 17,
            name: "Game".to_owned(),
            map: "cp_badlands".to_owned(),
            folder: "tf".to_owned(),
            game: "Team Fortress".to_owned(),
            app_id: 440,
            players: 24,
            max_players: 24,
            bots: 0,
            server_type: ServerType::Dedicated,
            os: Os::Windows,
            flags: ServerFlags::all(),
            version: "8622567".to_owned(),
            extra: ExtraData {
                port: Some(27015),
                steam_id: Some(90071992547409920),
                tv_port: Some(27020),
                tv_name: Some("SourceTV".to_owned()),
                keywords: Some("alltalk,increased_maxplayers".to_owned()),
                game_id: Some(440),
            },
            ..ServerInfo::default()
        }));
    }

    #[test]
    fn info_the_ship() {
        round_trip(Packet::Info(ServerInfo {
            name: "Ship".to_owned(),
            app_id: 2400,
            the_ship: Some(TheShip {
                mode: 1,
                witnesses: 3,
                duration: 10,
            }),
            version: "1.0".to_owned(),
            ..ServerInfo::default()
        }));
    }

    #[test]
    fn info_goldsrc() {
        let info = ServerInfo {
            address: Some("127.0.0.1:27015".to_owned()),
            name: "Half-Life".to_owned(),
            map: "crossfire".to_owned(),
            folder: "valve".to_owned(),
            game: "Half-Life".to_owned(),
            players: 1,
            max_players: 16,
            protocol: 47,
            server_type: ServerType::Dedicated,
            os: Os::Linux,
            flags: ServerFlags::SECURE,
            bots: 2,
            ..ServerInfo::default()
        };
        round_trip(Packet::Info(info.clone()));
        round_trip(Packet::Info(ServerInfo {
            mod_info: Some(ModInfo {
                url_info: "http://example.com".to_owned(),
                url_download: "http://example.com/dl".to_owned(),
                version: 1,
                size: 1024,
                server_only: false,
                client_dll: true,
            }),
            ..info
        }));
    }

    #[test]
    fn info_goldsrc_upper_case() {
        let s = b"\xff\xff\xff\xffm1.2.3.4:27015\0HL\0crossfire\0valve\0Half-Life\0\
                  \x00\x10\x2fDL\x00\x00\x01\x00";
        let info = match Packet::decode(s) {
            Ok(Packet::Info(info)) => info,
            p => panic!("unexpected {:?}", p),
        };
        assert_eq!(info.server_type, ServerType::Dedicated);
        assert_eq!(info.os, Os::Linux);
        assert_eq!(info.protocol, 47);
        assert!(info.is_secure());
        assert_eq!(info.mod_info, None);
    }

    #[test]
    fn players() {
        round_trip(Packet::Players(vec![
            Player::new(0, "player", 10, 100.5),
            Player::new(1, "", -2, 0.0),
        ]));
    }

    #[test]
    fn players_lossy_name() {
        let s = b"\xff\xff\xff\xffD\x01\x00pl\xffyer\0\x01\x00\x00\x00\x00\x00\x80\x3f";
        assert_eq!(
            Packet::decode(s),
            Ok(Packet::Players(vec![Player::new(
                0,
                "pl\u{fffd}yer",
                1,
                1.0
            )]))
        );
    }

    #[test]
    fn rules() {
        let mut rules = Rules::new();
        rules.insert("mp_friendlyfire".to_owned(), "0".to_owned());
        rules.insert("sv_gravity".to_owned(), "800".to_owned());
        round_trip(Packet::Rules(rules));
    }

    #[test]
    fn rules_empty_name() {
        let s = b"\xff\xff\xff\xffE\x03\x00a\x001\x00\x00\x00b\x002\x00";
        let mut rules = Rules::new();
        rules.insert("a".to_owned(), "1".to_owned());
        assert_eq!(Packet::decode(s), Ok(Packet::Rules(rules)));
    }

    #[test]
    fn rcon_response() {
        let s = b"\xff\xff\xff\xfflecho test\n\0";
        assert_eq!(
            Packet::decode(s),
            Ok(Packet::RconResponse("echo test".to_owned()))
        );
        let s = b"\xff\xff\xff\xffchallenge rcon 1234567890\n\0";
        assert_eq!(
            Packet::decode(s),
            Ok(Packet::RconResponse("challenge rcon 1234567890".to_owned()))
        );
        round_trip(Packet::RconResponse("challenge rcon 42".to_owned()));
        round_trip(Packet::RconResponse("cvar = 1".to_owned()));
    }

    #[test]
    fn log_string() {
        round_trip(Packet::LogString("L 01/01/2023 - 00:00:00: log".to_owned()));
    }

    #[test]
    fn bad_header() {
        assert_eq!(
            Packet::decode(b"\xfe\xff\xff\xffA\0\0\0\0"),
            Err(Error::InvalidHeader(-2))
        );
        assert_eq!(
            Packet::decode(b"\xff\xff\xff\xffZ"),
            Err(Error::UnknownPacketType(b'Z'))
        );
    }

    #[test]
    fn region() {
        assert_eq!(Region::try_from(0x03), Ok(Region::Europe));
        assert_eq!(Region::try_from(0x08), Err(Error::InvalidRegion));
    }
}

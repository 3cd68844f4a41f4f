// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use crate::cursor::{Cursor, CursorMut};
use crate::server::{Os, ServerFlags, ServerType};
use crate::Error;

/// Application id of The Ship.
const THE_SHIP_APP_ID: u16 = 2400;

/// Game server information.
///
/// Decoded from `S2A_INFO2` (Source and newer GoldSrc servers) or from the
/// obsolete GoldSrc `S2A_INFO_DETAILED` response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServerInfo {
    /// Server protocol version.
    pub protocol: u8,
    /// Server name.
    pub name: String,
    /// Current map.
    pub map: String,
    /// Game directory.
    pub folder: String,
    /// Game description.
    pub game: String,
    /// Steam application id.
    pub app_id: u16,
    /// Number of players.
    pub players: u8,
    /// Maximum number of players.
    pub max_players: u8,
    /// Number of bots.
    pub bots: u8,
    /// Server type.
    pub server_type: ServerType,
    /// Server operating system.
    pub os: Os,
    /// Password and anti-cheat flags.
    pub flags: ServerFlags,
    /// The Ship specific fields.
    pub the_ship: Option<TheShip>,
    /// Game version.
    pub version: String,
    /// Optional fields of `S2A_INFO2`.
    pub extra: ExtraData,
    /// Server address reported in `S2A_INFO_DETAILED`.
    pub address: Option<String>,
    /// Modification information from `S2A_INFO_DETAILED`.
    pub mod_info: Option<ModInfo>,
}

/// The Ship game mode fields.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TheShip {
    /// Game mode.
    pub mode: u8,
    /// Number of witnesses.
    pub witnesses: u8,
    /// Time in seconds before a player is arrested.
    pub duration: u8,
}

/// Extra data of `S2A_INFO2` announced by the EDF byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraData {
    /// Game port.
    pub port: Option<u16>,
    /// Server SteamID.
    pub steam_id: Option<u64>,
    /// SourceTV port.
    pub tv_port: Option<u16>,
    /// SourceTV name.
    pub tv_name: Option<String>,
    /// Tags.
    pub keywords: Option<String>,
    /// 64-bit game id.
    pub game_id: Option<u64>,
}

impl ExtraData {
    const PORT: u8 = 0x80;
    const STEAM_ID: u8 = 0x10;
    const SOURCE_TV: u8 = 0x40;
    const KEYWORDS: u8 = 0x20;
    const GAME_ID: u8 = 0x01;

    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn flags(&self) -> u8 {
        let mut edf = 0;
        if self.port.is_some() {
            edf |= Self::PORT;
        }
        if self.steam_id.is_some() {
            edf |= Self::STEAM_ID;
        }
        if self.tv_port.is_some() {
            edf |= Self::SOURCE_TV;
        }
        if self.keywords.is_some() {
            edf |= Self::KEYWORDS;
        }
        if self.game_id.is_some() {
            edf |= Self::GAME_ID;
        }
        edf
    }

    fn decode(cur: &mut Cursor) -> Result<Self, Error> {
        let mut ret = Self::default();
        if !cur.has_remaining() {
            return Ok(ret);
        }
        let edf = cur.get_u8()?;
        if edf & Self::PORT != 0 {
            ret.port = Some(cur.get_u16_le()?);
        }
        if edf & Self::STEAM_ID != 0 {
            ret.steam_id = Some(cur.get_u64_le()?);
        }
        if edf & Self::SOURCE_TV != 0 {
            ret.tv_port = Some(cur.get_u16_le()?);
            ret.tv_name = Some(cur.get_cstr_lossy()?);
        }
        if edf & Self::KEYWORDS != 0 {
            ret.keywords = Some(cur.get_cstr_lossy()?);
        }
        if edf & Self::GAME_ID != 0 {
            ret.game_id = Some(cur.get_u64_le()?);
        }
        Ok(ret)
    }

    fn encode(&self, cur: &mut CursorMut) -> Result<(), Error> {
        if self.is_empty() {
            return Ok(());
        }
        cur.put_u8(self.flags())?;
        if let Some(port) = self.port {
            cur.put_u16_le(port)?;
        }
        if let Some(steam_id) = self.steam_id {
            cur.put_array(&steam_id.to_le_bytes())?;
        }
        if let Some(tv_port) = self.tv_port {
            cur.put_u16_le(tv_port)?
                .put_cstr(self.tv_name.as_deref().unwrap_or(""))?;
        }
        if let Some(keywords) = &self.keywords {
            cur.put_cstr(keywords)?;
        }
        if let Some(game_id) = self.game_id {
            cur.put_array(&game_id.to_le_bytes())?;
        }
        Ok(())
    }
}

/// Half-Life modification information from `S2A_INFO_DETAILED`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModInfo {
    /// Modification website.
    pub url_info: String,
    /// Modification download link.
    pub url_download: String,
    /// Modification version.
    pub version: i32,
    /// Modification size in bytes.
    pub size: i32,
    /// Server side only modification.
    pub server_only: bool,
    /// Modification has its own client dll.
    pub client_dll: bool,
}

impl ServerInfo {
    /// Returns `true` if the server is password protected.
    pub fn has_password(&self) -> bool {
        self.flags.contains(ServerFlags::PASSWORD)
    }

    /// Returns `true` if the server uses anti-cheat.
    pub fn is_secure(&self) -> bool {
        self.flags.contains(ServerFlags::SECURE)
    }

    fn decode_flags(cur: &mut Cursor) -> Result<ServerFlags, Error> {
        let mut flags = ServerFlags::empty();
        flags.set(ServerFlags::PASSWORD, cur.get_bool()?);
        flags.set(ServerFlags::SECURE, cur.get_bool()?);
        Ok(flags)
    }

    /// Decodes the body of `S2A_INFO2`.
    pub(crate) fn decode_source(cur: &mut Cursor) -> Result<Self, Error> {
        let mut ret = Self {
            protocol: cur.get_u8()?,
            name: cur.get_cstr_lossy()?,
            map: cur.get_cstr_lossy()?,
            folder: cur.get_cstr_lossy()?,
            game: cur.get_cstr_lossy()?,
            app_id: cur.get_u16_le()?,
            players: cur.get_u8()?,
            max_players: cur.get_u8()?,
            bots: cur.get_u8()?,
            server_type: ServerType::from(cur.get_u8()?),
            os: Os::from(cur.get_u8()?),
            ..Self::default()
        };
        ret.flags = Self::decode_flags(cur)?;
        if ret.app_id == THE_SHIP_APP_ID {
            ret.the_ship = Some(TheShip {
                mode: cur.get_u8()?,
                witnesses: cur.get_u8()?,
                duration: cur.get_u8()?,
            });
        }
        ret.version = cur.get_cstr_lossy()?;
        ret.extra = ExtraData::decode(cur)?;
        Ok(ret)
    }

    /// Decodes the body of `S2A_INFO_DETAILED`.
    pub(crate) fn decode_goldsrc(cur: &mut Cursor) -> Result<Self, Error> {
        let mut ret = Self {
            address: Some(cur.get_cstr_lossy()?),
            name: cur.get_cstr_lossy()?,
            map: cur.get_cstr_lossy()?,
            folder: cur.get_cstr_lossy()?,
            game: cur.get_cstr_lossy()?,
            players: cur.get_u8()?,
            max_players: cur.get_u8()?,
            protocol: cur.get_u8()?,
            server_type: ServerType::from(cur.get_u8()?),
            os: Os::from(cur.get_u8()?),
            ..Self::default()
        };
        let password = cur.get_bool()?;
        if cur.get_bool()? {
            let url_info = cur.get_cstr_lossy()?;
            let url_download = cur.get_cstr_lossy()?;
            // reserved
            cur.get_u8()?;
            ret.mod_info = Some(ModInfo {
                url_info,
                url_download,
                version: cur.get_i32_le()?,
                size: cur.get_i32_le()?,
                server_only: cur.get_bool()?,
                client_dll: cur.get_bool()?,
            });
        }
        ret.flags.set(ServerFlags::PASSWORD, password);
        ret.flags.set(ServerFlags::SECURE, cur.get_bool()?);
        ret.bots = cur.get_u8()?;
        Ok(ret)
    }

    /// Encodes the body of `S2A_INFO2`.
    pub(crate) fn encode_source(&self, cur: &mut CursorMut) -> Result<(), Error> {
        cur.put_u8(self.protocol)?
            .put_cstr(&self.name)?
            .put_cstr(&self.map)?
            .put_cstr(&self.folder)?
            .put_cstr(&self.game)?
            .put_u16_le(self.app_id)?
            .put_u8(self.players)?
            .put_u8(self.max_players)?
            .put_u8(self.bots)?
            .put_u8(self.server_type.into())?
            .put_u8(self.os.into())?
            .put_u8(self.has_password() as u8)?
            .put_u8(self.is_secure() as u8)?;
        if self.app_id == THE_SHIP_APP_ID {
            let ship = self.the_ship.unwrap_or_default();
            cur.put_u8(ship.mode)?
                .put_u8(ship.witnesses)?
                .put_u8(ship.duration)?;
        }
        cur.put_cstr(&self.version)?;
        self.extra.encode(cur)
    }

    /// Encodes the body of `S2A_INFO_DETAILED`.
    pub(crate) fn encode_goldsrc(&self, cur: &mut CursorMut) -> Result<(), Error> {
        cur.put_cstr(self.address.as_deref().unwrap_or(""))?
            .put_cstr(&self.name)?
            .put_cstr(&self.map)?
            .put_cstr(&self.folder)?
            .put_cstr(&self.game)?
            .put_u8(self.players)?
            .put_u8(self.max_players)?
            .put_u8(self.protocol)?
            .put_u8(self.server_type.into())?
            .put_u8(self.os.into())?
            .put_u8(self.has_password() as u8)?
            .put_u8(self.mod_info.is_some() as u8)?;
        if let Some(info) = &self.mod_info {
            cur.put_cstr(&info.url_info)?
                .put_cstr(&info.url_download)?
                .put_u8(0)?
                .put_i32_le(info.version)?
                .put_i32_le(info.size)?
                .put_u8(info.server_only as u8)?
                .put_u8(info.client_dll as u8)?;
        }
        cur.put_u8(self.is_secure() as u8)?.put_u8(self.bots)?;
        Ok(())
    }
}

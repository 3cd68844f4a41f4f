// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Master server query filter
//!
//! # Supported filters:
//!
//! | Filter        | Type | Description                          | Examples |
//! | ------------- | ---- | ------------------------------------ | -------- |
//! | gamedir       | str  | Game directory                       | `valve`, `cstrike` |
//! | map           | str  | Map name                             | `crossfire`, `de_dust` |
//! | appid         | u32  | Application id                       | `240` |
//! | napp          | u32  | Exclude application id               | `500` |
//! | gametype      | str  | Servers with all of the tags         | `alltalk,friendlyfire` |
//! | name_match    | str  | Server name, wildcards allowed       | `*dust*` |
//! | version_match | str  | Game version, wildcards allowed      | `1.0.*` |
//! | gameaddr      | str  | Servers on the address               | `1.2.3.4`, `1.2.3.4:27015` |
//! | dedicated     | bool | Server running dedicated             | `0`, `1` |
//! | secure        | bool | Server using anti-cheat              | `0`, `1` |
//! | linux         | bool | Server running on Linux              | `0`, `1` |
//! | password      | bool | Server is password protected         | `0`, `1` |
//! | empty         | bool | Server is not empty                  | `0`, `1` |
//! | full          | bool | Server is not full                   | `0`, `1` |
//! | proxy         | bool | Server is a spectator proxy          | `0`, `1` |
//! | noplayers     | bool | Server is empty                      | `0`, `1` |
//! | white         | bool | Server is whitelisted                | `0`, `1` |
//!
//! # Examples:
//!
//! Filter `\gamedir\valve\full\1\password\0` will select server if:
//!
//! * It is Half-Life server
//! * Is not full
//! * Is not protected by a password

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use log::debug;

use crate::Error;

bitflags! {
    /// Boolean filters.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct FilterFlags: u16 {
        /// Servers running dedicated
        const DEDICATED     = 1 << 0;
        /// Servers using anti-cheat technology (VAC, but potentially others as well)
        const SECURE        = 1 << 1;
        /// Servers running on a Linux platform
        const LINUX         = 1 << 2;
        /// Servers that are password protected
        const PASSWORD      = 1 << 3;
        /// Servers that are not empty
        const NOT_EMPTY     = 1 << 4;
        /// Servers that are not full
        const FULL          = 1 << 5;
        /// Servers that are spectator proxies
        const PROXY         = 1 << 6;
        /// Servers that are empty
        const NOPLAYERS     = 1 << 7;
        /// Servers that are whitelisted
        const WHITE         = 1 << 8;
    }
}

const FLAG_NAMES: [(&str, FilterFlags); 9] = [
    ("dedicated", FilterFlags::DEDICATED),
    ("secure", FilterFlags::SECURE),
    ("linux", FilterFlags::LINUX),
    ("password", FilterFlags::PASSWORD),
    ("empty", FilterFlags::NOT_EMPTY),
    ("full", FilterFlags::FULL),
    ("proxy", FilterFlags::PROXY),
    ("noplayers", FilterFlags::NOPLAYERS),
    ("white", FilterFlags::WHITE),
];

/// Master server filter builder.
///
/// Rendered with `Display` as a sequence of `\key\value` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    /// Servers running the specified modification (ex. cstrike)
    pub gamedir: Option<String>,
    /// Servers running the specified map (ex. cs_italy)
    pub map: Option<String>,
    /// Servers running the specified application id.
    pub app_id: Option<u32>,
    /// Servers not running the specified application id.
    pub napp: Option<u32>,
    /// Servers with all of the tags.
    pub gametype: Vec<String>,
    /// Servers with the name (wildcards allowed).
    pub name_match: Option<String>,
    /// Servers running the version (wildcards allowed).
    pub version_match: Option<String>,
    /// Servers on the address.
    pub gameaddr: Option<String>,

    /// Values of boolean filters.
    pub flags: FilterFlags,
    /// Boolean filters in use.
    pub flags_mask: FilterFlags,
}

impl Filter {
    /// Creates an empty filter which matches all servers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the filter matches all servers.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Sets or clears a boolean filter.
    pub fn insert_flag(&mut self, flag: FilterFlags, value: bool) {
        self.flags.set(flag, value);
        self.flags_mask.insert(flag);
    }

    /// Adds a boolean filter.
    pub fn flag(mut self, flag: FilterFlags, value: bool) -> Self {
        self.insert_flag(flag, value);
        self
    }

    /// Adds a game directory filter.
    pub fn gamedir(mut self, gamedir: impl Into<String>) -> Self {
        self.gamedir = Some(gamedir.into());
        self
    }

    /// Adds a map filter.
    pub fn map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }

    /// Adds an application id filter.
    pub fn app_id(mut self, app_id: u32) -> Self {
        self.app_id = Some(app_id);
        self
    }

    /// Excludes an application id.
    pub fn napp(mut self, app_id: u32) -> Self {
        self.napp = Some(app_id);
        self
    }

    /// Adds a tag.
    pub fn gametype(mut self, tag: impl Into<String>) -> Self {
        self.gametype.push(tag.into());
        self
    }

    /// Adds a server name filter.
    pub fn name_match(mut self, name: impl Into<String>) -> Self {
        self.name_match = Some(name.into());
        self
    }

    /// Adds a game version filter.
    pub fn version_match(mut self, version: impl Into<String>) -> Self {
        self.version_match = Some(version.into());
        self
    }

    /// Adds a server address filter.
    pub fn gameaddr(mut self, addr: impl Into<String>) -> Self {
        self.gameaddr = Some(addr.into());
        self
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = match s.strip_prefix('\\') {
            Some(s) => s,
            None if s.is_empty() => return Ok(Self::default()),
            None => return Err(Error::InvalidPacket),
        };

        fn get_flag(value: &str) -> Result<bool, Error> {
            match value {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(Error::InvalidPacket),
            }
        }

        fn get_number(value: &str) -> Result<u32, Error> {
            value.parse().map_err(|_| Error::InvalidPacket)
        }

        let mut filter = Self::default();
        let mut iter = s.split('\\');
        while let Some(key) = iter.next() {
            let value = iter.next().ok_or(Error::InvalidPacket)?;
            match key {
                "gamedir" => filter.gamedir = Some(value.to_owned()),
                "map" => filter.map = Some(value.to_owned()),
                "appid" => filter.app_id = Some(get_number(value)?),
                "napp" => filter.napp = Some(get_number(value)?),
                "gametype" => filter
                    .gametype
                    .extend(value.split(',').filter(|i| !i.is_empty()).map(From::from)),
                "name_match" => filter.name_match = Some(value.to_owned()),
                "version_match" => filter.version_match = Some(value.to_owned()),
                "gameaddr" => filter.gameaddr = Some(value.to_owned()),
                _ => match FLAG_NAMES.iter().find(|(name, _)| *name == key) {
                    Some((_, flag)) => filter.insert_flag(*flag, get_flag(value)?),
                    None => {
                        // skip unknown fields
                        debug!("Invalid Filter field \"{}\" = \"{}\"", key, value);
                    }
                },
            }
        }

        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        macro_rules! display_opt {
            ($n:expr, $v:expr) => {
                if let Some(v) = &$v {
                    write!(fmt, "\\{}\\{}", $n, v)?;
                }
            };
        }

        display_opt!("gamedir", self.gamedir);
        display_opt!("map", self.map);
        display_opt!("appid", self.app_id);
        display_opt!("napp", self.napp);
        if !self.gametype.is_empty() {
            write!(fmt, "\\gametype\\{}", self.gametype.join(","))?;
        }
        display_opt!("name_match", self.name_match);
        display_opt!("version_match", self.version_match);
        display_opt!("gameaddr", self.gameaddr);

        for (name, flag) in FLAG_NAMES {
            if self.flags_mask.contains(flag) {
                let value = if self.flags.contains(flag) { '1' } else { '0' };
                write!(fmt, "\\{}\\{}", name, value)?;
            }
        }

        Ok(())
    }
}

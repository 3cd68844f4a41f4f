// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Players of a game server.
//!
//! The binary `S2A_PLAYER` record only has a name, a score and a connection time.
//! Servers with a known RCON password can fill in the rest from the text output
//! of the `status` command, see [`parse_status`].

use log::{debug, warn};

/// Unique id reported for bots in `status` output.
pub const BOT_UNIQUE_ID: &str = "BOT";

/// A player from the `S2A_PLAYER` response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Player {
    /// Index of the player record.
    pub index: u8,
    /// Player name.
    pub name: String,
    /// Player score (frags).
    pub score: i32,
    /// Seconds since the player connected.
    pub time: f32,
    /// Additional information from RCON `status`.
    pub status: Option<PlayerStatus>,
}

impl Player {
    /// Creates a new `Player`.
    pub fn new(index: u8, name: impl Into<String>, score: i32, time: f32) -> Self {
        Self {
            index,
            name: name.into(),
            score,
            time,
            status: None,
        }
    }

    /// Returns `true` if the status line of this player was merged.
    pub fn is_extended(&self) -> bool {
        self.status.is_some()
    }

    /// Returns `true` if the player is a bot.
    pub fn is_bot(&self) -> bool {
        self.status.as_ref().map_or(false, |s| s.is_bot())
    }

    /// Merges a status line into this player.
    pub fn add_status(&mut self, status: PlayerStatus) {
        self.status = Some(status);
    }
}

/// Player information printed by the `status` RCON command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    /// Connection id.
    pub user_id: Option<u32>,
    /// Steam id or `BOT`.
    pub unique_id: Option<String>,
    /// Connection state (Source only).
    pub state: Option<String>,
    /// Connection time as printed by the server.
    pub connected: Option<String>,
    /// Ping in milliseconds.
    pub ping: Option<u32>,
    /// Packet loss.
    pub loss: Option<u32>,
    /// Network rate (newer Source servers).
    pub rate: Option<u32>,
    /// Player address.
    pub address: Option<String>,
}

impl PlayerStatus {
    /// Returns `true` if the status belongs to a bot.
    pub fn is_bot(&self) -> bool {
        self.unique_id.as_deref() == Some(BOT_UNIQUE_ID)
    }
}

/// A row of `status` output matched with a player name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// Name of the player.
    pub name: String,
    /// Parsed columns.
    pub status: PlayerStatus,
}

fn attributes(header: &str) -> Vec<&str> {
    header
        .split_whitespace()
        .map(|i| match i {
            "connected" => "time",
            "frag" => "score",
            _ => i,
        })
        .collect()
}

fn strip_slot(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    let rest = &line[digits..];
    if digits > 0 && rest.starts_with(' ') {
        rest.trim_start_matches(' ')
    } else {
        line
    }
}

fn split_row<'a>(attributes: &[&str], line: &'a str) -> Option<Vec<Option<&'a str>>> {
    let line = if attributes.first() != Some(&"userid") {
        strip_slot(line)
    } else {
        line
    };

    let first = line.find('"')?;
    let last = line.rfind('"')?;
    if first == last {
        return None;
    }

    let mut data: Vec<Option<&str>> = Vec::with_capacity(attributes.len());
    data.extend(line[..first].split_whitespace().map(Some));
    data.push(Some(&line[first + 1..last]));
    data.extend(line[last + 1..].split_whitespace().map(Some));

    if attributes.len() > data.len() && attributes.contains(&"state") {
        // bots have no connection time, ping and loss
        let at = data.len().min(3);
        for _ in 0..3 {
            data.insert(at, None);
        }
    } else if attributes.len() < data.len() {
        data.remove(1);
    }

    Some(data)
}

/// Parses output of the `status` RCON command.
///
/// Column layout differs between engines and versions, so it is taken from
/// the header line. Rows that can not be parsed are skipped.
pub fn parse_status(output: &str) -> Vec<StatusEntry> {
    let mut lines = output
        .lines()
        // GoldSrc joins continuation datagrams with a space
        .map(str::trim)
        .filter(|i| i.starts_with('#') && *i != "#end")
        .map(|i| i[1..].trim());

    let header = match lines.next() {
        Some(header) => header,
        None => return Vec::new(),
    };
    let attributes = attributes(header);
    debug!("status columns: {:?}", attributes);

    let mut entries = Vec::new();
    for line in lines {
        let data = match split_row(&attributes, line) {
            Some(data) => data,
            None => {
                warn!("failed to parse status line \"{}\"", line);
                continue;
            }
        };

        let mut name = None;
        let mut status = PlayerStatus::default();
        for (attribute, value) in attributes.iter().zip(data) {
            let value = match value {
                Some(value) => value,
                None => continue,
            };
            match *attribute {
                "name" => name = Some(value.to_owned()),
                "userid" => status.user_id = value.parse().ok(),
                "uniqueid" => status.unique_id = Some(value.to_owned()),
                "state" => status.state = Some(value.to_owned()),
                "time" => status.connected = Some(value.to_owned()),
                "ping" => status.ping = value.parse().ok(),
                "loss" => status.loss = value.parse().ok(),
                "rate" => status.rate = value.parse().ok(),
                "adr" => status.address = Some(value.to_owned()),
                _ => {}
            }
        }

        if status.is_bot() {
            status.ping = None;
            status.loss = None;
            status.rate = None;
            status.address = None;
        }

        match name {
            Some(name) => entries.push(StatusEntry { name, status }),
            None => warn!("status line without a name \"{}\"", line),
        }
    }
    entries
}

/// Merges `status` output into players with the same name.
///
/// Returns how many players were updated.
pub fn add_status(players: &mut [Player], output: &str) -> usize {
    let mut count = 0;
    for entry in parse_status(output) {
        match players.iter_mut().find(|i| i.name == entry.name) {
            Some(player) => {
                player.add_status(entry.status);
                count += 1;
            }
            None => debug!("status for unknown player \"{}\"", entry.name),
        }
    }
    count
}

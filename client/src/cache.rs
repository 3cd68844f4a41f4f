// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::time::Duration;

use condenser_protocol::{
    player::Player,
    server::{Packet, Rules},
    ServerInfo,
};

/// Kind of cached data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    /// Round trip time.
    Ping,
    /// Server information.
    Info,
    /// Server rules.
    Rules,
    /// Player list.
    Players,
    /// Challenge number.
    Challenge,
}

/// Responses of a game server.
#[derive(Clone, Debug, Default)]
pub struct ServerCache {
    ping: Option<Duration>,
    info: Option<ServerInfo>,
    rules: Option<Rules>,
    players: Option<Vec<Player>>,
    challenge: Option<i32>,
}

impl ServerCache {
    /// Returns the round trip time.
    pub fn ping(&self) -> Option<Duration> {
        self.ping
    }

    /// Returns server information.
    pub fn info(&self) -> Option<&ServerInfo> {
        self.info.as_ref()
    }

    /// Returns server rules.
    pub fn rules(&self) -> Option<&Rules> {
        self.rules.as_ref()
    }

    /// Returns the player list.
    pub fn players(&self) -> Option<&[Player]> {
        self.players.as_deref()
    }

    /// Returns a mutable player list.
    pub fn players_mut(&mut self) -> Option<&mut Vec<Player>> {
        self.players.as_mut()
    }

    /// Returns the challenge number.
    pub fn challenge(&self) -> Option<i32> {
        self.challenge
    }

    /// Returns `true` if data of `category` is cached.
    pub fn contains(&self, category: Category) -> bool {
        match category {
            Category::Ping => self.ping.is_some(),
            Category::Info => self.info.is_some(),
            Category::Rules => self.rules.is_some(),
            Category::Players => self.players.is_some(),
            Category::Challenge => self.challenge.is_some(),
        }
    }

    pub(crate) fn set_ping(&mut self, ping: Duration) {
        self.ping = Some(ping);
    }

    /// Caches a response.
    ///
    /// Returns the category of the response, `None` if the response has
    /// nothing to cache.
    pub fn store(&mut self, packet: Packet) -> Option<Category> {
        match packet {
            Packet::Info(info) => {
                self.info = Some(info);
                Some(Category::Info)
            }
            Packet::Rules(rules) => {
                self.rules = Some(rules);
                Some(Category::Rules)
            }
            Packet::Players(players) => {
                self.players = Some(players);
                Some(Category::Players)
            }
            Packet::Challenge(challenge) => {
                self.challenge = Some(challenge);
                Some(Category::Challenge)
            }
            Packet::RconResponse(text) | Packet::LogString(text) => {
                debug!("nothing to cache in \"{}\"", text);
                None
            }
        }
    }

    /// Drops cached data of `category`.
    pub fn invalidate(&mut self, category: Category) {
        match category {
            Category::Ping => self.ping = None,
            Category::Info => self.info = None,
            Category::Rules => self.rules = None,
            Category::Players => self.players = None,
            Category::Challenge => self.challenge = None,
        }
    }

    /// Drops all cached data.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_invalidate() {
        let mut cache = ServerCache::default();
        assert_eq!(cache.store(Packet::Challenge(42)), Some(Category::Challenge));
        assert_eq!(cache.challenge(), Some(42));

        let players = vec![Player::new(0, "player", 10, 1.5)];
        assert_eq!(
            cache.store(Packet::Players(players.clone())),
            Some(Category::Players)
        );
        assert_eq!(cache.players(), Some(&players[..]));

        assert_eq!(cache.store(Packet::LogString("log".into())), None);

        cache.invalidate(Category::Players);
        assert!(!cache.contains(Category::Players));
        assert!(cache.contains(Category::Challenge));

        cache.set_ping(Duration::from_millis(5));
        cache.clear();
        assert!(!cache.contains(Category::Ping));
        assert!(!cache.contains(Category::Challenge));
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::fs;
use std::io;
use std::path::Path;

use condenser::protocol::{master::SOURCE_MASTER, server::Region};
use log::LevelFilter;
use serde::{de::Error as _, Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_TIMEOUT: u64 = 1000;
pub const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub master: MasterConfig,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    #[serde(deserialize_with = "deserialize_log_level")]
    pub level: LevelFilter,
    #[serde(default = "default_log_time")]
    pub time: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            time: default_log_time(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Receive timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct MasterConfig {
    #[serde(default = "default_masters")]
    pub servers: Vec<String>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_region")]
    pub region: Region,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            servers: default_masters(),
            region: Region::default(),
        }
    }
}

fn default_log_level() -> LevelFilter {
    LevelFilter::Warn
}

fn default_log_time() -> bool {
    false
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_masters() -> Vec<String> {
    vec![SOURCE_MASTER.to_owned()]
}

fn deserialize_log_level<'de, D>(de: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(de)?;
    parse_log_level(&s).ok_or_else(|| D::Error::custom(format!("Invalid log level: \"{}\"", s)))
}

fn deserialize_region<'de, D>(de: D) -> Result<Region, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u8::deserialize(de)?;
    Region::try_from(value).map_err(|_| D::Error::custom(format!("Invalid region: {}", value)))
}

pub fn parse_log_level(s: &str) -> Option<LevelFilter> {
    use LevelFilter as E;

    let level_filter = match s {
        _ if "off".starts_with(s) => E::Off,
        _ if "error".starts_with(s) => E::Error,
        _ if "warn".starts_with(s) => E::Warn,
        _ if "info".starts_with(s) => E::Info,
        _ if "debug".starts_with(s) => E::Debug,
        _ if "trace".starts_with(s) => E::Trace,
        _ => match s.parse::<u8>() {
            Ok(0) => E::Off,
            Ok(1) => E::Error,
            Ok(2) => E::Warn,
            Ok(3) => E::Info,
            Ok(4) => E::Debug,
            Ok(5) => E::Trace,
            _ => return None,
        },
    };
    Some(level_filter)
}

/// Parses a region by number or by name.
pub fn parse_region(s: &str) -> Option<Region> {
    use Region as E;

    let region = match s.to_ascii_lowercase().as_str() {
        "us-east" => E::USEastCoast,
        "us-west" => E::USWestCoast,
        "south-america" => E::SouthAmerica,
        "europe" => E::Europe,
        "asia" => E::Asia,
        "australia" => E::Australia,
        "middle-east" => E::MiddleEast,
        "africa" => E::Africa,
        "all" | "world" => E::RestOfTheWorld,
        s => return s.parse::<u8>().ok().and_then(|i| Region::try_from(i).ok()),
    };
    Some(region)
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
    let data = fs::read_to_string(path)?;
    Ok(toml::from_str(&data)?)
}

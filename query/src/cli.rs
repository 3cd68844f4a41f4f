// SPDX-License-Identifier: GPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::process;
use std::str::FromStr;

use condenser::protocol::{filter::Filter, server::Region};
use getopts::Options;
use log::LevelFilter;
use thiserror::Error;

use crate::config;

const BIN_NAME: &str = env!("CARGO_BIN_NAME");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid log level \"{0}\"")]
    InvalidLogLevel(String),
    #[error("Invalid region \"{0}\"")]
    InvalidRegion(String),
    #[error("Invalid filter \"{0}\"")]
    InvalidFilter(String),
    #[error("Invalid engine \"{0}\"")]
    InvalidEngine(String),
    #[error("Invalid timeout \"{0}\"")]
    InvalidTimeout(String),
    #[error("Invalid retries \"{0}\"")]
    InvalidRetries(String),
    #[error(transparent)]
    Options(#[from] getopts::Fail),
}

/// Engine used to talk to game servers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EngineKind {
    #[default]
    Source,
    GoldSrc,
    Hltv,
}

impl FromStr for EngineKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "src" => Ok(Self::Source),
            "goldsrc" | "gs" => Ok(Self::GoldSrc),
            "hltv" => Ok(Self::Hltv),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct Cli {
    pub masters: Option<Vec<String>>,
    pub region: Option<Region>,
    pub filter: Filter,
    pub force: bool,
    pub engine: EngineKind,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub json: bool,
    pub config_path: Option<Box<str>>,
    pub log_level: Option<LevelFilter>,
    pub args: Vec<String>,
}

fn print_usage(opts: Options) {
    let brief = format!(
        "\
Usage: {} [options] <COMMAND> [ARGS]

COMMANDS:
    list                fetch servers from master servers and print addresses
    info hosts...       fetch info for each server (every listed server if no hosts)
    rules host          fetch rules of a server
    players host        fetch players of a server
    rcon host command   execute a remote console command\
        ",
        BIN_NAME
    );
    print!("{}", opts.usage(&brief));
}

fn print_version() {
    println!("{} v{}", PKG_NAME, PKG_VERSION);
}

pub fn parse() -> Result<Cli, Error> {
    let mut cli = Cli::default();

    let args: Vec<_> = std::env::args().collect();
    let mut opts = Options::new();
    opts.optflag("h", "help", "print usage help");
    opts.optflag("v", "version", "print program version");
    opts.optopt("c", "config", "config path", "PATH");
    let log_help =
        "logging level [default: warn(2)]\nLEVEL: 0-5, off, error, warn, info, debug, trace";
    opts.optopt("l", "log", log_help, "LEVEL");
    let help = format!(
        "master servers to query [default: {}]",
        condenser::protocol::master::SOURCE_MASTER
    );
    opts.optopt("m", "master", &help, "LIST");
    opts.optopt("r", "region", "master server region [default: all]", "REGION");
    opts.optopt("f", "filter", "master server filter", "FILTER");
    opts.optflag("F", "force", "try other master addresses on failure");
    opts.optopt(
        "e",
        "engine",
        "server engine [default: source]\nENGINE: source, goldsrc, hltv",
        "ENGINE",
    );
    opts.optopt("p", "password", "rcon password", "PASSWORD");
    let help = format!(
        "time to wait for a response [default: {}]",
        config::DEFAULT_TIMEOUT
    );
    opts.optopt("t", "timeout", &help, "MS");
    let help = format!(
        "attempts per master server page [default: {}]",
        config::DEFAULT_RETRIES
    );
    opts.optopt("R", "retries", &help, "NUM");
    opts.optflag("j", "json", "output JSON");

    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("help") {
        print_usage(opts);
        process::exit(0);
    }

    if matches.opt_present("version") {
        print_version();
        process::exit(0);
    }

    if let Some(s) = matches.opt_str("config") {
        cli.config_path = Some(s.into_boxed_str());
    }

    if let Some(s) = matches.opt_str("log") {
        cli.log_level = Some(config::parse_log_level(&s).ok_or(Error::InvalidLogLevel(s))?);
    }

    if let Some(s) = matches.opt_str("master") {
        cli.masters = Some(s.split(',').map(String::from).collect());
    }

    if let Some(s) = matches.opt_str("region") {
        cli.region = Some(config::parse_region(&s).ok_or(Error::InvalidRegion(s))?);
    }

    if let Some(s) = matches.opt_str("filter") {
        cli.filter = s.parse().map_err(|_| Error::InvalidFilter(s))?;
    }

    if let Some(s) = matches.opt_str("engine") {
        cli.engine = s.parse().map_err(|_| Error::InvalidEngine(s))?;
    }

    if let Some(s) = matches.opt_str("timeout") {
        cli.timeout = Some(s.parse().map_err(|_| Error::InvalidTimeout(s))?);
    }

    if let Some(s) = matches.opt_str("retries") {
        cli.retries = Some(s.parse().map_err(|_| Error::InvalidRetries(s))?);
    }

    cli.password = matches.opt_str("password");
    cli.force = matches.opt_present("force");
    cli.json = matches.opt_present("json");
    cli.args = matches.free;

    Ok(cli)
}

// SPDX-License-Identifier: GPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

mod cli;
mod config;
mod logger;

use std::cmp;
use std::fmt;
use std::net::SocketAddr;
use std::process;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use condenser::protocol::{
    player::Player,
    server::{Region, Rules},
    ServerInfo as ProtocolServerInfo,
};
use condenser::{
    Endpoint, Engine, Error as ClientError, GameServer, GoldSrcServer, MasterServer,
    SourceServer, MASTER_PORT,
};
use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::cli::{Cli, EngineKind};
use crate::config::Config;

#[derive(Error, Debug)]
enum Error {
    #[error("Undefined command")]
    UndefinedCommand,
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("RCON password is required")]
    MissingPassword,
    #[error("RCON authentication failed")]
    AuthFailed,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status")]
enum ServerResultKind {
    #[serde(rename = "ok")]
    Ok { ping: f32, info: ServerInfo },
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Clone, Debug, Serialize)]
struct ServerResult {
    address: String,
    #[serde(flatten)]
    kind: ServerResultKind,
}

impl ServerResult {
    fn new(address: String, result: Result<(Duration, ServerInfo), ClientError>) -> Self {
        let kind = match result {
            Ok((ping, info)) => ServerResultKind::Ok {
                ping: ping.as_micros() as f32 / 1000.0,
                info,
            },
            Err(ClientError::Timeout) => ServerResultKind::Timeout,
            Err(e) => ServerResultKind::Error {
                message: e.to_string(),
            },
        };
        Self { address, kind }
    }
}

#[derive(Clone, Debug, Serialize)]
struct ServerInfo {
    name: String,
    map: String,
    folder: String,
    game: String,
    app_id: u16,
    protocol: u8,
    players: u8,
    max_players: u8,
    bots: u8,
    server_type: String,
    os: String,
    password: bool,
    secure: bool,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    keywords: Option<String>,
}

impl From<&ProtocolServerInfo> for ServerInfo {
    fn from(other: &ProtocolServerInfo) -> Self {
        Self {
            name: other.name.clone(),
            map: other.map.clone(),
            folder: other.folder.clone(),
            game: other.game.clone(),
            app_id: other.app_id,
            protocol: other.protocol,
            players: other.players,
            max_players: other.max_players,
            bots: other.bots,
            server_type: other.server_type.to_string(),
            os: other.os.to_string(),
            password: other.has_password(),
            secure: other.is_secure(),
            version: other.version.clone(),
            keywords: other.extra.keywords.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct PlayerInfo {
    index: u8,
    name: String,
    score: i32,
    time: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ping: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loss: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl From<&Player> for PlayerInfo {
    fn from(other: &Player) -> Self {
        let status = other.status.clone().unwrap_or_default();
        Self {
            index: other.index,
            name: other.name.clone(),
            score: other.score,
            time: other.time,
            user_id: status.user_id,
            unique_id: status.unique_id,
            ping: status.ping,
            loss: status.loss,
            address: status.address,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct InfoResult<'a> {
    timeout: u64,
    servers: &'a [ServerResult],
}

#[derive(Clone, Debug, Serialize)]
struct ListResult<'a> {
    masters: &'a [String],
    region: u8,
    filter: String,
    servers: &'a [String],
}

#[derive(Clone, Debug, Serialize)]
struct RulesResult<'a> {
    address: SocketAddr,
    rules: &'a Rules,
}

#[derive(Clone, Debug, Serialize)]
struct PlayersResult<'a> {
    address: SocketAddr,
    players: &'a [PlayerInfo],
}

#[derive(Clone, Debug, Serialize)]
struct RconResult<'a> {
    address: SocketAddr,
    command: &'a str,
    output: &'a str,
}

/// Game server with the engine selected at run time.
enum Server {
    Source(SourceServer),
    GoldSrc(GoldSrcServer),
}

macro_rules! with_server {
    ($server:expr, $s:ident => $body:expr) => {
        match $server {
            Server::Source($s) => $body,
            Server::GoldSrc($s) => $body,
        }
    };
}

impl Server {
    fn connect(address: &str, engine: EngineKind) -> Result<Self, ClientError> {
        Ok(match engine {
            EngineKind::Source => Self::Source(SourceServer::new(address)?),
            EngineKind::GoldSrc => Self::GoldSrc(GoldSrcServer::new(address)?),
            EngineKind::Hltv => Self::GoldSrc(GoldSrcServer::hltv(address)?),
        })
    }

    fn addr(&self) -> SocketAddr {
        with_server!(self, s => s.addr())
    }
}

/// Calls `f` for every resolved address of the server until it succeeds.
fn with_failover<E, T, F>(server: &mut GameServer<E>, mut f: F) -> Result<T, ClientError>
where
    E: Engine,
    F: FnMut(&mut GameServer<E>) -> Result<T, ClientError>,
{
    loop {
        match f(server) {
            Err(e) if e.is_transport() => {
                debug!("{}: {}", server.addr(), e);
                if server.rotate()? {
                    return Err(e);
                }
            }
            ret => return ret,
        }
    }
}

fn fetch_info<E: Engine>(
    server: &mut GameServer<E>,
) -> Result<(Duration, ServerInfo), ClientError> {
    with_failover(server, |s| {
        let ping = s.ping()?;
        let info = ServerInfo::from(s.server_info()?);
        Ok((ping, info))
    })
}

fn fetch_rules<E: Engine>(server: &mut GameServer<E>) -> Result<Rules, ClientError> {
    with_failover(server, |s| s.rules().cloned())
}

fn fetch_players<E: Engine>(
    server: &mut GameServer<E>,
    password: Option<&str>,
) -> Result<Vec<PlayerInfo>, ClientError> {
    with_failover(server, |s| s.update_players(password))?;
    let players = server.cache().players().unwrap_or_default();
    Ok(players.iter().map(PlayerInfo::from).collect())
}

fn exec_rcon<E: Engine>(
    server: &mut GameServer<E>,
    password: &str,
    command: &str,
) -> Result<String, Error> {
    if !with_failover(server, |s| s.rcon_auth(password))? {
        return Err(Error::AuthFailed);
    }
    Ok(server.rcon_exec(command)?)
}

fn cmp_address(a: &str, b: &str) -> cmp::Ordering {
    match (a.parse::<SocketAddr>(), b.parse::<SocketAddr>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

struct Quoted<T>(T);

impl<T: fmt::Display> fmt::Display for Quoted<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "\"{}\"", self.0)
    }
}

macro_rules! p {
    ($($key:ident: $value:expr),+ $(,)?) => {
        $(println!("    {}: {}", stringify!($key), $value);)+
    };
}

struct App {
    cli: Cli,
    cfg: Config,
}

impl App {
    fn region(&self) -> Region {
        self.cli.region.unwrap_or(self.cfg.master.region)
    }

    fn masters(&self) -> &[String] {
        self.cli.masters.as_deref().unwrap_or(&self.cfg.master.servers)
    }

    fn host_arg(&self) -> Result<&str, Error> {
        self.cli
            .args
            .get(1)
            .map(String::as_str)
            .ok_or(Error::MissingArgument("host"))
    }

    fn fetch_servers(&self) -> Result<Vec<String>, Error> {
        let masters = self.masters();
        let endpoint = Endpoint::resolve_all(masters.iter().map(String::as_str), MASTER_PORT)?;
        let mut master = MasterServer::from_endpoint(endpoint)?;
        master.set_retries(self.cli.retries);

        let servers = match master.get_servers(self.region(), &self.cli.filter, self.cli.force) {
            Ok(servers) => servers,
            Err(ClientError::DiscoveryExhausted { retries, servers }) => {
                warn!(
                    "{}: discovery stopped after {} failed attempts, {} servers received",
                    master.endpoint(),
                    retries,
                    servers.len()
                );
                servers
            }
            Err(e) => return Err(e.into()),
        };

        let mut servers: Vec<_> = servers.iter().map(|i| i.to_string()).collect();
        servers.sort_by(|a, b| cmp_address(a, b));
        servers.dedup();
        Ok(servers)
    }

    fn list_servers(&self) -> Result<(), Error> {
        let servers = self.fetch_servers()?;

        if self.cli.json {
            print_json(&ListResult {
                masters: self.masters(),
                region: self.region() as u8,
                filter: self.cli.filter.to_string(),
                servers: &servers,
            })
        } else {
            for i in servers {
                println!("{}", i);
            }
            Ok(())
        }
    }

    fn query_server_info(&self, hosts: &[String]) -> Result<(), Error> {
        let hosts = if hosts.is_empty() {
            self.fetch_servers()?
        } else {
            hosts.to_vec()
        };

        let (tx, rx) = mpsc::channel();
        let engine = self.cli.engine;
        let workers = hosts.len();
        for address in hosts {
            let tx = tx.clone();
            thread::spawn(move || {
                let result = Server::connect(&address, engine).and_then(|mut server| {
                    with_server!(&mut server, s => fetch_info(s))
                });
                // the receiver outlives all workers
                let _ = tx.send(ServerResult::new(address, result));
            });
        }
        drop(tx);

        let mut servers: Vec<_> = rx.iter().take(workers).collect();
        servers.sort_by(|a, b| cmp_address(&a.address, &b.address));

        if self.cli.json {
            return print_json(&InfoResult {
                timeout: self.cfg.client.timeout,
                servers: &servers,
            });
        }

        for i in &servers {
            match &i.kind {
                ServerResultKind::Ok { ping, info } => {
                    println!("server: {} [{:.3} ms]", i.address, ping);
                    let players = format!(
                        "{}/{} ({} bots)",
                        info.players, info.max_players, info.bots
                    );
                    p! {
                        status: Quoted("ok"),
                        name: Quoted(&info.name),
                        map: Quoted(&info.map),
                        folder: Quoted(&info.folder),
                        game: Quoted(&info.game),
                        app_id: info.app_id,
                        protocol: info.protocol,
                        players: players,
                        server_type: info.server_type,
                        os: info.os,
                        password: info.password,
                        secure: info.secure,
                        version: Quoted(&info.version),
                    }
                    if let Some(keywords) = &info.keywords {
                        p! { keywords: Quoted(keywords) }
                    }
                }
                ServerResultKind::Timeout => {
                    println!("server: {}", i.address);
                    p! { status: Quoted("timeout") }
                }
                ServerResultKind::Error { message } => {
                    println!("server: {}", i.address);
                    p! {
                        status: Quoted("error"),
                        message: Quoted(message),
                    }
                }
            }
            println!();
        }

        Ok(())
    }

    fn query_rules(&self) -> Result<(), Error> {
        let mut server = Server::connect(self.host_arg()?, self.cli.engine)?;
        let rules = with_server!(&mut server, s => fetch_rules(s))?;

        if self.cli.json {
            return print_json(&RulesResult {
                address: server.addr(),
                rules: &rules,
            });
        }

        println!("server: {}", server.addr());
        for (key, value) in &rules {
            println!("    {} = \"{}\"", key, value);
        }
        Ok(())
    }

    fn query_players(&self) -> Result<(), Error> {
        let mut server = Server::connect(self.host_arg()?, self.cli.engine)?;
        let password = self.cli.password.as_deref();
        let players = with_server!(&mut server, s => fetch_players(s, password))?;

        if self.cli.json {
            return print_json(&PlayersResult {
                address: server.addr(),
                players: &players,
            });
        }

        println!("server: {} [{} players]", server.addr(), players.len());
        for i in &players {
            let minutes = i.time as u32 / 60;
            let seconds = i.time as u32 % 60;
            print!(
                "    #{:<3} {:<32} {:>5} {:>3}:{:02}",
                i.index,
                Quoted(&i.name),
                i.score,
                minutes,
                seconds
            );
            if let Some(ping) = i.ping {
                print!(" {:>4} ms", ping);
            }
            if let Some(unique_id) = &i.unique_id {
                print!(" {}", unique_id);
            }
            if let Some(address) = &i.address {
                print!(" {}", address);
            }
            println!();
        }
        Ok(())
    }

    fn rcon(&self) -> Result<(), Error> {
        let host = self.host_arg()?;
        let command = self.cli.args[2..].join(" ");
        if command.is_empty() {
            return Err(Error::MissingArgument("command"));
        }
        let password = self.cli.password.as_deref().ok_or(Error::MissingPassword)?;

        let mut server = Server::connect(host, self.cli.engine)?;
        let output = with_server!(&mut server, s => exec_rcon(s, password, &command))?;

        if self.cli.json {
            print_json(&RconResult {
                address: server.addr(),
                command: &command,
                output: &output,
            })
        } else {
            println!("{}", output);
            Ok(())
        }
    }

    fn execute(&self) -> Result<(), Error> {
        match self.cli.args.first().map(|s| s.as_str()).unwrap_or_default() {
            "list" => self.list_servers(),
            "info" | "" => self.query_server_info(self.cli.args.get(1..).unwrap_or_default()),
            "rules" => self.query_rules(),
            "players" => self.query_players(),
            "rcon" => self.rcon(),
            _ => Err(Error::UndefinedCommand),
        }
    }
}

fn main() {
    let cli = cli::parse().unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(1);
    });

    let mut cfg = match &cli.config_path {
        Some(path) => config::load(&**path).unwrap_or_else(|e| {
            eprintln!("Failed to load config \"{}\": {}", path, e);
            process::exit(1);
        }),
        None => Config::default(),
    };

    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }

    if let Some(timeout) = cli.timeout {
        cfg.client.timeout = timeout;
    }

    if let Some(retries) = cli.retries {
        cfg.client.retries = retries;
    }

    let logger = logger::init();
    logger.update_config(&cfg.log);

    condenser::set_timeout(Duration::from_millis(cfg.client.timeout));
    condenser::set_retries(cfg.client.retries);

    let app = App { cli, cfg };
    if let Err(e) = app.execute() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

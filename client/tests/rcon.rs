mod common;

use std::net::SocketAddr;

use common::{encode, init_logger, rcon_server, udp_server, Request, TIMEOUT};
use condenser::{Endpoint, Error, GoldSrc, GoldSrcServer, Source, SourceServer};
use condenser_protocol::{
    rcon::{RconPacket, ResponseKind, AUTH_FAILED, SERVERDATA_AUTH, SERVERDATA_EXECCOMMAND},
    server::Packet,
};

const PASSWORD: &str = "secret";

fn value(id: i32, body: &str) -> RconPacket {
    RconPacket::new(id, ResponseKind::ResponseValue, body)
}

fn auth_response(id: i32) -> RconPacket {
    RconPacket::new(id, ResponseKind::AuthResponse, "")
}

/// Source RCON server which behaves like a real one.
fn handler(request: &Request) -> Option<Vec<RconPacket>> {
    let id = request.id;
    Some(match request.kind {
        SERVERDATA_AUTH if request.body == PASSWORD => vec![value(id, ""), auth_response(id)],
        SERVERDATA_AUTH => vec![value(id, ""), auth_response(AUTH_FAILED)],
        SERVERDATA_EXECCOMMAND => match request.body.as_str() {
            "status" => vec![value(id, "hostname: test\n"), value(id, "map: de_dust2\n")],
            "empty" => vec![value(id, "")],
            "mismatch" => vec![value(id + 1, "other")],
            "drop" => return None,
            _ => vec![value(id, "Unknown command\n")],
        },
        // terminator request is mirrored and followed by the echo packet
        _ => vec![value(id, ""), RconPacket::terminator_echo(id)],
    })
}

fn source_server(addr: SocketAddr) -> SourceServer {
    let endpoint = Endpoint::new("test", vec![addr]).unwrap();
    let mut server = SourceServer::from_endpoint(endpoint, Source::default()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server
}

#[test]
fn source_auth() {
    init_logger();
    let mut server = source_server(rcon_server(handler));
    assert!(!server.rcon_auth("wrong").unwrap());
    assert!(!server.rcon_authenticated());
    assert!(matches!(
        server.rcon_exec("status"),
        Err(Error::RconNotAuthenticated)
    ));

    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert!(server.rcon_authenticated());
    let id = server.engine().request_id();
    assert!((0..65536).contains(&id));
}

#[test]
fn source_exec() {
    init_logger();
    let mut server = source_server(rcon_server(handler));
    assert!(server.rcon_auth(PASSWORD).unwrap());

    assert_eq!(
        server.rcon_exec("status").unwrap(),
        "hostname: test\nmap: de_dust2"
    );
    assert_eq!(server.rcon_exec("echo").unwrap(), "Unknown command");
    assert_eq!(server.rcon_exec("empty").unwrap(), "");
    assert_eq!(
        server.rcon_exec("status").unwrap(),
        "hostname: test\nmap: de_dust2"
    );
    assert!(server.rcon_authenticated());
}

#[test]
fn source_mismatch_invalidates_session() {
    init_logger();
    let mut server = source_server(rcon_server(handler));
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert!(matches!(
        server.rcon_exec("mismatch"),
        Err(Error::RconNotAuthenticated)
    ));
    assert!(!server.rcon_authenticated());
    assert!(matches!(
        server.rcon_exec("status"),
        Err(Error::RconNotAuthenticated)
    ));

    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(
        server.rcon_exec("status").unwrap(),
        "hostname: test\nmap: de_dust2"
    );
}

#[test]
fn source_reauth_after_exec() {
    init_logger();
    let mut server = source_server(rcon_server(handler));
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(
        server.rcon_exec("status").unwrap(),
        "hostname: test\nmap: de_dust2"
    );

    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(
        server.rcon_exec("status").unwrap(),
        "hostname: test\nmap: de_dust2"
    );
    assert!(!server.rcon_auth("wrong").unwrap());
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(server.rcon_exec("echo").unwrap(), "Unknown command");
}

#[test]
fn source_drop_invalidates_session() {
    init_logger();
    let mut server = source_server(rcon_server(handler));
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert!(matches!(
        server.rcon_exec("drop"),
        Err(Error::RconNotAuthenticated)
    ));
    assert!(!server.rcon_authenticated());

    // a new connection is established by the next authentication
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(server.rcon_exec("echo").unwrap(), "Unknown command");
}

#[test]
fn source_ban() {
    init_logger();
    let mut server = source_server(rcon_server(|_| None));
    assert!(matches!(server.rcon_auth(PASSWORD), Err(Error::RconBan)));
    assert!(!server.rcon_authenticated());
}

fn goldsrc_handler(data: &[u8]) -> Vec<Vec<u8>> {
    let line = std::str::from_utf8(&data[4..]).unwrap();
    let text = match line {
        "challenge rcon" => "challenge rcon 1234567",
        "rcon 1234567 secret users" => {
            return vec![
                encode(&Packet::RconResponse("userid : uniqueid : name".to_owned())),
                encode(&Packet::RconResponse("1 : STEAM_0:0:1 : player".to_owned())),
            ];
        }
        "rcon 1234567 secret" => "",
        _ if line.starts_with("rcon 1234567 ") => "Bad rcon_password.",
        _ => "Bad challenge.",
    };
    vec![encode(&Packet::RconResponse(text.to_owned()))]
}

fn goldsrc_server(addr: SocketAddr, engine: GoldSrc) -> GoldSrcServer {
    let endpoint = Endpoint::new("test", vec![addr]).unwrap();
    let mut server = GoldSrcServer::from_endpoint(endpoint, engine).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server
}

#[test]
fn goldsrc_exec() {
    init_logger();
    let mut server = goldsrc_server(udp_server(goldsrc_handler), GoldSrc::default());
    assert!(matches!(
        server.rcon_exec("users"),
        Err(Error::RconNotAuthenticated)
    ));
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(
        server.rcon_exec("users").unwrap(),
        "userid : uniqueid : name 1 : STEAM_0:0:1 : player"
    );
    assert_eq!(server.engine().challenge(), Some(1234567));
}

#[test]
fn goldsrc_bad_password() {
    init_logger();
    let mut server = goldsrc_server(udp_server(goldsrc_handler), GoldSrc::default());
    assert!(server.rcon_auth("wrong").unwrap());
    assert!(matches!(
        server.rcon_exec("users"),
        Err(Error::RconNotAuthenticated)
    ));
    assert!(!server.rcon_authenticated());
}

#[test]
fn goldsrc_ban() {
    init_logger();
    let addr = udp_server(|_| {
        vec![encode(&Packet::RconResponse(
            "You have been banned from this server.".to_owned(),
        ))]
    });
    let mut server = goldsrc_server(addr, GoldSrc::default());
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert!(matches!(server.rcon_exec("users"), Err(Error::RconBan)));
}

#[test]
fn hltv_timeout_is_empty() {
    init_logger();
    let addr = udp_server(|data| {
        if &data[4..] == b"challenge rcon" {
            vec![encode(&Packet::RconResponse(
                "challenge rcon 42".to_owned(),
            ))]
        } else {
            Vec::new()
        }
    });
    let mut server = goldsrc_server(addr, GoldSrc::hltv());
    assert!(server.engine().is_hltv());
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert_eq!(server.rcon_exec("users").unwrap(), "");

    // a regular GoldSrc server must answer
    let mut server = goldsrc_server(addr, GoldSrc::default());
    assert!(server.rcon_auth(PASSWORD).unwrap());
    assert!(matches!(server.rcon_exec("users"), Err(Error::Timeout)));
}

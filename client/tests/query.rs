mod common;

use std::{
    io::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use common::{encode, init_logger, split, udp_server, TIMEOUT};
use condenser::{Category, Endpoint, Error, GoldSrc, GoldSrcServer, SourceServer};
use condenser_protocol::{
    game::{InfoRequest, PlayerRequest, RulesRequest, NO_CHALLENGE},
    player::Player,
    server::{Packet, Rules},
    split::{Compression, Fragment, Framing},
    ServerInfo,
};

const CHALLENGE: i32 = 0x1234_5678;

fn info() -> ServerInfo {
    ServerInfo {
        protocol: 17,
        name: "Test server".to_owned(),
        map: "de_dust2".to_owned(),
        folder: "cstrike".to_owned(),
        game: "Counter-Strike: Source".to_owned(),
        app_id: 240,
        players: 2,
        max_players: 16,
        version: "1.0.0.70".to_owned(),
        ..ServerInfo::default()
    }
}

fn rules(count: usize) -> Rules {
    let mut seed = 0x2545_f491_u32;
    (0..count)
        .map(|i| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (format!("rule_{}", i), format!("{:08x}", seed))
        })
        .collect()
}

fn players() -> Vec<Player> {
    vec![
        Player::new(0, "player", 3, 602.5),
        Player::new(1, "Bot", 0, 12.0),
    ]
}

/// A server which requires a challenge for every request.
fn challenge_server(framing: Framing) -> std::net::SocketAddr {
    udp_server(move |data| {
        let reply = if let Ok(p) = InfoRequest::decode(data) {
            match p.challenge {
                Some(CHALLENGE) => Packet::Info(info()),
                _ => Packet::Challenge(CHALLENGE),
            }
        } else if let Ok(p) = PlayerRequest::decode(data) {
            match p.challenge {
                CHALLENGE => Packet::Players(players()),
                _ => Packet::Challenge(CHALLENGE),
            }
        } else if let Ok(p) = RulesRequest::decode(data) {
            match p.challenge {
                CHALLENGE => Packet::Rules(rules(200)),
                _ => Packet::Challenge(CHALLENGE),
            }
        } else {
            return Vec::new();
        };

        let data = encode(&reply);
        if data.len() > 1000 {
            let mut list = split(framing, 7, &data, 500);
            list.reverse();
            list
        } else {
            vec![data]
        }
    })
}

#[test]
fn source_queries() {
    init_logger();
    let addr = challenge_server(Framing::Source);
    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));

    server.initialize().unwrap();
    assert!(server.cache().ping().is_some());
    assert_eq!(server.cache().challenge(), Some(CHALLENGE));
    assert_eq!(server.server_info().unwrap(), &info());

    assert_eq!(server.rules().unwrap(), &rules(200));
    assert_eq!(server.players().unwrap(), &players()[..]);

    server.invalidate();
    assert!(!server.cache().contains(Category::Players));
    assert_eq!(server.players().unwrap().len(), 2);
}

#[test]
fn goldsrc_split_rules() {
    init_logger();
    let addr = challenge_server(Framing::GoldSrc);
    let mut server = GoldSrcServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server.update_rules().unwrap();
    assert_eq!(server.cache().rules(), Some(&rules(200)));
}

#[test]
fn challenge_redispatch() {
    init_logger();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();
    let addr = udp_server(move |data| {
        counter.fetch_add(1, Ordering::SeqCst);
        let p = PlayerRequest::decode(data).unwrap();
        let reply = if p.challenge == NO_CHALLENGE {
            Packet::Challenge(CHALLENGE)
        } else {
            assert_eq!(p.challenge, CHALLENGE);
            Packet::Players(players())
        };
        vec![encode(&reply)]
    });

    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server.update_players(None).unwrap();
    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert_eq!(server.cache().challenge(), Some(CHALLENGE));
    assert_eq!(server.cache().players(), Some(&players()[..]));
}

#[test]
fn second_mismatch_fails() {
    init_logger();
    let addr = udp_server(|_| vec![encode(&Packet::Rules(rules(2)))]);
    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    assert!(matches!(
        server.update_server_info(),
        Err(Error::UnexpectedResponse)
    ));
    // unexpected responses are cached anyway
    assert_eq!(server.cache().rules(), Some(&rules(2)));
    assert!(server.cache().info().is_none());
}

#[test]
fn incomplete_split_times_out() {
    init_logger();
    let addr = udp_server(|_| {
        let data = encode(&Packet::Rules(rules(100)));
        let mut list = split(Framing::Source, 3, &data, 400);
        list.truncate(1);
        list
    });
    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    assert!(matches!(server.update_rules(), Err(Error::Timeout)));
    assert!(server.cache().rules().is_none());
}

fn compressed(id: i32, data: &[u8], chunk: usize, damage: bool) -> Vec<Vec<u8>> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
    encoder.write_all(data).unwrap();
    let mut packed = encoder.finish().unwrap();
    if damage {
        let i = packed.len() / 2;
        packed[i] ^= 0x55;
    }
    let crc32 = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(data);

    let chunks: Vec<&[u8]> = packed.chunks(chunk).collect();
    chunks
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            let mut buf = vec![0; chunk + 32];
            let n = Fragment {
                id: id | i32::MIN,
                number: i as u8,
                total: chunks.len() as u8,
                compression: (i == 0).then_some(Compression {
                    size: data.len() as u32,
                    crc32,
                }),
                payload,
            }
            .encode(Framing::Source, &mut buf)
            .unwrap();
            buf.truncate(n);
            buf
        })
        .collect()
}

#[test]
fn compressed_rules() {
    init_logger();
    let addr = udp_server(|_| {
        let data = encode(&Packet::Rules(rules(100)));
        let list = compressed(9, &data, 128, false);
        assert!(list.len() > 1);
        list
    });
    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server.update_rules().unwrap();
    assert_eq!(server.cache().rules(), Some(&rules(100)));
}

#[test]
fn corrupted_rules() {
    init_logger();
    let addr = udp_server(|_| {
        let data = encode(&Packet::Rules(rules(100)));
        compressed(9, &data, 128, true)
    });
    let mut server = SourceServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    assert!(matches!(
        server.update_rules(),
        Err(Error::CorruptPayload(_))
    ));
}

#[test]
fn goldsrc_skips_log_lines() {
    init_logger();
    let addr = udp_server(|_| {
        vec![
            encode(&Packet::LogString("L 01/01/2024 - 00:00:00: log".to_owned())),
            encode(&Packet::Info(info())),
        ]
    });
    let mut server = GoldSrcServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server.update_server_info().unwrap();
    assert_eq!(server.cache().info(), Some(&info()));
}

const STATUS: &str = "\
hostname:  Half-Life
version :  48/1.1.2.7/Stdio 7559 secure  (70)
map     :  crossfire at: 0 x, 0 y, 0 z
players :  2 active (16 max)

#      name userid uniqueid frag time ping loss adr
# 1 \"player\"   1 STEAM_0:0:42   3 10:02   34    0 10.0.0.5:27005
# 2 \"Bot\"   2 BOT   0 00:12   0    0
2 users
";

#[test]
fn players_with_status() {
    init_logger();
    let addr = udp_server(|data| {
        if let Ok(p) = PlayerRequest::decode(data) {
            let reply = match p.challenge {
                CHALLENGE => Packet::Players(players()),
                _ => Packet::Challenge(CHALLENGE),
            };
            return vec![encode(&reply)];
        }
        let reply = match &data[4..] {
            b"challenge rcon" => Packet::RconResponse("challenge rcon 555".to_owned()),
            b"rcon 555 secret status" => Packet::RconResponse(STATUS.to_owned()),
            b"rcon 555 secret" => Packet::RconResponse(String::new()),
            _ => return Vec::new(),
        };
        vec![encode(&reply)]
    });

    let mut server = GoldSrcServer::new(&addr.to_string()).unwrap();
    server.set_timeout(Some(TIMEOUT));
    server.update_players(Some("secret")).unwrap();
    assert_eq!(server.engine().challenge(), Some(555));

    let players = server.cache().players().unwrap();
    assert!(players.iter().all(Player::is_extended));
    let status = players[0].status.as_ref().unwrap();
    assert_eq!(status.user_id, Some(1));
    assert_eq!(status.ping, Some(34));
    assert_eq!(status.address.as_deref(), Some("10.0.0.5:27005"));
    assert!(players[1].is_bot());
    assert_eq!(players[1].status.as_ref().unwrap().ping, None);
}

#[test]
fn failover_to_next_address() {
    init_logger();
    let dead = common::silent_server();
    let alive = udp_server(|_| vec![encode(&Packet::Info(info()))]);
    let endpoint = Endpoint::new("test", vec![dead, alive]).unwrap();
    let mut server = GoldSrcServer::from_endpoint(endpoint, GoldSrc::default()).unwrap();
    server.set_timeout(Some(TIMEOUT));

    assert!(matches!(server.update_server_info(), Err(Error::Timeout)));
    assert!(!server.rotate().unwrap());
    assert_eq!(server.addr(), alive);
    server.update_server_info().unwrap();
    assert_eq!(server.cache().info(), Some(&info()));

    server.disconnect();
    server.update_ping().unwrap();
}

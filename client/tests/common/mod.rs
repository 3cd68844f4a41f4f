#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream, UdpSocket},
    thread,
    time::Duration,
};

use condenser_protocol::{
    rcon::{self, RconPacket, RconRequest},
    server::Packet,
    split::{Fragment, Framing},
};

pub const TIMEOUT: Duration = Duration::from_millis(200);

const SERVER_LIFETIME: Duration = Duration::from_secs(10);

struct Logger;
static LOGGER: Logger = Logger;

impl log::Log for Logger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        println!("{} - {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut buf = vec![0; 8192];
    let n = packet.encode(&mut buf).unwrap();
    buf.truncate(n);
    buf
}

pub fn split(framing: Framing, id: i32, data: &[u8], chunk: usize) -> Vec<Vec<u8>> {
    let chunks: Vec<&[u8]> = data.chunks(chunk).collect();
    chunks
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            let mut buf = vec![0; chunk + 32];
            let n = Fragment {
                id,
                number: i as u8,
                total: chunks.len() as u8,
                compression: None,
                payload,
            }
            .encode(framing, &mut buf)
            .unwrap();
            buf.truncate(n);
            buf
        })
        .collect()
}

/// Runs a UDP server which answers every datagram with datagrams returned by `handler`.
pub fn udp_server<F>(mut handler: F) -> SocketAddr
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
    sock.set_read_timeout(Some(SERVER_LIFETIME)).unwrap();
    let addr = sock.local_addr().unwrap();
    thread::spawn(move || {
        let mut buf = [0; 2048];
        while let Ok((n, peer)) = sock.recv_from(&mut buf) {
            for reply in handler(&buf[..n]) {
                sock.send_to(&reply, peer).unwrap();
            }
        }
    });
    addr
}

/// A UDP server which never answers.
pub fn silent_server() -> SocketAddr {
    udp_server(|_| Vec::new())
}

#[derive(Clone, Debug)]
pub struct Request {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut prefix = [0; 4];
    stream.read_exact(&mut prefix).ok()?;
    let size = rcon::frame_size(prefix).ok()?;
    let mut frame = vec![0; size + 4];
    frame[..4].copy_from_slice(&prefix);
    stream.read_exact(&mut frame[4..]).ok()?;
    let p = RconRequest::decode(&frame).ok()?;
    Some(Request {
        id: p.id,
        kind: p.kind,
        body: p.body.to_owned(),
    })
}

/// Runs a Source RCON server.
///
/// `handler` returns packets to send, `None` closes the connection.
pub fn rcon_server<F>(mut handler: F) -> SocketAddr
where
    F: FnMut(&Request) -> Option<Vec<RconPacket>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => break,
            };
            stream.set_read_timeout(Some(SERVER_LIFETIME)).unwrap();
            while let Some(request) = read_request(&mut stream) {
                let packets = match handler(&request) {
                    Some(packets) => packets,
                    None => break,
                };
                let mut buf = vec![0; 8192];
                for p in packets {
                    let n = p.encode(&mut buf).unwrap();
                    stream.write_all(&buf[..n]).unwrap();
                }
            }
        }
    });
    addr
}

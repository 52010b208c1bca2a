#![allow(dead_code)]

use asa_rcon_client::{deserialize_packet, serialize_packet, Packet, PacketType, AUTH_FAILED_ID};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

/// What the fake server does after receiving a request.
pub enum Reply {
    Packet(Packet),
    /// Sends the packet one byte at a time.
    Trickle(Packet),
    /// Closes the connection without answering.
    Close,
    /// Never answers, but keeps the connection open until the client goes away.
    Silent,
}

pub fn auth_accepted() -> Reply {
    Reply::Packet(Packet::new(0, PacketType::AUTH_RESPONSE, ""))
}

pub fn auth_rejected() -> Reply {
    Reply::Packet(Packet::new(AUTH_FAILED_ID, PacketType::AUTH_RESPONSE, ""))
}

pub fn response(body: &str) -> Packet {
    Packet::new(0, PacketType::RESPONSE_VALUE, body)
}

/// A single-connection RCON server answering each request with the next scripted reply.
pub struct FakeServer {
    pub addr: SocketAddr,
    handle: JoinHandle<Vec<Packet>>,
}

impl FakeServer {
    pub fn spawn(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_nodelay(true).unwrap();

            let mut buffer = Vec::new();
            let mut requests = Vec::new();

            for reply in replies {
                match read_request(&mut stream, &mut buffer) {
                    Some(request) => requests.push(request),
                    None => return requests,
                }

                match reply {
                    Reply::Packet(packet) => {
                        stream.write_all(&encode(&packet)).unwrap();
                    }
                    Reply::Trickle(packet) => {
                        for byte in encode(&packet) {
                            stream.write_all(&[byte]).unwrap();
                            stream.flush().unwrap();
                            std::thread::sleep(Duration::from_millis(1));
                        }
                    }
                    Reply::Close => return requests,
                    Reply::Silent => break,
                }
            }

            // Record anything else the client sends until it hangs up
            while let Some(request) = read_request(&mut stream, &mut buffer) {
                requests.push(request);
            }
            requests
        });

        FakeServer { addr, handle }
    }

    /// Waits for the client to disconnect and returns every request the server received.
    pub fn requests(self) -> Vec<Packet> {
        self.handle.join().unwrap()
    }
}

pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut buf = Vec::new();
    serialize_packet(packet, &mut buf).unwrap();
    buf
}

fn read_request(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> Option<Packet> {
    loop {
        if let Some((packet, rest)) = deserialize_packet(buffer).unwrap() {
            let consumed = buffer.len() - rest.len();
            buffer.drain(..consumed);
            return Some(packet);
        }

        let mut chunk = [0u8; 1024];
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(len) => buffer.extend_from_slice(&chunk[..len]),
        }
    }
}

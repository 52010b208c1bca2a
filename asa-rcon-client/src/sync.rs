//! Blocking RCON client.
//!
//! A session moves through [`NotAuthenticatedClient`] and [`AuthenticatedClient`] and ends when a
//! command is executed. Dropping a client at any point closes the connection.

use crate::{
    deserialize_packet, io_error, serialize_packet, Packet, PacketType, Timeouts, READ_CHUNK_LEN,
};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Connects to an RCON server.
pub fn connect<A: ToSocketAddrs>(
    addr: A,
    timeouts: Timeouts,
) -> crate::Result<NotAuthenticatedClient> {
    NotAuthenticatedClient::new(addr, timeouts)
}

/// Connects, authenticates with `password` and executes `command`, returning the server's reply
/// as is. The connection is closed before this returns, whatever the outcome.
pub fn exec_command<A: ToSocketAddrs>(
    addr: A,
    command: &str,
    password: &str,
    timeouts: Timeouts,
) -> crate::Result<Packet> {
    connect(addr, timeouts)?.authenticate(password)?.execute(command)
}

#[derive(Debug)]
pub struct NotAuthenticatedClient {
    inner: InnerClient,
}

#[derive(Debug)]
pub struct AuthenticatedClient {
    inner: InnerClient,
}

#[derive(Debug)]
struct InnerClient {
    stream: TcpStream,
    buffer: Vec<u8>,
    read_offset: usize,
    timeouts: Timeouts,
}

impl NotAuthenticatedClient {
    fn new<A: ToSocketAddrs>(addr: A, timeouts: Timeouts) -> crate::Result<Self> {
        let mut last_err = None;

        for socket_addr in addr.to_socket_addrs()? {
            log::debug!("Connecting to {}", socket_addr);

            match TcpStream::connect_timeout(&socket_addr, timeouts.connect) {
                Ok(stream) => {
                    return Ok(NotAuthenticatedClient {
                        inner: InnerClient::new(stream, timeouts)?,
                    })
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => io_error(err, timeouts.connect),
            None => {
                std::io::Error::new(ErrorKind::InvalidInput, "address resolved to nothing").into()
            }
        })
    }

    /// Sends the password and waits for the server's verdict.
    ///
    /// Fails with [`Error::AuthenticationFailed`](crate::Error::AuthenticationFailed) if the
    /// server answers with id `-1`. Any other reply is accepted.
    pub fn authenticate(self, pass: &str) -> crate::Result<AuthenticatedClient> {
        let mut inner = self.inner;

        log::debug!("Authenticating");
        let response = inner.request(&Packet::request(PacketType::AUTH, pass))?;
        if response.is_auth_failure() {
            return Err(crate::Error::AuthenticationFailed);
        }

        Ok(AuthenticatedClient { inner })
    }
}

impl AuthenticatedClient {
    /// Executes a command and returns the reply. The connection is closed afterwards.
    pub fn execute(self, cmd: &str) -> crate::Result<Packet> {
        let mut inner = self.inner;

        log::debug!("Executing `{}`", cmd);
        inner.request(&Packet::request(PacketType::EXEC_COMMAND, cmd))
    }
}

impl InnerClient {
    fn new(stream: TcpStream, timeouts: Timeouts) -> crate::Result<Self> {
        stream.set_read_timeout(Some(timeouts.io))?;
        stream.set_write_timeout(Some(timeouts.io))?;
        stream.set_nodelay(true)?;

        Ok(InnerClient {
            stream,
            buffer: Vec::new(),
            read_offset: 0,
            timeouts,
        })
    }

    fn request(&mut self, packet: &Packet) -> crate::Result<Packet> {
        self.send(packet)?;
        self.receive()
    }

    fn send(&mut self, packet: &Packet) -> crate::Result<()> {
        let mut buf = Vec::new();
        serialize_packet(packet, &mut buf)?;
        log::trace!("Sending {} byte frame", buf.len());

        self.stream
            .write_all(&buf)
            .and_then(|_| self.stream.flush())
            .map_err(|err| io_error(err, self.timeouts.io))
    }

    fn receive(&mut self) -> crate::Result<Packet> {
        // Repeatedly fetch data from the remote until a whole frame is buffered
        loop {
            if let Some((packet, remaining_buffer)) =
                deserialize_packet(&self.buffer[self.read_offset..])?
            {
                // Consume the bytes
                self.read_offset = self.buffer.len() - remaining_buffer.len();
                log::trace!("Received packet id {} type {}", packet.id, packet.packet_type);

                return Ok(packet);
            }

            // If all of the buffer has been consumed, it can be completely re-used
            if self.read_offset == self.buffer.len() {
                self.buffer.clear();
                self.read_offset = 0;
            }

            // Add some space to write into
            let write_start = self.buffer.len();
            self.buffer.resize(write_start + READ_CHUNK_LEN, 0);

            let result = self.stream.read(&mut self.buffer[write_start..]);

            // Shrink the buffer again so it only contains written data
            let write_len = *result.as_ref().unwrap_or(&0);
            self.buffer.truncate(write_start + write_len);

            match result {
                Ok(0) => return Err(crate::Error::ConnectionClosed),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(io_error(err, self.timeouts.io)),
            }
        }
    }
}

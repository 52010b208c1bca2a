//! Asynchronous RCON client, enabled with the `async` feature.
//!
//! Mirrors [`sync`](crate::sync) on top of Tokio. Every connect, read and write is bounded by the
//! session's [`Timeouts`].

use crate::{
    deserialize_packet, io_error, serialize_packet, Packet, PacketType, Timeouts, READ_CHUNK_LEN,
};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

pub async fn connect<A: ToSocketAddrs>(
    addr: A,
    timeouts: Timeouts,
) -> crate::Result<NotAuthenticatedClient> {
    NotAuthenticatedClient::new(addr, timeouts).await
}

/// Connects, authenticates with `password` and executes `command`, returning the server's reply
/// as is. The connection is closed before this returns, whatever the outcome.
pub async fn exec_command<A: ToSocketAddrs>(
    addr: A,
    command: &str,
    password: &str,
    timeouts: Timeouts,
) -> crate::Result<Packet> {
    connect(addr, timeouts)
        .await?
        .authenticate(password)
        .await?
        .execute(command)
        .await
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

async fn with_deadline<T, F>(deadline: Duration, io: F) -> crate::Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(deadline, io).await {
        Ok(result) => result.map_err(|err| io_error(err, deadline)),
        Err(_) => Err(crate::Error::Timeout(deadline)),
    }
}

impl NotAuthenticatedClient {
    async fn new<A: ToSocketAddrs>(addr: A, timeouts: Timeouts) -> crate::Result<Self> {
        let stream = with_deadline(timeouts.connect, TcpStream::connect(addr)).await?;
        stream.set_nodelay(true)?;

        if let Ok(peer) = stream.peer_addr() {
            log::debug!("Connected to {}", peer);
        }

        Ok(NotAuthenticatedClient {
            inner: InnerClient::new(stream, timeouts),
        })
    }

    /// Sends the password and waits for the server's verdict.
    ///
    /// Fails with [`Error::AuthenticationFailed`](crate::Error::AuthenticationFailed) if the
    /// server answers with id `-1`. Any other reply is accepted.
    pub async fn authenticate(self, pass: &str) -> crate::Result<AuthenticatedClient> {
        let mut inner = self.inner;

        log::debug!("Authenticating");
        let response = inner
            .request(&Packet::request(PacketType::AUTH, pass))
            .await?;
        if response.is_auth_failure() {
            return Err(crate::Error::AuthenticationFailed);
        }

        Ok(AuthenticatedClient { inner })
    }
}

impl AuthenticatedClient {
    /// Executes a command and returns the reply. The connection is closed afterwards.
    pub async fn execute(self, cmd: &str) -> crate::Result<Packet> {
        let mut inner = self.inner;

        log::debug!("Executing `{}`", cmd);
        inner
            .request(&Packet::request(PacketType::EXEC_COMMAND, cmd))
            .await
    }
}

impl InnerClient {
    fn new(stream: TcpStream, timeouts: Timeouts) -> Self {
        InnerClient {
            stream,
            buffer: Vec::new(),
            read_offset: 0,
            timeouts,
        }
    }

    async fn request(&mut self, packet: &Packet) -> crate::Result<Packet> {
        self.send(packet).await?;
        self.receive().await
    }

    async fn send(&mut self, packet: &Packet) -> crate::Result<()> {
        let mut buf = Vec::new();
        serialize_packet(packet, &mut buf)?;
        log::trace!("Sending {} byte frame", buf.len());

        with_deadline(self.timeouts.io, self.stream.write_all(&buf)).await
    }

    async fn receive(&mut self) -> crate::Result<Packet> {
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

            let result = with_deadline(
                self.timeouts.io,
                self.stream.read(&mut self.buffer[write_start..]),
            )
            .await;

            // Shrink the buffer again so it only contains written data
            let write_len = *result.as_ref().unwrap_or(&0);
            self.buffer.truncate(write_start + write_len);

            if write_len == 0 {
                result?;
                return Err(crate::Error::ConnectionClosed);
            }
        }
    }
}

//! This crate provides a blocking and an asynchronous RCON client for [ARK: Survival Ascended]
//! dedicated servers, along with the discovery logic that finds the admin password and RCON port
//! of a locally running server.
//!
//! Every exchange follows the same shape: connect, authenticate with the admin password, execute
//! exactly one command and disconnect. The session types enforce this, as executing a command
//! consumes the client.
//!
//! The blocking client lives in [`sync`] and is enabled by default. The asynchronous client lives
//! in [`async`](crate::r#async) and requires the `async` feature and a [Tokio](https://tokio.rs/)
//! runtime.
//!
//! # Example
//! ```rust,no_run
//! use asa_rcon_client::{CredentialResolver, Timeouts, DEFAULT_HOST};
//!
//! fn main() -> asa_rcon_client::Result<()> {
//!     let credentials = CredentialResolver::from_env().resolve()?;
//!
//!     let response = asa_rcon_client::sync::exec_command(
//!         (DEFAULT_HOST, credentials.port),
//!         "saveworld",
//!         &credentials.password,
//!         Timeouts::default(),
//!     )?;
//!
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```
//!
//! [ARK: Survival Ascended]: https://survivetheark.com/

use std::time::Duration;

mod credentials;
mod packet;
mod settings;
mod start_params;

#[cfg(feature = "async")]
pub mod r#async;
#[cfg(feature = "sync")]
pub mod sync;

pub use self::credentials::*;
pub use self::packet::*;
pub use self::settings::*;
pub use self::start_params::*;

/// Host the RCON client connects to when managing a server on the same machine.
pub const DEFAULT_HOST: &str = "127.0.0.1";

#[cfg(any(feature = "sync", feature = "async"))]
pub(crate) const READ_CHUNK_LEN: usize = 4096;

/// Error type for RCON operations and credential discovery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed by the server")]
    ConnectionClosed,

    #[error("packet body exceeds {0} bytes")]
    PacketTooLarge(usize),

    #[error("packet body contains a NUL byte")]
    BodyContainsNul,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("RCON password not found")]
    PasswordNotFound,

    #[error("RCON port not found")]
    PortNotFound,

    #[error("invalid RCON port `{0}`")]
    InvalidPort(String),

    #[error("RCON is disabled")]
    RconDisabled,

    #[error("could not load server settings: {0}")]
    Settings(#[source] ini::Error),
}

/// [`Result`] alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Upper bounds on how long a session may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish the TCP connection.
    pub connect: Duration,

    /// Time allowed for each individual read or write on the socket.
    pub io: Duration,
}

impl Timeouts {
    pub const DEFAULT: Duration = Duration::from_secs(5);

    pub fn new(connect: Duration, io: Duration) -> Self {
        Timeouts { connect, io }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts::new(Timeouts::DEFAULT, Timeouts::DEFAULT)
    }
}

/// Maps a socket error to the crate error, separating expired deadlines from other failures.
#[cfg(any(feature = "sync", feature = "async"))]
pub(crate) fn io_error(err: std::io::Error, deadline: Duration) -> Error {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout(deadline),
        std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
        _ => Error::Io(err),
    }
}

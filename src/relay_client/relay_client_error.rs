use std::{fmt, io};

use crate::relay::protocol::FrameError;
use crate::relay::protocol::RelayMsg;

/// Errors surfaced by [`RelayClient`](crate::relay_client::RelayClient).
#[derive(Debug)]
pub enum RelayClientError {
    Io(io::Error),
    Frame(FrameError),
    /// The relay closed the connection.
    Disconnected,
    /// The first frame after connecting was not `Welcome`.
    NoWelcome(Box<RelayMsg>),
}

impl fmt::Display for RelayClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Frame(e) => write!(f, "protocol error: {e}"),
            Self::Disconnected => write!(f, "relay closed the connection"),
            Self::NoWelcome(m) => write!(f, "expected Welcome, got {:?}", m.msg_type()),
        }
    }
}

impl std::error::Error for RelayClientError {}

impl From<io::Error> for RelayClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<FrameError> for RelayClientError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io_e) if io_e.kind() == io::ErrorKind::UnexpectedEof => {
                Self::Disconnected
            }
            FrameError::Io(io_e) => Self::Io(io_e),
            other => Self::Frame(other),
        }
    }
}

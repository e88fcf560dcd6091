use std::{fmt, io};

/// Protocol-level errors (body parsing/format issues, etc.).
#[derive(Debug)]
pub enum ProtoError {
    UnknownType(u8),
    BadVersion(u8),
    Truncated,
    InvalidUtf8,
    TooLarge { max: usize, actual: usize },
    InvalidFormat(&'static str),
    StringTooLong { max: usize, actual: usize },
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(t) => write!(f, "unknown message type 0x{t:02x}"),
            Self::BadVersion(v) => write!(f, "unsupported protocol version {v}"),
            Self::Truncated => write!(f, "message body truncated"),
            Self::InvalidUtf8 => write!(f, "string field is not valid UTF-8"),
            Self::TooLarge { max, actual } => {
                write!(f, "frame body of {actual} bytes exceeds limit of {max}")
            }
            Self::InvalidFormat(what) => write!(f, "invalid format: {what}"),
            Self::StringTooLong { max, actual } => {
                write!(f, "string of {actual} bytes exceeds limit of {max}")
            }
        }
    }
}

impl std::error::Error for ProtoError {}

/// Frame-level error wrapper: IO vs protocol.
#[derive(Debug)]
pub enum FrameError {
    Io(io::Error),
    Proto(ProtoError),
}

impl FrameError {
    /// True when the whole frame was consumed from the stream, so the reader
    /// can reject this one message and keep reading the next.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => false,
            Self::Proto(ProtoError::BadVersion(_) | ProtoError::TooLarge { .. }) => false,
            Self::Proto(_) => true,
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Proto(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ProtoError> for FrameError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}

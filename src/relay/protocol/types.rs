use std::fmt;

// ---- Basic types ----------------------------------------------------------

pub type RoomId = String;
pub type Identity = String;

/// Opaque, process-unique identifier of one live client connection.
///
/// Peers only ever see it as a string; the server never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One other member of a room, as announced to a joiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub connection_id: ConnectionId,
    pub identity: Identity,
}

/// Free-form chat payload: ordered `key = value` pairs echoed verbatim.
pub type MessageFields = Vec<(String, String)>;

use crate::relay::protocol::{ConnectionId, Identity, PeerInfo, RoomId};

/// A connection's membership record within one room.
///
/// The identity is fixed at join time; a rejoin creates a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub identity: Identity,
}

impl Member {
    pub fn new(connection_id: ConnectionId, identity: impl Into<Identity>) -> Self {
        Self {
            connection_id,
            identity: identity.into(),
        }
    }

    pub fn to_peer_info(&self) -> PeerInfo {
        PeerInfo {
            connection_id: self.connection_id.clone(),
            identity: self.identity.clone(),
        }
    }
}

/// What `remove_member` took out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    pub member: Member,
}

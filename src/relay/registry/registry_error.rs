use std::fmt;

use crate::relay::protocol::{ConnectionId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The connection is not a member of the named room.
    MemberNotFound {
        room_id: RoomId,
        connection_id: ConnectionId,
    },
    /// The reverse index named a room whose member list did not contain the
    /// connection. The stale reverse entry has already been dropped.
    InconsistentMembership {
        room_id: RoomId,
        connection_id: ConnectionId,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemberNotFound {
                room_id,
                connection_id,
            } => write!(f, "connection {connection_id} is not a member of room {room_id}"),
            Self::InconsistentMembership {
                room_id,
                connection_id,
            } => write!(
                f,
                "reverse index mapped {connection_id} to room {room_id} without a matching member"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

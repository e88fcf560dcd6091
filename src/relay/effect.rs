use crate::relay::protocol::{ConnectionId, RelayMsg, RoomId};

/// Something the engine wants the transport layer to do.
///
/// Effects are applied in order, so a `LeaveGroup` followed by a `Broadcast`
/// to the same room no longer reaches the connection that left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver to exactly one connection.
    Send { to: ConnectionId, msg: RelayMsg },
    /// Deliver to every connection in the room's transport group.
    Broadcast {
        room_id: RoomId,
        except: Option<ConnectionId>,
        msg: RelayMsg,
    },
    JoinGroup {
        connection_id: ConnectionId,
        room_id: RoomId,
    },
    LeaveGroup {
        connection_id: ConnectionId,
        room_id: RoomId,
    },
}

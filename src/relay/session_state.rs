use crate::relay::protocol::RoomId;

/// Where a live connection stands in the join/leave lifecycle.
///
/// `disconnect` is terminal and is represented by the connection no longer
/// being known to the engine at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    Joined(RoomId),
}

use crate::relay::protocol::{ConnectionId, Identity, RoomId};
use crate::relay::registry::{Departure, Member, RegistryError};

/// Bidirectional index between rooms and the connections inside them.
///
/// Implementations must keep both directions in step: a connection has a
/// reverse entry iff it is listed in the member list of that room, and it is
/// listed in at most one room.
///
/// The relay only ever calls this from its single central loop, so methods
/// take `&mut self` and need no internal locking.
pub trait RoomRegistry: Send {
    /// Insert `connection_id` into `room_id` with the given identity.
    ///
    /// A connection already registered elsewhere (or in the same room) is
    /// moved: the previous membership is removed first and returned.
    fn add_member(
        &mut self,
        room_id: &str,
        connection_id: ConnectionId,
        identity: Identity,
    ) -> Option<Departure>;

    /// Remove the connection from whatever room it is in.
    ///
    /// `Ok(None)` when it was in no room.
    fn remove_member(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Result<Option<Departure>, RegistryError>;

    /// Current members of a room in join order; empty for unknown rooms.
    fn members_of(&self, room_id: &str) -> Vec<Member>;

    fn identity_of(
        &self,
        room_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<Identity, RegistryError>;

    fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId>;

    /// Number of rooms with at least one member.
    fn room_count(&self) -> usize;
}

use std::collections::{HashMap, HashSet};

use crate::relay::protocol::{ConnectionId, RoomId};

/// Transport-side broadcast groups, one per room.
///
/// This is what room-addressed deliveries fan out over; it is kept apart from
/// the registry the same way a socket layer keeps its own channel groups.
#[derive(Debug, Default)]
pub struct RoomGroups {
    groups: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, room_id: &str, connection_id: ConnectionId) {
        self.groups
            .entry(room_id.to_owned())
            .or_default()
            .insert(connection_id);
    }

    pub fn leave(&mut self, room_id: &str, connection_id: &ConnectionId) {
        if let Some(group) = self.groups.get_mut(room_id) {
            group.remove(connection_id);
            if group.is_empty() {
                self.groups.remove(room_id);
            }
        }
    }

    /// Drop the connection from every group (transport session torn down).
    pub fn leave_all(&mut self, connection_id: &ConnectionId) {
        for group in self.groups.values_mut() {
            group.remove(connection_id);
        }
        self.groups.retain(|_, g| !g.is_empty());
    }

    pub fn members(&self, room_id: &str) -> Vec<ConnectionId> {
        self.groups
            .get(room_id)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, room_id: &str, connection_id: &ConnectionId) -> bool {
        self.groups
            .get(room_id)
            .is_some_and(|g| g.contains(connection_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_all_clears_every_group() {
        let mut groups = RoomGroups::new();
        let a = ConnectionId::from("a");
        groups.join("r1", a.clone());
        groups.join("r2", a.clone());
        groups.join("r2", ConnectionId::from("b"));

        groups.leave_all(&a);

        assert!(groups.members("r1").is_empty());
        assert_eq!(groups.members("r2"), vec![ConnectionId::from("b")]);
    }

    #[test]
    fn leave_of_unknown_group_is_harmless() {
        let mut groups = RoomGroups::new();
        groups.leave("nope", &ConnectionId::from("a"));
        assert!(!groups.contains("nope", &ConnectionId::from("a")));
    }
}

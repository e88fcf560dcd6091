use std::collections::HashMap;

use crate::relay::protocol::{ConnectionId, Identity, RoomId};
use crate::relay::registry::{Departure, Member, RegistryError, RoomRegistry};

/// Process-local registry: room → members, connection → room.
///
/// Rooms exist only while they have members; the last departure drops the
/// room from the forward index.
#[derive(Debug, Default)]
pub struct InMemoryRoomRegistry {
    by_room: HashMap<RoomId, Vec<Member>>,
    by_connection: HashMap<ConnectionId, RoomId>,
}

impl InMemoryRoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that both indices describe the same memberships.
    pub fn is_consistent(&self) -> bool {
        let forward_total: usize = self.by_room.values().map(Vec::len).sum();
        if forward_total != self.by_connection.len() {
            return false;
        }
        if self.by_room.values().any(Vec::is_empty) {
            return false;
        }
        self.by_connection.iter().all(|(conn, room_id)| {
            self.by_room.get(room_id).is_some_and(|members| {
                members
                    .iter()
                    .filter(|m| &m.connection_id == conn)
                    .count()
                    == 1
            })
        })
    }
}

impl RoomRegistry for InMemoryRoomRegistry {
    fn add_member(
        &mut self,
        room_id: &str,
        connection_id: ConnectionId,
        identity: Identity,
    ) -> Option<Departure> {
        // A stale reverse entry is already dropped by remove_member, so the
        // error case needs no extra handling here.
        let previous = self.remove_member(&connection_id).ok().flatten();

        self.by_connection
            .insert(connection_id.clone(), room_id.to_owned());
        self.by_room
            .entry(room_id.to_owned())
            .or_default()
            .push(Member::new(connection_id, identity));

        previous
    }

    fn remove_member(
        &mut self,
        connection_id: &ConnectionId,
    ) -> Result<Option<Departure>, RegistryError> {
        let Some(room_id) = self.by_connection.remove(connection_id) else {
            return Ok(None);
        };

        let inconsistent = || RegistryError::InconsistentMembership {
            room_id: room_id.clone(),
            connection_id: connection_id.clone(),
        };

        let Some(members) = self.by_room.get_mut(&room_id) else {
            return Err(inconsistent());
        };

        let Some(pos) = members
            .iter()
            .position(|m| &m.connection_id == connection_id)
        else {
            if members.is_empty() {
                self.by_room.remove(&room_id);
            }
            return Err(inconsistent());
        };

        let member = members.remove(pos);
        if members.is_empty() {
            self.by_room.remove(&room_id);
        }

        Ok(Some(Departure { room_id, member }))
    }

    fn members_of(&self, room_id: &str) -> Vec<Member> {
        self.by_room.get(room_id).cloned().unwrap_or_default()
    }

    fn identity_of(
        &self,
        room_id: &str,
        connection_id: &ConnectionId,
    ) -> Result<Identity, RegistryError> {
        self.by_room
            .get(room_id)
            .and_then(|members| members.iter().find(|m| &m.connection_id == connection_id))
            .map(|m| m.identity.clone())
            .ok_or_else(|| RegistryError::MemberNotFound {
                room_id: room_id.to_owned(),
                connection_id: connection_id.clone(),
            })
    }

    fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.by_connection.get(connection_id).cloned()
    }

    fn room_count(&self) -> usize {
        self.by_room.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    fn ids(members: &[Member]) -> Vec<&str> {
        members.iter().map(|m| m.connection_id.as_str()).collect()
    }

    #[test]
    fn add_then_query_both_directions() {
        let mut reg = InMemoryRoomRegistry::new();
        assert!(reg.add_member("r1", conn("a"), "alice@x.com".into()).is_none());
        assert!(reg.add_member("r1", conn("b"), "bob@x.com".into()).is_none());

        assert_eq!(ids(&reg.members_of("r1")), vec!["a", "b"]);
        assert_eq!(reg.room_of(&conn("a")).as_deref(), Some("r1"));
        assert_eq!(reg.identity_of("r1", &conn("b")).unwrap(), "bob@x.com");
        assert!(reg.is_consistent());
    }

    #[test]
    fn unknown_room_has_no_members() {
        let reg = InMemoryRoomRegistry::new();
        assert!(reg.members_of("nowhere").is_empty());
        assert_eq!(reg.room_count(), 0);
    }

    #[test]
    fn identity_of_absent_member_is_member_not_found() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.add_member("r1", conn("a"), "alice@x.com".into());

        let err = reg.identity_of("r1", &conn("zzz")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::MemberNotFound {
                room_id: "r1".into(),
                connection_id: conn("zzz"),
            }
        );
        // a member of r1 is not found when asked about another room
        assert!(reg.identity_of("r2", &conn("a")).is_err());
    }

    #[test]
    fn remove_member_without_room_is_a_no_op() {
        let mut reg = InMemoryRoomRegistry::new();
        assert_eq!(reg.remove_member(&conn("ghost")), Ok(None));
        assert_eq!(reg.remove_member(&conn("ghost")), Ok(None));
    }

    #[test]
    fn last_departure_drops_the_room() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.add_member("r1", conn("a"), "alice@x.com".into());

        let dep = reg.remove_member(&conn("a")).unwrap().unwrap();
        assert_eq!(dep.room_id, "r1");
        assert_eq!(dep.member.identity, "alice@x.com");
        assert_eq!(reg.room_count(), 0);
        assert!(reg.room_of(&conn("a")).is_none());
        assert!(reg.is_consistent());
    }

    #[test]
    fn joining_a_second_room_moves_the_connection() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.add_member("r1", conn("a"), "alice@x.com".into());
        reg.add_member("r1", conn("b"), "bob@x.com".into());

        let moved = reg.add_member("r2", conn("a"), "alice@x.com".into());
        assert_eq!(moved.map(|d| d.room_id).as_deref(), Some("r1"));

        assert_eq!(ids(&reg.members_of("r1")), vec!["b"]);
        assert_eq!(ids(&reg.members_of("r2")), vec!["a"]);
        assert_eq!(reg.room_of(&conn("a")).as_deref(), Some("r2"));
        assert!(reg.is_consistent());
    }

    #[test]
    fn rejoining_the_same_room_does_not_duplicate() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.add_member("r1", conn("a"), "old@x.com".into());
        reg.add_member("r1", conn("a"), "new@x.com".into());

        assert_eq!(reg.members_of("r1").len(), 1);
        assert_eq!(reg.identity_of("r1", &conn("a")).unwrap(), "new@x.com");
        assert!(reg.is_consistent());
    }

    #[test]
    fn stale_reverse_entry_is_repaired() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.add_member("r1", conn("b"), "bob@x.com".into());
        // Corrupt: reverse index says "a" is in r1 but r1 does not list it.
        reg.by_connection.insert(conn("a"), "r1".into());
        assert!(!reg.is_consistent());

        let err = reg.remove_member(&conn("a")).unwrap_err();
        assert!(matches!(err, RegistryError::InconsistentMembership { .. }));
        assert!(reg.room_of(&conn("a")).is_none());
        assert_eq!(ids(&reg.members_of("r1")), vec!["b"]);
        assert!(reg.is_consistent());

        // second removal sees nothing left to do
        assert_eq!(reg.remove_member(&conn("a")), Ok(None));
    }

    #[test]
    fn reverse_entry_to_missing_room_is_repaired() {
        let mut reg = InMemoryRoomRegistry::new();
        reg.by_connection.insert(conn("a"), "gone".into());

        assert!(reg.remove_member(&conn("a")).is_err());
        assert!(reg.is_consistent());
    }

    #[test]
    fn random_join_leave_sequences_keep_indices_consistent() {
        let rooms = ["r1", "r2", "r3"];
        let conns: Vec<ConnectionId> = (0..8).map(|i| conn(&format!("c{i}"))).collect();

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut reg = InMemoryRoomRegistry::new();

            for _ in 0..200 {
                let c = &conns[rng.gen_range(0..conns.len())];
                if rng.gen_range(0..3) == 0 {
                    reg.remove_member(c).unwrap();
                    assert!(reg.room_of(c).is_none());
                    assert!(
                        rooms
                            .iter()
                            .all(|r| reg.members_of(r).iter().all(|m| &m.connection_id != c))
                    );
                } else {
                    let room = rooms[rng.gen_range(0..rooms.len())];
                    reg.add_member(room, c.clone(), format!("{c}@x.com"));
                    assert_eq!(reg.room_of(c).as_deref(), Some(room));
                }
                assert!(reg.is_consistent(), "seed {seed} broke consistency");
            }
        }
    }
}

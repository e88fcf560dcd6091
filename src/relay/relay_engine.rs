use std::collections::HashSet;
use std::sync::Arc;

use crate::log::NoopLogSink;
use crate::log::log_sink::LogSink;
use crate::relay::effect::Effect;
use crate::relay::errors::RelayErrorCode;
use crate::relay::presence_reply::PresenceReply;
use crate::relay::protocol::{ConnectionId, Identity, MessageFields, RelayMsg, RoomId};
use crate::relay::registry::{InMemoryRoomRegistry, RegistryError, RoomRegistry};
use crate::relay::session_state::SessionState;
use crate::{sink_debug, sink_info, sink_trace, sink_warn};

/// Largest room the relay accepts; `RoomJoined` counts peers in a u16.
pub const MAX_ROOM_MEMBERS: usize = u16::MAX as usize;

/// Room membership and message routing for every live connection.
///
/// The engine never touches sockets: each handler returns the [`Effect`]s the
/// transport layer must apply. It is owned by the central relay loop, which
/// gives every handler exclusive access to the registry for its whole run.
pub struct RelayEngine {
    registry: Box<dyn RoomRegistry>,
    connections: HashSet<ConnectionId>,
    presence_reply: PresenceReply,
    max_room_members: usize,
    log: Arc<dyn LogSink>,
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayEngine {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_log_and_registry(log, Box::new(InMemoryRoomRegistry::new()))
    }

    /// Fully explicit constructor: custom logger + custom registry backend.
    pub fn with_log_and_registry(log: Arc<dyn LogSink>, registry: Box<dyn RoomRegistry>) -> Self {
        Self {
            registry,
            connections: HashSet::new(),
            presence_reply: PresenceReply::default(),
            max_room_members: MAX_ROOM_MEMBERS,
            log,
        }
    }

    pub fn with_presence_reply(mut self, mode: PresenceReply) -> Self {
        self.presence_reply = mode;
        self
    }

    /// Clamped to `1..=MAX_ROOM_MEMBERS`.
    pub fn with_max_room_members(mut self, max: usize) -> Self {
        self.max_room_members = max.clamp(1, MAX_ROOM_MEMBERS);
        self
    }

    pub fn registry(&self) -> &dyn RoomRegistry {
        self.registry.as_ref()
    }

    pub fn is_connected(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// `None` once the connection has disconnected (or was never seen).
    pub fn session_state(&self, connection_id: &ConnectionId) -> Option<SessionState> {
        if !self.connections.contains(connection_id) {
            return None;
        }
        Some(match self.registry.room_of(connection_id) {
            Some(room_id) => SessionState::Joined(room_id),
            None => SessionState::Unjoined,
        })
    }

    /// A new transport session exists; it starts out in no room.
    pub fn handle_connect(&mut self, connection_id: ConnectionId) -> Vec<Effect> {
        if !self.connections.insert(connection_id.clone()) {
            sink_warn!(
                self.log,
                "connection {} registered twice; keeping existing state",
                connection_id
            );
            return Vec::new();
        }

        sink_info!(
            self.log,
            "connection {} registered ({} live)",
            connection_id,
            self.connections.len()
        );

        vec![Effect::Send {
            to: connection_id.clone(),
            msg: RelayMsg::Welcome { connection_id },
        }]
    }

    /// Main entrypoint: handle an event from a client.
    pub fn handle(&mut self, from: &ConnectionId, msg: RelayMsg) -> Vec<Effect> {
        if !self.connections.contains(from) {
            sink_warn!(
                self.log,
                "dropping {:?} from unknown connection {}",
                msg.msg_type(),
                from
            );
            return Vec::new();
        }

        match msg {
            RelayMsg::JoinRoom { room_id, identity } => self.handle_join(from, room_id, identity),

            RelayMsg::LeaveRoom { room_id } => self.handle_leave(from, room_id),

            RelayMsg::ConnectionInit { peer_id } => {
                let sender = from.clone();
                self.relay_to_peer(from, peer_id, RelayMsg::ConnectionInit { peer_id: sender })
            }

            RelayMsg::ConnectionSignal { peer_id, signal } => {
                let sender = from.clone();
                self.relay_to_peer(
                    from,
                    peer_id,
                    RelayMsg::ConnectionSignal {
                        peer_id: sender,
                        signal,
                    },
                )
            }

            RelayMsg::SendMessage { room_id, fields } => {
                self.handle_send_message(from, room_id, fields)
            }

            RelayMsg::RequestUsername {
                query_connection_id,
                room_id,
            } => self.handle_request_username(from, query_connection_id, room_id),

            RelayMsg::Ping { nonce } => vec![Effect::Send {
                to: from.clone(),
                msg: RelayMsg::Pong { nonce },
            }],

            RelayMsg::Welcome { .. }
            | RelayMsg::Rejected { .. }
            | RelayMsg::RoomJoined { .. }
            | RelayMsg::ParticipantJoined { .. }
            | RelayMsg::ParticipantLeft { .. }
            | RelayMsg::SendMessageToRoom { .. }
            | RelayMsg::ReceiveUsername { .. }
            | RelayMsg::Pong { .. } => {
                sink_warn!(
                    self.log,
                    "ignoring server-only msg from connection {}: {:?}",
                    from,
                    msg.msg_type()
                );
                Vec::new()
            }
        }
    }

    /// A frame from `from` could not be decoded; answer it and keep going.
    pub fn handle_malformed(
        &mut self,
        from: &ConnectionId,
        code: RelayErrorCode,
        reason: &str,
    ) -> Vec<Effect> {
        sink_warn!(
            self.log,
            "malformed frame from connection {}: {}",
            from,
            reason
        );
        if !self.connections.contains(from) {
            return Vec::new();
        }
        vec![reject(from, code, reason)]
    }

    /// The transport session is gone. Safe to call any number of times.
    pub fn handle_disconnect(&mut self, connection_id: &ConnectionId) -> Vec<Effect> {
        let was_live = self.connections.remove(connection_id);
        let out = self.leave_if_present(connection_id);

        if was_live {
            sink_info!(
                self.log,
                "connection {} disconnected ({} live)",
                connection_id,
                self.connections.len()
            );
        } else {
            sink_debug!(
                self.log,
                "disconnect for unknown connection {} ignored",
                connection_id
            );
        }
        out
    }

    // ---- Room session lifecycle ------------------------------------------

    fn handle_join(&mut self, from: &ConnectionId, room_id: RoomId, identity: Identity) -> Vec<Effect> {
        if room_id.is_empty() || identity.is_empty() {
            sink_warn!(
                self.log,
                "connection {} sent join-room with empty room or identity",
                from
            );
            return vec![reject(
                from,
                RelayErrorCode::MalformedPayload,
                "join-room needs a room id and an identity",
            )];
        }

        let others = self
            .registry
            .members_of(&room_id)
            .iter()
            .filter(|m| &m.connection_id != from)
            .count();
        if others >= self.max_room_members {
            sink_warn!(
                self.log,
                "connection {} refused: room {} is full ({} members)",
                from,
                room_id,
                others
            );
            return vec![reject(
                from,
                RelayErrorCode::RoomFull,
                &format!("room {room_id} is full"),
            )];
        }

        // One room per connection: leave the current one first.
        let mut out = self.leave_if_present(from);

        let peers = self
            .registry
            .members_of(&room_id)
            .iter()
            .map(|m| m.to_peer_info())
            .collect();

        if let Some(stale) = self
            .registry
            .add_member(&room_id, from.clone(), identity.clone())
        {
            sink_warn!(
                self.log,
                "registry still listed {} in room {} during join",
                from,
                stale.room_id
            );
        }

        sink_info!(
            self.log,
            "connection {} ({}) joined room {}",
            from,
            identity,
            room_id
        );

        out.push(Effect::JoinGroup {
            connection_id: from.clone(),
            room_id: room_id.clone(),
        });
        out.push(Effect::Broadcast {
            room_id: room_id.clone(),
            except: Some(from.clone()),
            msg: RelayMsg::ParticipantJoined {
                room_id: room_id.clone(),
                connection_id: from.clone(),
                identity,
            },
        });
        out.push(Effect::Send {
            to: from.clone(),
            msg: RelayMsg::RoomJoined { room_id, peers },
        });
        out
    }

    fn handle_leave(&mut self, from: &ConnectionId, room_id: RoomId) -> Vec<Effect> {
        if room_id.is_empty() {
            return vec![reject(
                from,
                RelayErrorCode::MalformedPayload,
                "leave-room needs a room id",
            )];
        }

        match self.registry.room_of(from) {
            Some(current) if current == room_id => self.leave_if_present(from),
            Some(current) => {
                sink_warn!(
                    self.log,
                    "connection {} asked to leave {} but is in {}",
                    from,
                    room_id,
                    current
                );
                vec![reject(
                    from,
                    RelayErrorCode::NotInRoom,
                    &format!("not a member of room {room_id}"),
                )]
            }
            None => {
                sink_debug!(
                    self.log,
                    "connection {} left {} while in no room",
                    from,
                    room_id
                );
                Vec::new()
            }
        }
    }

    /// Remove the connection from its room (if any) and tell the others.
    fn leave_if_present(&mut self, connection_id: &ConnectionId) -> Vec<Effect> {
        match self.registry.remove_member(connection_id) {
            Ok(Some(departure)) => {
                let room_id = departure.room_id;
                sink_info!(
                    self.log,
                    "connection {} ({}) left room {}",
                    connection_id,
                    departure.member.identity,
                    room_id
                );
                vec![
                    Effect::LeaveGroup {
                        connection_id: connection_id.clone(),
                        room_id: room_id.clone(),
                    },
                    Effect::Broadcast {
                        room_id: room_id.clone(),
                        except: None,
                        msg: RelayMsg::ParticipantLeft {
                            room_id,
                            connection_id: connection_id.clone(),
                        },
                    },
                ]
            }
            Ok(None) => Vec::new(),
            Err(RegistryError::InconsistentMembership { room_id, .. }) => {
                sink_warn!(
                    self.log,
                    "repaired stale registry entry: {} pointed at room {} without membership",
                    connection_id,
                    room_id
                );
                vec![Effect::LeaveGroup {
                    connection_id: connection_id.clone(),
                    room_id,
                }]
            }
            Err(err @ RegistryError::MemberNotFound { .. }) => {
                sink_warn!(self.log, "leave for {}: {}", connection_id, err);
                Vec::new()
            }
        }
    }

    // ---- Relay -----------------------------------------------------------

    /// Point-to-point delivery. Targets that are in no room (never joined,
    /// left, or disconnected) are dropped, never an error for the sender.
    fn relay_to_peer(&self, from: &ConnectionId, target: ConnectionId, msg: RelayMsg) -> Vec<Effect> {
        if target.is_empty() {
            return vec![reject(
                from,
                RelayErrorCode::MalformedPayload,
                "missing target connection id",
            )];
        }

        if self.registry.room_of(&target).is_none() {
            sink_warn!(
                self.log,
                "member not found: connection {} sent {:?} to {}, which is in no room; dropped",
                from,
                msg.msg_type(),
                target
            );
            return Vec::new();
        }

        sink_trace!(
            self.log,
            "relaying {:?} from {} to {}",
            msg.msg_type(),
            from,
            target
        );

        vec![Effect::Send { to: target, msg }]
    }

    fn handle_send_message(
        &self,
        from: &ConnectionId,
        room_id: RoomId,
        fields: MessageFields,
    ) -> Vec<Effect> {
        if room_id.is_empty() {
            return vec![reject(
                from,
                RelayErrorCode::MalformedPayload,
                "send-message needs a room id",
            )];
        }

        sink_debug!(
            self.log,
            "connection {} broadcasting {} field(s) to room {}",
            from,
            fields.len(),
            room_id
        );

        vec![Effect::Broadcast {
            room_id: room_id.clone(),
            except: None,
            msg: RelayMsg::SendMessageToRoom { room_id, fields },
        }]
    }

    // ---- Presence --------------------------------------------------------

    fn handle_request_username(
        &self,
        from: &ConnectionId,
        query: ConnectionId,
        room_id: RoomId,
    ) -> Vec<Effect> {
        if query.is_empty() || room_id.is_empty() {
            return vec![reject(
                from,
                RelayErrorCode::MalformedPayload,
                "request-username needs a connection id and a room id",
            )];
        }

        let identity = match self.registry.identity_of(&room_id, &query) {
            Ok(identity) => identity,
            Err(err) => {
                sink_warn!(
                    self.log,
                    "presence query from {} unanswered: {}",
                    from,
                    err
                );
                return Vec::new();
            }
        };

        let msg = RelayMsg::ReceiveUsername {
            identity,
            remote_connection_id: query,
        };

        match self.presence_reply {
            PresenceReply::Room => vec![Effect::Broadcast {
                room_id,
                except: None,
                msg,
            }],
            PresenceReply::Requester => vec![Effect::Send {
                to: from.clone(),
                msg,
            }],
        }
    }
}

fn reject(to: &ConnectionId, code: RelayErrorCode, reason: &str) -> Effect {
    Effect::Send {
        to: to.clone(),
        msg: RelayMsg::Rejected {
            code: code.as_u16(),
            reason: reason.to_owned(),
        },
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

    fn engine_with(conns: &[&str]) -> RelayEngine {
        let mut engine = RelayEngine::with_log(Arc::new(NoopLogSink));
        for c in conns {
            engine.handle_connect(conn(c));
        }
        engine
    }

    fn join(engine: &mut RelayEngine, c: &str, room: &str, identity: &str) -> Vec<Effect> {
        engine.handle(
            &conn(c),
            RelayMsg::JoinRoom {
                room_id: room.into(),
                identity: identity.into(),
            },
        )
    }

    fn sends_to<'a>(effects: &'a [Effect], target: &str) -> Vec<&'a RelayMsg> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send { to, msg } if to.as_str() == target => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Every reverse entry is backed by exactly one member, and every member
    /// points back at its room.
    fn assert_registry_consistent(engine: &RelayEngine, conns: &[ConnectionId], rooms: &[&str]) {
        let reg = engine.registry();
        for c in conns {
            if let Some(room) = reg.room_of(c) {
                let hits = reg
                    .members_of(&room)
                    .iter()
                    .filter(|m| &m.connection_id == c)
                    .count();
                assert_eq!(hits, 1, "{c} listed {hits} times in {room}");
            }
        }
        for room in rooms {
            for m in reg.members_of(room) {
                assert_eq!(reg.room_of(&m.connection_id).as_deref(), Some(*room));
            }
        }
    }

    #[test]
    fn connect_sends_welcome_with_own_id() {
        let mut engine = RelayEngine::new();
        let out = engine.handle_connect(conn("s1"));
        assert_eq!(
            out,
            vec![Effect::Send {
                to: conn("s1"),
                msg: RelayMsg::Welcome {
                    connection_id: conn("s1")
                },
            }]
        );
        assert_eq!(engine.session_state(&conn("s1")), Some(SessionState::Unjoined));
    }

    #[test]
    fn join_announces_to_room_and_lists_existing_peers() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");

        let out = join(&mut engine, "s2", "r1", "bob@x.com");

        assert!(out.contains(&Effect::JoinGroup {
            connection_id: conn("s2"),
            room_id: "r1".into(),
        }));
        assert!(out.contains(&Effect::Broadcast {
            room_id: "r1".into(),
            except: Some(conn("s2")),
            msg: RelayMsg::ParticipantJoined {
                room_id: "r1".into(),
                connection_id: conn("s2"),
                identity: "bob@x.com".into(),
            },
        }));
        match sends_to(&out, "s2").as_slice() {
            [RelayMsg::RoomJoined { room_id, peers }] => {
                assert_eq!(room_id, "r1");
                assert_eq!(peers.len(), 1);
                assert_eq!(peers[0].connection_id, conn("s1"));
                assert_eq!(peers[0].identity, "alice@x.com");
            }
            other => panic!("expected RoomJoined, got {:?}", other),
        }
        assert_eq!(
            engine.session_state(&conn("s2")),
            Some(SessionState::Joined("r1".into()))
        );
    }

    #[test]
    fn joining_another_room_leaves_the_first() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");
        join(&mut engine, "s2", "r1", "bob@x.com");

        let out = join(&mut engine, "s1", "r2", "alice@x.com");

        assert_eq!(
            out[0],
            Effect::LeaveGroup {
                connection_id: conn("s1"),
                room_id: "r1".into(),
            }
        );
        assert!(out.contains(&Effect::Broadcast {
            room_id: "r1".into(),
            except: None,
            msg: RelayMsg::ParticipantLeft {
                room_id: "r1".into(),
                connection_id: conn("s1"),
            },
        }));

        let reg = engine.registry();
        assert_eq!(reg.members_of("r1").len(), 1);
        assert_eq!(reg.members_of("r2").len(), 1);
        assert_eq!(reg.room_of(&conn("s1")).as_deref(), Some("r2"));
    }

    #[test]
    fn join_with_empty_identity_is_rejected() {
        let mut engine = engine_with(&["s1"]);
        let out = join(&mut engine, "s1", "r1", "");

        match sends_to(&out, "s1").as_slice() {
            [RelayMsg::Rejected { code, .. }] => {
                assert_eq!(*code, RelayErrorCode::MalformedPayload.as_u16())
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(engine.registry().room_count(), 0);
    }

    #[test]
    fn leave_of_other_room_is_rejected_and_changes_nothing() {
        let mut engine = engine_with(&["s1"]);
        join(&mut engine, "s1", "r1", "alice@x.com");

        let out = engine.handle(
            &conn("s1"),
            RelayMsg::LeaveRoom {
                room_id: "r2".into(),
            },
        );

        match sends_to(&out, "s1").as_slice() {
            [RelayMsg::Rejected { code, .. }] => {
                assert_eq!(*code, RelayErrorCode::NotInRoom.as_u16())
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert_eq!(
            engine.registry().room_of(&conn("s1")).as_deref(),
            Some("r1")
        );
    }

    #[test]
    fn full_room_refuses_join_and_keeps_current_room() {
        let mut engine = engine_with(&["a", "b", "c"]).with_max_room_members(2);
        join(&mut engine, "a", "r1", "a@x");
        join(&mut engine, "b", "r1", "b@x");
        join(&mut engine, "c", "r2", "c@x");

        let out = join(&mut engine, "c", "r1", "c@x");
        assert_eq!(
            out,
            vec![Effect::Send {
                to: conn("c"),
                msg: RelayMsg::Rejected {
                    code: RelayErrorCode::RoomFull.as_u16(),
                    reason: "room r1 is full".into(),
                },
            }]
        );
        assert_eq!(engine.registry().members_of("r1").len(), 2);
        assert_eq!(
            engine.session_state(&conn("c")),
            Some(SessionState::Joined("r2".into()))
        );

        // A member rejoining its own full room is not counted against itself.
        let out = join(&mut engine, "b", "r1", "b@x");
        assert_eq!(sends_to(&out, "b").len(), 1);
        assert!(matches!(sends_to(&out, "b")[0], RelayMsg::RoomJoined { .. }));
    }

    #[test]
    fn leave_while_unjoined_is_silent() {
        let mut engine = engine_with(&["s1"]);
        let out = engine.handle(
            &conn("s1"),
            RelayMsg::LeaveRoom {
                room_id: "r1".into(),
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn leave_returns_connection_to_unjoined() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");
        join(&mut engine, "s2", "r1", "bob@x.com");

        let out = engine.handle(
            &conn("s1"),
            RelayMsg::LeaveRoom {
                room_id: "r1".into(),
            },
        );

        assert_eq!(out.len(), 2);
        assert_eq!(engine.session_state(&conn("s1")), Some(SessionState::Unjoined));
        assert_eq!(engine.registry().members_of("r1").len(), 1);
    }

    #[test]
    fn disconnect_cleans_every_index() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");
        join(&mut engine, "s2", "r1", "bob@x.com");

        engine.handle_disconnect(&conn("s1"));

        let reg = engine.registry();
        assert!(reg.room_of(&conn("s1")).is_none());
        assert!(
            reg.members_of("r1")
                .iter()
                .all(|m| m.connection_id != conn("s1"))
        );
        assert!(!engine.is_connected(&conn("s1")));
        assert_eq!(engine.session_state(&conn("s1")), None);
    }

    #[test]
    fn second_disconnect_is_a_no_op() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");
        join(&mut engine, "s2", "r1", "bob@x.com");

        let first = engine.handle_disconnect(&conn("s1"));
        assert!(!first.is_empty());

        let members_before = engine.registry().members_of("r1");
        let second = engine.handle_disconnect(&conn("s1"));

        assert!(second.is_empty());
        assert_eq!(engine.registry().members_of("r1"), members_before);
        assert_eq!(engine.connection_count(), 1);
    }

    #[test]
    fn signal_goes_to_target_only_with_sender_id() {
        let mut engine = engine_with(&["a", "b", "c"]);
        for (c, who) in [("a", "a@x"), ("b", "b@x"), ("c", "c@x")] {
            join(&mut engine, c, "r1", who);
        }

        let out = engine.handle(
            &conn("a"),
            RelayMsg::ConnectionSignal {
                peer_id: conn("b"),
                signal: b"sdp-offer".to_vec(),
            },
        );

        assert_eq!(
            out,
            vec![Effect::Send {
                to: conn("b"),
                msg: RelayMsg::ConnectionSignal {
                    peer_id: conn("a"),
                    signal: b"sdp-offer".to_vec(),
                },
            }]
        );
    }

    #[test]
    fn connection_init_carries_sender_id() {
        let mut engine = engine_with(&["a", "b"]);
        join(&mut engine, "a", "r1", "a@x");
        join(&mut engine, "b", "r1", "b@x");
        let out = engine.handle(&conn("a"), RelayMsg::ConnectionInit { peer_id: conn("b") });
        assert_eq!(
            out,
            vec![Effect::Send {
                to: conn("b"),
                msg: RelayMsg::ConnectionInit { peer_id: conn("a") },
            }]
        );
    }

    #[test]
    fn signal_to_unknown_target_is_dropped() {
        let mut engine = engine_with(&["a"]);
        join(&mut engine, "a", "r1", "a@x");

        let out = engine.handle(
            &conn("a"),
            RelayMsg::ConnectionSignal {
                peer_id: conn("never-joined"),
                signal: vec![1, 2, 3],
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn signal_to_live_but_unjoined_target_is_dropped() {
        let mut engine = engine_with(&["a", "b"]);
        join(&mut engine, "a", "r1", "a@x");

        let out = engine.handle(
            &conn("a"),
            RelayMsg::ConnectionSignal {
                peer_id: conn("b"),
                signal: vec![1],
            },
        );
        assert!(out.is_empty(), "unexpected effects: {out:?}");

        let out = engine.handle(&conn("a"), RelayMsg::ConnectionInit { peer_id: conn("b") });
        assert!(out.is_empty(), "unexpected effects: {out:?}");
    }

    #[test]
    fn signal_to_target_that_left_is_dropped() {
        let mut engine = engine_with(&["a", "b"]);
        join(&mut engine, "a", "r1", "a@x");
        join(&mut engine, "b", "r1", "b@x");
        engine.handle(&conn("b"), RelayMsg::LeaveRoom { room_id: "r1".into() });

        let out = engine.handle(&conn("a"), RelayMsg::ConnectionInit { peer_id: conn("b") });
        assert!(out.is_empty(), "unexpected effects: {out:?}");
    }

    #[test]
    fn signal_to_disconnected_target_is_dropped() {
        let mut engine = engine_with(&["a", "b"]);
        engine.handle_disconnect(&conn("b"));

        let out = engine.handle(&conn("a"), RelayMsg::ConnectionInit { peer_id: conn("b") });
        assert!(out.is_empty());
    }

    #[test]
    fn send_message_is_a_room_broadcast_echoing_fields() {
        let mut engine = engine_with(&["a"]);
        let fields = vec![("text".to_string(), "hello".to_string())];
        let out = engine.handle(
            &conn("a"),
            RelayMsg::SendMessage {
                room_id: "r1".into(),
                fields: fields.clone(),
            },
        );
        assert_eq!(
            out,
            vec![Effect::Broadcast {
                room_id: "r1".into(),
                except: None,
                msg: RelayMsg::SendMessageToRoom {
                    room_id: "r1".into(),
                    fields,
                },
            }]
        );
    }

    #[test]
    fn presence_answer_is_broadcast_to_room() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");
        join(&mut engine, "s2", "r1", "bob@x.com");

        let out = engine.handle(
            &conn("s2"),
            RelayMsg::RequestUsername {
                query_connection_id: conn("s1"),
                room_id: "r1".into(),
            },
        );

        assert_eq!(
            out,
            vec![Effect::Broadcast {
                room_id: "r1".into(),
                except: None,
                msg: RelayMsg::ReceiveUsername {
                    identity: "alice@x.com".into(),
                    remote_connection_id: conn("s1"),
                },
            }]
        );
    }

    #[test]
    fn presence_answer_can_target_requester_only() {
        let mut engine = engine_with(&["s1", "s2"]).with_presence_reply(PresenceReply::Requester);
        join(&mut engine, "s1", "r1", "alice@x.com");

        let out = engine.handle(
            &conn("s2"),
            RelayMsg::RequestUsername {
                query_connection_id: conn("s1"),
                room_id: "r1".into(),
            },
        );

        assert_eq!(
            sends_to(&out, "s2"),
            vec![&RelayMsg::ReceiveUsername {
                identity: "alice@x.com".into(),
                remote_connection_id: conn("s1"),
            }]
        );
    }

    #[test]
    fn presence_for_unknown_member_is_skipped() {
        let mut engine = engine_with(&["s1", "s2"]);
        join(&mut engine, "s1", "r1", "alice@x.com");

        let out = engine.handle(
            &conn("s1"),
            RelayMsg::RequestUsername {
                query_connection_id: conn("s2"),
                room_id: "r1".into(),
            },
        );
        assert!(out.is_empty());

        // the engine keeps serving the room afterwards
        let out = engine.handle(
            &conn("s2"),
            RelayMsg::RequestUsername {
                query_connection_id: conn("s1"),
                room_id: "r1".into(),
            },
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn ping_gets_pong() {
        let mut engine = engine_with(&["s1"]);
        let out = engine.handle(&conn("s1"), RelayMsg::Ping { nonce: 99 });
        assert_eq!(
            out,
            vec![Effect::Send {
                to: conn("s1"),
                msg: RelayMsg::Pong { nonce: 99 },
            }]
        );
    }

    #[test]
    fn server_only_and_unknown_sender_messages_are_ignored() {
        let mut engine = engine_with(&["s1"]);
        assert!(
            engine
                .handle(&conn("s1"), RelayMsg::Pong { nonce: 1 })
                .is_empty()
        );
        assert!(
            engine
                .handle(&conn("stranger"), RelayMsg::Ping { nonce: 1 })
                .is_empty()
        );
    }

    #[test]
    fn malformed_frame_is_answered_with_rejection() {
        let mut engine = engine_with(&["s1"]);
        let out = engine.handle_malformed(&conn("s1"), RelayErrorCode::UnknownMessage, "type 0x7f");
        assert_eq!(
            sends_to(&out, "s1"),
            vec![&RelayMsg::Rejected {
                code: RelayErrorCode::UnknownMessage.as_u16(),
                reason: "type 0x7f".into(),
            }]
        );
    }

    #[test]
    fn random_lifecycles_keep_registry_consistent() {
        let rooms = ["r1", "r2", "r3"];
        let conns: Vec<ConnectionId> = (0..6).map(|i| conn(&format!("c{i}"))).collect();

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut engine = RelayEngine::new();
            for c in &conns {
                engine.handle_connect(c.clone());
            }

            for _ in 0..150 {
                let c = conns[rng.gen_range(0..conns.len())].clone();
                let room = rooms[rng.gen_range(0..rooms.len())];
                match rng.gen_range(0..4) {
                    0 | 1 => {
                        engine.handle(
                            &c,
                            RelayMsg::JoinRoom {
                                room_id: room.into(),
                                identity: format!("{c}@x.com"),
                            },
                        );
                    }
                    2 => {
                        engine.handle(
                            &c,
                            RelayMsg::LeaveRoom {
                                room_id: room.into(),
                            },
                        );
                    }
                    _ => {
                        engine.handle_disconnect(&c);
                        assert!(engine.registry().room_of(&c).is_none());
                        engine.handle_connect(c.clone());
                    }
                }
                assert_registry_consistent(&engine, &conns, &rooms);
            }
        }
    }
}

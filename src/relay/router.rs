use std::collections::HashMap;
use std::sync::Arc;

use crate::log::NoopLogSink;
use crate::log::log_sink::LogSink;
use crate::relay::effect::Effect;
use crate::relay::errors::RelayErrorCode;
use crate::relay::groups::RoomGroups;
use crate::relay::protocol::{ConnectionId, RelayMsg};
use crate::relay::relay_engine::RelayEngine;
use crate::sink_warn;

/// Router glues the RelayEngine to per-connection outboxes and to the
/// room broadcast groups.
pub struct Router {
    engine: RelayEngine,
    groups: RoomGroups,
    outboxes: HashMap<ConnectionId, Vec<RelayMsg>>,
    /// Connections whose outbox went from empty to non-empty since the last
    /// drain, in that order. May hold stale or repeated ids.
    pending: Vec<ConnectionId>,
    log: Arc<dyn LogSink>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_engine(RelayEngine::with_log(log.clone()), log)
    }

    pub fn with_engine(engine: RelayEngine, log: Arc<dyn LogSink>) -> Self {
        Self {
            engine,
            groups: RoomGroups::new(),
            outboxes: HashMap::new(),
            pending: Vec::new(),
            log,
        }
    }

    /// Register a new connection: creates its outbox and greets it.
    pub fn register_client(&mut self, connection_id: ConnectionId) {
        self.outboxes.entry(connection_id.clone()).or_default();
        let effects = self.engine.handle_connect(connection_id);
        self.apply(effects);
    }

    /// Unregister a connection:
    /// - lets the engine release its room membership and notify the room
    /// - tears down its transport groups and outbox
    pub fn unregister_client(&mut self, connection_id: &ConnectionId) {
        self.outboxes.remove(connection_id);

        let effects = self.engine.handle_disconnect(connection_id);
        self.apply(effects);

        self.groups.leave_all(connection_id);
    }

    /// Main entrypoint: handle a message coming *from* a connection.
    pub fn handle_from_client(&mut self, from: &ConnectionId, msg: RelayMsg) {
        let effects = self.engine.handle(from, msg);
        self.apply(effects);
    }

    /// A frame from `from` could not be decoded.
    pub fn handle_malformed(&mut self, from: &ConnectionId, code: RelayErrorCode, reason: &str) {
        let effects = self.engine.handle_malformed(from, code, reason);
        self.apply(effects);
    }

    /// Drain and return all outgoing messages for a given connection.
    pub fn take_outgoing_for(&mut self, connection_id: &ConnectionId) -> Vec<RelayMsg> {
        self.outboxes
            .get_mut(connection_id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Drain all pending outgoing messages.
    ///
    /// Each entry is (target, msg); per-target order is preserved. Only
    /// connections that received something since the last drain are visited.
    pub fn drain_all_outgoing(&mut self) -> Vec<(ConnectionId, RelayMsg)> {
        let mut result = Vec::new();
        for cid in std::mem::take(&mut self.pending) {
            if let Some(queue) = self.outboxes.get_mut(&cid) {
                result.extend(queue.drain(..).map(|m| (cid.clone(), m)));
            }
        }
        result
    }

    pub fn engine(&self) -> &RelayEngine {
        &self.engine
    }

    pub fn groups(&self) -> &RoomGroups {
        &self.groups
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, msg } => self.enqueue(&to, msg),
                Effect::Broadcast {
                    room_id,
                    except,
                    msg,
                } => {
                    for target in self.groups.members(&room_id) {
                        if except.as_ref() != Some(&target) {
                            self.enqueue(&target, msg.clone());
                        }
                    }
                }
                Effect::JoinGroup {
                    connection_id,
                    room_id,
                } => self.groups.join(&room_id, connection_id),
                Effect::LeaveGroup {
                    connection_id,
                    room_id,
                } => self.groups.leave(&room_id, &connection_id),
            }
        }
    }

    fn enqueue(&mut self, target: &ConnectionId, msg: RelayMsg) {
        match self.outboxes.get_mut(target) {
            Some(queue) => {
                if queue.is_empty() {
                    self.pending.push(target.clone());
                }
                queue.push(msg);
            }
            None => {
                sink_warn!(
                    self.log,
                    "no outbox for connection {}; dropped {:?}",
                    target,
                    msg.msg_type()
                );
            }
        }
    }
}

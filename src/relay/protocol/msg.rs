// ---- Public message enum --------------------------------------------------

use crate::relay::protocol::{ConnectionId, Identity, MessageFields, MsgType, PeerInfo, RoomId};

/// Every event that travels between a client and the relay.
///
/// `ConnectionInit` and `ConnectionSignal` are used in both directions: when a
/// client sends them, `peer_id` names the target; when the relay delivers them,
/// `peer_id` names the sender so the recipient can address a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMsg {
    // Connection lifecycle (server → client)
    Welcome {
        connection_id: ConnectionId,
    },
    Rejected {
        code: u16, // see RelayErrorCode
        reason: String,
    },

    // Room membership
    JoinRoom {
        room_id: RoomId,
        identity: Identity,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    RoomJoined {
        room_id: RoomId,
        peers: Vec<PeerInfo>,
    },
    ParticipantJoined {
        room_id: RoomId,
        connection_id: ConnectionId,
        identity: Identity,
    },
    ParticipantLeft {
        room_id: RoomId,
        connection_id: ConnectionId,
    },

    // Point-to-point negotiation
    ConnectionInit {
        peer_id: ConnectionId,
    },
    ConnectionSignal {
        peer_id: ConnectionId,
        signal: Vec<u8>, // opaque to the relay
    },

    // Room broadcast + presence
    SendMessage {
        room_id: RoomId,
        fields: MessageFields,
    },
    SendMessageToRoom {
        room_id: RoomId,
        fields: MessageFields,
    },
    RequestUsername {
        query_connection_id: ConnectionId,
        room_id: RoomId,
    },
    ReceiveUsername {
        identity: Identity,
        remote_connection_id: ConnectionId,
    },

    // Keepalive
    Ping {
        nonce: u64,
    },
    Pong {
        nonce: u64,
    },
}

impl RelayMsg {
    pub fn msg_type(&self) -> MsgType {
        use RelayMsg::*;
        match self {
            Welcome { .. } => MsgType::Welcome,
            Rejected { .. } => MsgType::Rejected,
            JoinRoom { .. } => MsgType::JoinRoom,
            LeaveRoom { .. } => MsgType::LeaveRoom,
            RoomJoined { .. } => MsgType::RoomJoined,
            ParticipantJoined { .. } => MsgType::ParticipantJoined,
            ParticipantLeft { .. } => MsgType::ParticipantLeft,
            ConnectionInit { .. } => MsgType::ConnectionInit,
            ConnectionSignal { .. } => MsgType::ConnectionSignal,
            SendMessage { .. } => MsgType::SendMessage,
            SendMessageToRoom { .. } => MsgType::SendMessageToRoom,
            RequestUsername { .. } => MsgType::RequestUsername,
            ReceiveUsername { .. } => MsgType::ReceiveUsername,
            Ping { .. } => MsgType::Ping,
            Pong { .. } => MsgType::Pong,
        }
    }
}

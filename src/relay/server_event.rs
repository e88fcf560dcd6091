use std::sync::mpsc::Sender;

use crate::relay::errors::RelayErrorCode;
use crate::relay::protocol::{ConnectionId, RelayMsg};

/// Events sent *to* the central relay thread.
pub enum ServerEvent {
    /// A new connection is registered with its outgoing channel.
    RegisterClient {
        client_id: ConnectionId,
        to_client: Sender<RelayMsg>,
    },

    /// A connection sent a well-formed message.
    MsgFromClient {
        client_id: ConnectionId,
        msg: RelayMsg,
    },

    /// A connection sent a frame that could not be decoded; the stream is
    /// still usable.
    MalformedFromClient {
        client_id: ConnectionId,
        code: RelayErrorCode,
        reason: String,
    },

    /// A connection went away (EOF, IO error, or unrecoverable frame).
    Disconnected { client_id: ConnectionId },
}

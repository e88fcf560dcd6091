use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::relay::protocol::{
    ConnectionId, FrameError, Identity, MAX_BODY_LEN, MessageFields, RelayMsg, RoomId, read_msg,
    write_msg,
};
use crate::relay_client::relay_client_error::RelayClientError;

/// Blocking client for the relay protocol.
///
/// Owns one TCP stream; reads and writes happen on the caller's thread.
pub struct RelayClient {
    stream: TcpStream,
    connection_id: ConnectionId,
}

impl RelayClient {
    /// Connects and waits for the relay's `Welcome`.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RelayClientError> {
        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        match read_msg(&mut stream, MAX_BODY_LEN)? {
            RelayMsg::Welcome { connection_id } => Ok(Self {
                stream,
                connection_id,
            }),
            other => Err(RelayClientError::NoWelcome(Box::new(other))),
        }
    }

    /// The id the relay assigned to this connection.
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn send(&mut self, msg: &RelayMsg) -> Result<(), RelayClientError> {
        write_msg(&mut self.stream, msg)?;
        Ok(())
    }

    /// Blocks until the next message arrives.
    pub fn recv(&mut self) -> Result<RelayMsg, RelayClientError> {
        self.stream.set_read_timeout(None)?;
        Ok(read_msg(&mut self.stream, MAX_BODY_LEN)?)
    }

    /// `Ok(None)` if nothing arrived within `timeout`.
    ///
    /// A timeout that fires mid-frame leaves the stream unusable; the relay
    /// writes whole frames, so in practice this only fires between frames.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<RelayMsg>, RelayClientError> {
        self.stream.set_read_timeout(Some(timeout))?;
        let res = read_msg(&mut self.stream, MAX_BODY_LEN);
        self.stream.set_read_timeout(None)?;

        match res {
            Ok(msg) => Ok(Some(msg)),
            Err(FrameError::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn join_room(
        &mut self,
        room_id: impl Into<RoomId>,
        identity: impl Into<Identity>,
    ) -> Result<(), RelayClientError> {
        self.send(&RelayMsg::JoinRoom {
            room_id: room_id.into(),
            identity: identity.into(),
        })
    }

    pub fn leave_room(&mut self, room_id: impl Into<RoomId>) -> Result<(), RelayClientError> {
        self.send(&RelayMsg::LeaveRoom {
            room_id: room_id.into(),
        })
    }

    pub fn signal_peer(
        &mut self,
        peer_id: &ConnectionId,
        signal: Vec<u8>,
    ) -> Result<(), RelayClientError> {
        self.send(&RelayMsg::ConnectionSignal {
            peer_id: peer_id.clone(),
            signal,
        })
    }

    pub fn send_to_room(
        &mut self,
        room_id: impl Into<RoomId>,
        fields: MessageFields,
    ) -> Result<(), RelayClientError> {
        self.send(&RelayMsg::SendMessage {
            room_id: room_id.into(),
            fields,
        })
    }

    /// Closes both directions; the relay sees a disconnect.
    pub fn close(self) -> Result<(), RelayClientError> {
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }
}

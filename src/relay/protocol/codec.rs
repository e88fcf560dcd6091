use super::{ConnectionId, MessageFields, MsgType, PeerInfo, ProtoError, RelayMsg};
use std::str;

// ---- Encode to body bytes -------------------------------------------------

pub fn encode_msg(msg: &RelayMsg) -> Result<(MsgType, Vec<u8>), ProtoError> {
    use RelayMsg::*;
    let mut body = Vec::new();

    match msg {
        Welcome { connection_id } => {
            put_str16(&mut body, connection_id.as_str())?;
        }
        Rejected { code, reason } => {
            put_u16(&mut body, *code);
            put_str16(&mut body, reason)?;
        }

        JoinRoom { room_id, identity } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, identity)?;
        }
        LeaveRoom { room_id } => {
            put_str16(&mut body, room_id)?;
        }
        RoomJoined { room_id, peers } => {
            put_str16(&mut body, room_id)?;
            put_count(&mut body, peers.len())?;
            for peer in peers {
                put_str16(&mut body, peer.connection_id.as_str())?;
                put_str16(&mut body, &peer.identity)?;
            }
        }
        ParticipantJoined {
            room_id,
            connection_id,
            identity,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, connection_id.as_str())?;
            put_str16(&mut body, identity)?;
        }
        ParticipantLeft {
            room_id,
            connection_id,
        } => {
            put_str16(&mut body, room_id)?;
            put_str16(&mut body, connection_id.as_str())?;
        }

        ConnectionInit { peer_id } => {
            put_str16(&mut body, peer_id.as_str())?;
        }
        ConnectionSignal { peer_id, signal } => {
            put_str16(&mut body, peer_id.as_str())?;
            put_bytes32(&mut body, signal)?;
        }

        SendMessage { room_id, fields } | SendMessageToRoom { room_id, fields } => {
            put_str16(&mut body, room_id)?;
            put_fields(&mut body, fields)?;
        }
        RequestUsername {
            query_connection_id,
            room_id,
        } => {
            put_str16(&mut body, query_connection_id.as_str())?;
            put_str16(&mut body, room_id)?;
        }
        ReceiveUsername {
            identity,
            remote_connection_id,
        } => {
            put_str16(&mut body, identity)?;
            put_str16(&mut body, remote_connection_id.as_str())?;
        }

        Ping { nonce } | Pong { nonce } => {
            put_u64(&mut body, *nonce);
        }
    }

    Ok((msg.msg_type(), body))
}

// ---- Decode from body bytes ----------------------------------------------

pub fn decode_msg(msg_type: MsgType, body: &[u8]) -> Result<RelayMsg, ProtoError> {
    use RelayMsg::*;
    let mut cursor = Cursor::new(body);

    let msg = match msg_type {
        MsgType::Welcome => Welcome {
            connection_id: cursor.get_conn_id()?,
        },
        MsgType::Rejected => {
            let code = cursor.get_u16()?;
            let reason = cursor.get_str16()?.to_owned();
            Rejected { code, reason }
        }

        MsgType::JoinRoom => {
            let room_id = cursor.get_str16()?.to_owned();
            let identity = cursor.get_str16()?.to_owned();
            JoinRoom { room_id, identity }
        }
        MsgType::LeaveRoom => LeaveRoom {
            room_id: cursor.get_str16()?.to_owned(),
        },
        MsgType::RoomJoined => {
            let room_id = cursor.get_str16()?.to_owned();
            let n = cursor.get_u16()? as usize;
            let mut peers = Vec::with_capacity(n);
            for _ in 0..n {
                let connection_id = cursor.get_conn_id()?;
                let identity = cursor.get_str16()?.to_owned();
                peers.push(PeerInfo {
                    connection_id,
                    identity,
                });
            }
            RoomJoined { room_id, peers }
        }
        MsgType::ParticipantJoined => {
            let room_id = cursor.get_str16()?.to_owned();
            let connection_id = cursor.get_conn_id()?;
            let identity = cursor.get_str16()?.to_owned();
            ParticipantJoined {
                room_id,
                connection_id,
                identity,
            }
        }
        MsgType::ParticipantLeft => {
            let room_id = cursor.get_str16()?.to_owned();
            let connection_id = cursor.get_conn_id()?;
            ParticipantLeft {
                room_id,
                connection_id,
            }
        }

        MsgType::ConnectionInit => ConnectionInit {
            peer_id: cursor.get_conn_id()?,
        },
        MsgType::ConnectionSignal => {
            let peer_id = cursor.get_conn_id()?;
            let len = cursor.get_u32()? as usize;
            let signal = cursor.get_bytes(len)?.to_vec();
            ConnectionSignal { peer_id, signal }
        }

        MsgType::SendMessage => {
            let room_id = cursor.get_str16()?.to_owned();
            let fields = cursor.get_fields()?;
            SendMessage { room_id, fields }
        }
        MsgType::SendMessageToRoom => {
            let room_id = cursor.get_str16()?.to_owned();
            let fields = cursor.get_fields()?;
            SendMessageToRoom { room_id, fields }
        }
        MsgType::RequestUsername => {
            let query_connection_id = cursor.get_conn_id()?;
            let room_id = cursor.get_str16()?.to_owned();
            RequestUsername {
                query_connection_id,
                room_id,
            }
        }
        MsgType::ReceiveUsername => {
            let identity = cursor.get_str16()?.to_owned();
            let remote_connection_id = cursor.get_conn_id()?;
            ReceiveUsername {
                identity,
                remote_connection_id,
            }
        }

        MsgType::Ping => Ping {
            nonce: cursor.get_u64()?,
        },
        MsgType::Pong => Pong {
            nonce: cursor.get_u64()?,
        },
    };

    cursor.finish()?;
    Ok(msg)
}

// ---- Primitive write helpers ---------------------------------------------

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// str16 = u16 length + UTF-8 bytes
fn put_str16(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtoError> {
    let bytes = s.as_bytes();
    let len = u16::try_from(bytes.len()).map_err(|_| ProtoError::StringTooLong {
        max: u16::MAX as usize,
        actual: bytes.len(),
    })?;

    put_u16(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

/// bytes32 = u32 length + raw bytes
fn put_bytes32(buf: &mut Vec<u8>, b: &[u8]) -> Result<(), ProtoError> {
    let len = u32::try_from(b.len()).map_err(|_| ProtoError::TooLarge {
        max: u32::MAX as usize,
        actual: b.len(),
    })?;
    put_u32(buf, len);
    buf.extend_from_slice(b);
    Ok(())
}

fn put_count(buf: &mut Vec<u8>, n: usize) -> Result<(), ProtoError> {
    let n = u16::try_from(n).map_err(|_| ProtoError::InvalidFormat("too many list entries"))?;
    put_u16(buf, n);
    Ok(())
}

/// fields = u16 count + (str16 key, str16 value)*
fn put_fields(buf: &mut Vec<u8>, fields: &MessageFields) -> Result<(), ProtoError> {
    put_count(buf, fields.len())?;
    for (k, v) in fields {
        put_str16(buf, k)?;
        put_str16(buf, v)?;
    }
    Ok(())
}

// ---- Cursor for decoding --------------------------------------------------

#[derive(Debug)]
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtoError> {
        let head = self.get_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn get_u16(&mut self) -> Result<u16, ProtoError> {
        Ok(u16::from_be_bytes(self.take::<2>()?))
    }

    fn get_u32(&mut self) -> Result<u32, ProtoError> {
        Ok(u32::from_be_bytes(self.take::<4>()?))
    }

    fn get_u64(&mut self) -> Result<u64, ProtoError> {
        Ok(u64::from_be_bytes(self.take::<8>()?))
    }

    fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtoError> {
        if self.buf.len() < len {
            return Err(ProtoError::Truncated);
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    /// Read str16 = u16 length + UTF-8 bytes
    fn get_str16(&mut self) -> Result<&'a str, ProtoError> {
        let len = self.get_u16()? as usize;
        let bytes = self.get_bytes(len)?;
        str::from_utf8(bytes).map_err(|_| ProtoError::InvalidUtf8)
    }

    fn get_conn_id(&mut self) -> Result<ConnectionId, ProtoError> {
        Ok(ConnectionId::new(self.get_str16()?))
    }

    fn get_fields(&mut self) -> Result<MessageFields, ProtoError> {
        let n = self.get_u16()? as usize;
        let mut fields = Vec::with_capacity(n);
        for _ in 0..n {
            let k = self.get_str16()?.to_owned();
            let v = self.get_str16()?.to_owned();
            fields.push((k, v));
        }
        Ok(fields)
    }

    /// Enforce that we've consumed the whole body.
    fn finish(self) -> Result<(), ProtoError> {
        if !self.buf.is_empty() {
            Err(ProtoError::InvalidFormat("trailing bytes in message body"))
        } else {
            Ok(())
        }
    }
}

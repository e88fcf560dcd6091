// ---- Message type byte ----------------------------------------------------

use crate::relay::protocol::ProtoError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MsgType {
    Welcome = 0x01,
    Rejected = 0x02,

    JoinRoom = 0x10,
    LeaveRoom = 0x11,
    RoomJoined = 0x12,
    ParticipantJoined = 0x13,
    ParticipantLeft = 0x14,

    ConnectionInit = 0x20,
    ConnectionSignal = 0x21,

    SendMessage = 0x30,
    SendMessageToRoom = 0x31,
    RequestUsername = 0x32,
    ReceiveUsername = 0x33,

    Ping = 0x40,
    Pong = 0x41,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Result<MsgType, ProtoError> {
        use MsgType::*;
        match v {
            0x01 => Ok(Welcome),
            0x02 => Ok(Rejected),
            0x10 => Ok(JoinRoom),
            0x11 => Ok(LeaveRoom),
            0x12 => Ok(RoomJoined),
            0x13 => Ok(ParticipantJoined),
            0x14 => Ok(ParticipantLeft),
            0x20 => Ok(ConnectionInit),
            0x21 => Ok(ConnectionSignal),
            0x30 => Ok(SendMessage),
            0x31 => Ok(SendMessageToRoom),
            0x32 => Ok(RequestUsername),
            0x33 => Ok(ReceiveUsername),
            0x40 => Ok(Ping),
            0x41 => Ok(Pong),
            other => Err(ProtoError::UnknownType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_byte_is_rejected() {
        assert!(matches!(
            MsgType::from_u8(0x7f),
            Err(ProtoError::UnknownType(0x7f))
        ));
    }

    #[test]
    fn type_byte_maps_back_to_itself() {
        for t in [MsgType::Welcome, MsgType::ConnectionSignal, MsgType::Pong] {
            assert!(matches!(MsgType::from_u8(t.as_u8()), Ok(back) if back == t));
        }
    }
}

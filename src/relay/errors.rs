/// Codes carried by `RelayMsg::Rejected`.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelayErrorCode {
    MalformedPayload = 1,
    NotInRoom = 2,
    UnknownMessage = 3,
    RoomFull = 4,
}

impl RelayErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::MalformedPayload),
            2 => Some(Self::NotInRoom),
            3 => Some(Self::UnknownMessage),
            4 => Some(Self::RoomFull),
            _ => None,
        }
    }
}

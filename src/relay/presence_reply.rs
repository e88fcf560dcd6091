use std::str::FromStr;

/// Who receives the answer to a `RequestUsername`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceReply {
    /// Every member of the room gets every answer.
    #[default]
    Room,
    /// Only the connection that asked.
    Requester,
}

impl FromStr for PresenceReply {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "room" => Ok(Self::Room),
            "requester" => Ok(Self::Requester),
            other => Err(format!(
                "invalid presence_reply '{other}' (expected 'room' or 'requester')"
            )),
        }
    }
}

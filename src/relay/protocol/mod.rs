pub mod codec;
pub mod constants;
pub mod errors;
pub mod framing;
pub mod msg;
pub mod msg_type;
pub mod types;

pub use codec::{decode_msg, encode_msg};
pub use constants::*;
pub use errors::{FrameError, ProtoError};
pub use framing::{read_frame, write_frame};
pub use msg::RelayMsg;
pub use msg_type::MsgType;
pub use types::{ConnectionId, Identity, MessageFields, PeerInfo, RoomId};

use std::io::{Read, Write};

/// Encode `msg` and write it as one frame.
pub fn write_msg<W: Write>(w: &mut W, msg: &RelayMsg) -> Result<(), FrameError> {
    let (msg_type, body) = encode_msg(msg)?;
    write_frame(w, msg_type.as_u8(), &body)?;
    Ok(())
}

/// Read one frame and decode it.
///
/// Errors for which [`FrameError::is_recoverable`] holds leave the stream
/// positioned at the next frame.
pub fn read_msg<R: Read>(r: &mut R, max_body: usize) -> Result<RelayMsg, FrameError> {
    let (type_byte, body) = read_frame(r, max_body)?;
    let msg_type = MsgType::from_u8(type_byte)?;
    Ok(decode_msg(msg_type, &body)?)
}

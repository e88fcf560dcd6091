use super::{FrameError, HEADER_LEN, PROTO_VERSION, ProtoError};
use std::io::{self, Read, Write};

/// Write a single frame: [ver][type][reserved u16=0][len u32][body...]
pub fn write_frame<W: Write>(w: &mut W, msg_type: u8, body: &[u8]) -> io::Result<()> {
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "body too large"))?;
    let mut header = [0u8; HEADER_LEN];
    header[0] = PROTO_VERSION;
    header[1] = msg_type;
    header[2] = 0;
    header[3] = 0;
    header[4..8].copy_from_slice(&len.to_be_bytes());
    w.write_all(&header)?;
    w.write_all(body)?;
    w.flush()?;
    Ok(())
}

/// Read a single frame, enforcing a max body length.
///
/// Returns the raw type byte; resolving it is left to the decoder so that an
/// unknown type is reported only after its body has been consumed.
pub fn read_frame<R: Read>(r: &mut R, max_body: usize) -> Result<(u8, Vec<u8>), FrameError> {
    let mut header = [0u8; HEADER_LEN];

    r.read_exact(&mut header)?; // io::Error -> FrameError::Io

    let ver = header[0];
    if ver != PROTO_VERSION {
        return Err(ProtoError::BadVersion(ver).into());
    }

    let msg_type_byte = header[1];

    // flags ignored for now
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    if len > max_body {
        return Err(ProtoError::TooLarge {
            max: max_body,
            actual: len,
        }
        .into());
    }

    let mut body = vec![0u8; len];
    r.read_exact(&mut body)?;

    Ok((msg_type_byte, body))
}

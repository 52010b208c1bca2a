/// Packet type values used on the wire.
///
/// `EXEC_COMMAND` and `AUTH_RESPONSE` share a value. A reply is told apart from a command by
/// the state of the exchange, never by the packet itself.
#[derive(Debug, Clone, Copy)]
pub struct PacketType;

impl PacketType {
    pub const RESPONSE_VALUE: i32 = 0;
    pub const EXEC_COMMAND: i32 = 2;
    pub const AUTH_RESPONSE: i32 = 2;
    pub const AUTH: i32 = 3;
}

/// Id carried by every packet the client sends.
pub const REQUEST_ID: i32 = 0;

/// Id the server answers an authentication request with when the password is rejected.
pub const AUTH_FAILED_ID: i32 = -1;

/// Largest body accepted in either direction.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

// size + id + type
const HEADER_LEN: usize = 3 * std::mem::size_of::<i32>();

// id + type + body terminator + trailing byte
const SIZE_OVERHEAD: i32 = 10;

/// A single RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Declared length of the rest of the packet. Not checked on receive.
    pub size: i32,
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, packet_type: i32, body: impl Into<String>) -> Self {
        let body = body.into();
        let size = i32::try_from(body.len())
            .unwrap_or(i32::MAX)
            .saturating_add(SIZE_OVERHEAD);

        Packet {
            size,
            id,
            packet_type,
            body,
        }
    }

    /// Creates a packet to be sent by the client.
    pub fn request(packet_type: i32, body: impl Into<String>) -> Self {
        Packet::new(REQUEST_ID, packet_type, body)
    }

    /// Returns `true` if this is the server rejecting an authentication request.
    pub fn is_auth_failure(&self) -> bool {
        self.id == AUTH_FAILED_ID
    }
}

pub fn serialize_packet(packet: &Packet, buf: &mut Vec<u8>) -> crate::Result<()> {
    let body = packet.body.as_bytes();
    if body.contains(&0) {
        return Err(crate::Error::BodyContainsNul);
    }
    if body.len() > MAX_BODY_LEN {
        return Err(crate::Error::PacketTooLarge(MAX_BODY_LEN));
    }

    buf.reserve(HEADER_LEN + body.len() + 2);
    buf.extend_from_slice(&packet.size.to_le_bytes());
    buf.extend_from_slice(&packet.id.to_le_bytes());
    buf.extend_from_slice(&packet.packet_type.to_le_bytes());
    buf.extend_from_slice(body);

    // Body terminator, then the empty trailing string
    buf.extend_from_slice(&[0, 0]);

    Ok(())
}

/// Attempts to read one packet from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not hold a complete frame yet, otherwise the packet and the
/// bytes that follow it. The body ends at its NUL terminator; the `size` field is not consulted.
pub fn deserialize_packet(buf: &[u8]) -> crate::Result<Option<(Packet, &[u8])>> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let (header, rest) = buf.split_at(HEADER_LEN);

    let body_len = match rest.iter().position(|val| *val == 0) {
        Some(len) if len > MAX_BODY_LEN => return Err(crate::Error::PacketTooLarge(MAX_BODY_LEN)),
        Some(len) => len,
        None if rest.len() > MAX_BODY_LEN => {
            return Err(crate::Error::PacketTooLarge(MAX_BODY_LEN))
        }
        None => return Ok(None),
    };

    // Wait for the trailing byte as well, so it is not mistaken for the start of the next frame
    let frame_len = body_len + 2;
    if rest.len() < frame_len {
        return Ok(None);
    }

    let packet = Packet {
        size: read_i32(&header[0..4]),
        id: read_i32(&header[4..8]),
        packet_type: read_i32(&header[8..12]),
        body: String::from_utf8_lossy(&rest[..body_len]).into_owned(),
    };

    Ok(Some((packet, &rest[frame_len..])))
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

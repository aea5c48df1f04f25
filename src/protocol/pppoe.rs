//! PPPoE protocol - RFC 2516
//!
//! Header layout and the TLV tag codec used by discovery packets.
//!
//! Every length read from the wire is checked against the bytes actually
//! present; a tag or header that claims more than the buffer holds ends the
//! parse instead of being trusted.

use crate::{Error, Result};

/// PPPoE Discovery EtherType
pub const PPPOE_DISCOVERY_ETHERTYPE: u16 = 0x8863;

/// PPPoE Session EtherType
pub const PPPOE_SESSION_ETHERTYPE: u16 = 0x8864;

/// PPPoE header size (ver/type + code + session_id + length)
pub const PPPOE_HEADER_SIZE: usize = 6;

/// Tag header size (type + length)
pub const TAG_HEADER_SIZE: usize = 4;

/// Largest PPP payload carried in a session frame (1500 - PPPoE header)
pub const PPPOE_MAX_PAYLOAD: usize = 1494;

/// PPPoE version (must be 1)
pub const PPPOE_VERSION: u8 = 1;

/// PPPoE type (must be 1)
pub const PPPOE_TYPE: u8 = 1;

/// PPPoE Discovery codes
pub mod codes {
    /// Active Discovery Initiation (broadcast from client)
    pub const PADI: u8 = 0x09;
    /// Active Discovery Offer (unicast from server)
    pub const PADO: u8 = 0x07;
    /// Active Discovery Request (unicast to server)
    pub const PADR: u8 = 0x19;
    /// Active Discovery Session-confirmation (assigns session_id)
    pub const PADS: u8 = 0x65;
    /// Active Discovery Terminate
    pub const PADT: u8 = 0xa7;
    /// Session data (code=0 in session stage)
    pub const SESSION: u8 = 0x00;

    /// Short name for logging
    pub fn name(code: u8) -> &'static str {
        match code {
            PADI => "PADI",
            PADO => "PADO",
            PADR => "PADR",
            PADS => "PADS",
            PADT => "PADT",
            SESSION => "SESSION",
            _ => "UNKNOWN",
        }
    }
}

/// PPPoE tag types used in Discovery packets
pub mod tags {
    /// End of list
    pub const END_OF_LIST: u16 = 0x0000;
    /// Service name (empty = any service)
    pub const SERVICE_NAME: u16 = 0x0101;
    /// Access Concentrator name
    pub const AC_NAME: u16 = 0x0102;
    /// Host unique identifier (used to match responses)
    pub const HOST_UNIQ: u16 = 0x0103;
    /// AC cookie (must be echoed back)
    pub const AC_COOKIE: u16 = 0x0104;
    /// Vendor specific
    pub const VENDOR_SPECIFIC: u16 = 0x0105;
    /// Relay session ID
    pub const RELAY_SESSION_ID: u16 = 0x0110;
    /// Service name error
    pub const SERVICE_NAME_ERROR: u16 = 0x0201;
    /// AC system error
    pub const AC_SYSTEM_ERROR: u16 = 0x0202;
    /// Generic error
    pub const GENERIC_ERROR: u16 = 0x0203;

    /// Error tags a peer may attach to PADO/PADS
    pub const ERRORS: [u16; 3] = [SERVICE_NAME_ERROR, AC_SYSTEM_ERROR, GENERIC_ERROR];
}

/// Encode one tag as `type | len | value`.
///
/// A value longer than `u16::MAX` is cut to `u16::MAX` bytes so the length
/// field always describes exactly the bytes that follow.
pub fn encode_tag(tag_type: u16, value: &[u8]) -> Vec<u8> {
    let value = &value[..value.len().min(u16::MAX as usize)];
    let mut out = Vec::with_capacity(TAG_HEADER_SIZE + value.len());
    out.extend_from_slice(&tag_type.to_be_bytes());
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out
}

/// Find the first tag of `tag_type` in a discovery payload.
///
/// Returns `None` if the tag is absent, or if the scan runs into a tag whose
/// length field overruns the payload before a match is found.
pub fn decode_tag(payload: &[u8], tag_type: u16) -> Option<&[u8]> {
    TagIter::new(payload)
        .find(|tag| tag.tag_type == tag_type)
        .map(|tag| tag.data)
}

/// Parsed PPPoE frame (zero-copy reference)
#[derive(Debug)]
pub struct PppoeFrame<'a> {
    buffer: &'a [u8],
}

impl<'a> PppoeFrame<'a> {
    /// Parse PPPoE frame from buffer
    ///
    /// Trailing bytes past the declared length (Ethernet padding) are ignored.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < PPPOE_HEADER_SIZE {
            return Err(Error::Parse("PPPoE frame too short".into()));
        }

        let frame = Self { buffer };

        if frame.version() != PPPOE_VERSION || frame.frame_type() != PPPOE_TYPE {
            return Err(Error::Parse(format!(
                "Invalid PPPoE version/type: {}/{}",
                frame.version(),
                frame.frame_type()
            )));
        }

        let payload_len = frame.length() as usize;
        if buffer.len() < PPPOE_HEADER_SIZE + payload_len {
            return Err(Error::Parse("PPPoE payload truncated".into()));
        }

        Ok(frame)
    }

    /// Version (4 bits, should be 1)
    pub fn version(&self) -> u8 {
        (self.buffer[0] >> 4) & 0x0f
    }

    /// Type (4 bits, should be 1)
    pub fn frame_type(&self) -> u8 {
        self.buffer[0] & 0x0f
    }

    /// Code (PADI, PADO, PADR, PADS, PADT, or 0 for session)
    pub fn code(&self) -> u8 {
        self.buffer[1]
    }

    /// Session ID (0 during discovery, assigned by the AC in PADS)
    pub fn session_id(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Payload length
    pub fn length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[4], self.buffer[5]])
    }

    /// Payload (tags for discovery, PPP frame for session)
    pub fn payload(&self) -> &'a [u8] {
        let len = self.length() as usize;
        &self.buffer[PPPOE_HEADER_SIZE..PPPOE_HEADER_SIZE + len]
    }

    /// Iterate over tags in discovery payload
    pub fn iter_tags(&self) -> TagIter<'a> {
        TagIter::new(self.payload())
    }

    /// First tag of the given type
    pub fn find_tag(&self, tag_type: u16) -> Option<&'a [u8]> {
        decode_tag(self.payload(), tag_type)
    }

    /// First error tag present, as (type, message bytes)
    pub fn error_tag(&self) -> Option<(u16, &'a [u8])> {
        self.iter_tags()
            .find(|tag| tags::ERRORS.contains(&tag.tag_type))
            .map(|tag| (tag.tag_type, tag.data))
    }
}

/// A PPPoE tag during iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PppoeTag<'a> {
    /// Tag type
    pub tag_type: u16,
    /// Tag data
    pub data: &'a [u8],
}

/// Iterator over the TLV tags of a discovery payload.
///
/// Stops at End-Of-List, at the end of the buffer, or at the first tag whose
/// declared length does not fit in what remains.
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TagIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = PppoeTag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.offset..)?;
        if rest.len() < TAG_HEADER_SIZE {
            return None;
        }

        let tag_type = u16::from_be_bytes([rest[0], rest[1]]);
        let tag_len = u16::from_be_bytes([rest[2], rest[3]]) as usize;

        if tag_type == tags::END_OF_LIST {
            self.offset = self.data.len();
            return None;
        }

        let Some(data) = rest.get(TAG_HEADER_SIZE..TAG_HEADER_SIZE + tag_len) else {
            // Overrunning length field: abandon the rest of the payload
            self.offset = self.data.len();
            return None;
        };

        self.offset += TAG_HEADER_SIZE + tag_len;
        Some(PppoeTag { tag_type, data })
    }
}

/// Builder for PPPoE frames
#[derive(Debug, Default)]
pub struct PppoeBuilder {
    code: u8,
    session_id: u16,
    payload: Vec<u8>,
}

impl PppoeBuilder {
    /// Discovery packet with the given code
    pub fn discovery(code: u8) -> Self {
        Self {
            code,
            session_id: 0,
            payload: Vec::new(),
        }
    }

    /// Session-stage packet
    pub fn session(session_id: u16) -> Self {
        Self {
            code: codes::SESSION,
            session_id,
            payload: Vec::new(),
        }
    }

    /// Set the session ID
    pub fn session_id(mut self, session_id: u16) -> Self {
        self.session_id = session_id;
        self
    }

    /// Append a raw tag
    pub fn add_tag(mut self, tag_type: u16, data: &[u8]) -> Self {
        self.payload.extend_from_slice(&encode_tag(tag_type, data));
        self
    }

    /// Append a tag only when `data` is non-empty
    pub fn add_tag_if_present(self, tag_type: u16, data: &[u8]) -> Self {
        if data.is_empty() {
            self
        } else {
            self.add_tag(tag_type, data)
        }
    }

    /// Service-Name tag (empty = any service)
    pub fn service_name(self, name: &[u8]) -> Self {
        self.add_tag(tags::SERVICE_NAME, name)
    }

    /// AC-Name tag
    pub fn ac_name(self, name: &[u8]) -> Self {
        self.add_tag(tags::AC_NAME, name)
    }

    /// Set payload directly (for session packets containing PPP)
    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the PPPoE frame
    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(PPPOE_HEADER_SIZE + self.payload.len());

        frame.push((PPPOE_VERSION << 4) | PPPOE_TYPE);
        frame.push(self.code);
        frame.extend_from_slice(&self.session_id.to_be_bytes());
        frame.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&self.payload);

        frame
    }
}

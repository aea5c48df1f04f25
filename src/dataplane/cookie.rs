//! Bounded byte strings for names and cookies taken off the wire

use std::fmt;

/// Capacity of every stored name or cookie
pub const COOKIE_CAPACITY: usize = 64;

/// Inline byte string of at most [`COOKIE_CAPACITY`] bytes.
///
/// The length is kept alongside the buffer and every comparison goes through
/// [`Cookie::as_bytes`], so bytes past `len` never take part in a match.
#[derive(Clone, Copy)]
pub struct Cookie {
    len: u8,
    buf: [u8; COOKIE_CAPACITY],
}

impl Cookie {
    pub const EMPTY: Cookie = Cookie {
        len: 0,
        buf: [0; COOKIE_CAPACITY],
    };

    /// Copy `bytes` in, `None` if they do not fit
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > COOKIE_CAPACITY {
            return None;
        }
        let mut cookie = Self::EMPTY;
        cookie.buf[..bytes.len()].copy_from_slice(bytes);
        cookie.len = bytes.len() as u8;
        Some(cookie)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for Cookie {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for Cookie {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Cookie {}

impl PartialEq<[u8]> for Cookie {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "{s:?}"),
            _ => {
                for byte in self.as_bytes() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

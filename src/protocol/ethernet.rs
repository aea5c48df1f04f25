//! Ethernet II framing for hosts that hand the engine whole frames

use super::{EtherType, MacAddr};
use crate::{Error, Result};

/// Ethernet header without VLAN tag
pub const HEADER_SIZE: usize = 14;
/// Ethernet header with one 802.1Q tag
pub const VLAN_HEADER_SIZE: usize = 18;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
    vlan_id: Option<u16>,
    payload_offset: usize,
}

impl<'a> Frame<'a> {
    /// Parse an Ethernet frame, skipping a single 802.1Q tag if present
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("frame too short".into()));
        }

        let outer = u16::from_be_bytes([buffer[12], buffer[13]]);
        if outer != EtherType::Vlan as u16 {
            return Ok(Self {
                buffer,
                vlan_id: None,
                payload_offset: HEADER_SIZE,
            });
        }

        if buffer.len() < VLAN_HEADER_SIZE {
            return Err(Error::Parse("VLAN frame too short".into()));
        }
        let tci = u16::from_be_bytes([buffer[14], buffer[15]]);
        Ok(Self {
            buffer,
            vlan_id: Some(tci & 0x0fff),
            payload_offset: VLAN_HEADER_SIZE,
        })
    }

    pub fn dst_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[0..6]);
        MacAddr(mac)
    }

    pub fn src_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[6..12]);
        MacAddr(mac)
    }

    /// Inner EtherType (after any VLAN tag)
    pub fn ethertype(&self) -> u16 {
        let offset = self.payload_offset - 2;
        u16::from_be_bytes([self.buffer[offset], self.buffer[offset + 1]])
    }

    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan_id
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.payload_offset..]
    }
}

/// Builder for constructing Ethernet frames
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new(dst: MacAddr, src: MacAddr) -> Self {
        let mut buffer = Vec::with_capacity(1518);
        buffer.extend_from_slice(&dst.0);
        buffer.extend_from_slice(&src.0);
        Self { buffer }
    }

    pub fn vlan(mut self, vid: u16) -> Self {
        self.buffer
            .extend_from_slice(&(EtherType::Vlan as u16).to_be_bytes());
        self.buffer.extend_from_slice(&(vid & 0x0fff).to_be_bytes());
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.buffer.extend_from_slice(&ethertype.to_be_bytes());
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.buffer.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

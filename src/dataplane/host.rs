//! Collaborator interfaces the engine talks to
//!
//! Both directions are fire-and-forget: nothing a collaborator does is
//! reported back into the engine.

use super::EndpointId;
use crate::protocol::MacAddr;

/// Why an endpoint went back to Disconnected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Local disconnect/abort or a PADT from the peer
    Normal,
    /// No acceptable PADO before the connect timer ran out
    HostUnreachable,
    /// PADR went unanswered, or the AC refused it
    ConnectionRefused,
}

/// Notification delivered to the upper layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A PADR was accepted by a listening endpoint; waiting for `accept`
    Ringing,
    /// Session established
    Connected,
    Disconnected(DisconnectReason),
}

/// Lower layer: puts frames on the wire.
///
/// The engine passes the PPPoE header and payload; the implementation adds
/// the Ethernet header with its own source address.
pub trait Datalink: Send {
    fn send_frame(&mut self, dst: MacAddr, ethertype: u16, payload: &[u8]);
}

/// Upper layer of one endpoint (its socket or interface).
pub trait EndpointHost: Send {
    /// State change worth telling the owner about
    fn notify(&mut self, endpoint: EndpointId, event: Event);

    /// PPP payload received on the endpoint's session
    fn deliver(&mut self, endpoint: EndpointId, payload: &[u8]);
}

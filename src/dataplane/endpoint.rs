//! PPPoE endpoint state machine
//!
//! One [`Endpoint`] is one logical PPPoE client or Access Concentrator.
//! Client side: Disconnected → Looking (PADI sent) → Connecting (PADR sent)
//! → Connected. AC side: Disconnected → Listening → Ringing (PADR received)
//! → Connected once the owner calls `accept`.
//!
//! The endpoint never touches the network or its owner directly; every
//! operation returns the [`EndpointAction`]s the engine must carry out.

use super::cookie::Cookie;
use super::host::{DisconnectReason, Event};
use super::timer::{EndpointTimers, TimerSettings};
use crate::config::RingExpiry;
use crate::protocol::MacAddr;
use crate::protocol::pppoe::{
    PPPOE_DISCOVERY_ETHERTYPE, PppoeBuilder, PppoeFrame, codes, tags,
};
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Endpoint state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Idle, no timers, no peer
    Disconnected,
    /// PADI sent, waiting for PADO
    Looking,
    /// PADR sent, waiting for PADS
    Connecting,
    /// Session established
    Connected,
    /// Acting as AC, answering PADI
    Listening,
    /// PADR accepted, waiting for the owner to accept
    Ringing,
}

/// Work the engine must do on behalf of an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointAction {
    /// Transmit a PPPoE packet
    Send {
        dst: MacAddr,
        ethertype: u16,
        packet: Vec<u8>,
    },
    /// Tell the owner
    Notify(Event),
}

/// A single PPPoE endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    state: EndpointState,

    // Identity offered as AC
    local_name: Cookie,
    local_service: Cookie,

    // Identity requested as client (empty = any)
    want_name: Cookie,
    want_service: Cookie,

    // Discovery cookies
    host_uniq: Cookie,
    ac_cookie: Cookie,
    relay_id: Cookie,
    // Service-Name confirmed in PADS when acting as AC
    session_service: Cookie,

    // Session
    session_id: u16,
    peer: MacAddr,
    // Entered through listen rather than connect
    serving: bool,

    // Timers
    timers: EndpointTimers,
    settings: TimerSettings,
    ring_expiry: RingExpiry,
}

impl Endpoint {
    /// Create a disconnected endpoint
    pub fn new(settings: TimerSettings, ring_expiry: RingExpiry) -> Self {
        Self {
            state: EndpointState::Disconnected,
            local_name: Cookie::EMPTY,
            local_service: Cookie::EMPTY,
            want_name: Cookie::EMPTY,
            want_service: Cookie::EMPTY,
            host_uniq: Cookie::EMPTY,
            ac_cookie: Cookie::EMPTY,
            relay_id: Cookie::EMPTY,
            session_service: Cookie::EMPTY,
            session_id: 0,
            peer: MacAddr::ZERO,
            serving: false,
            timers: EndpointTimers::default(),
            settings,
            ring_expiry,
        }
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Session ID, only while Connected
    pub fn session_id(&self) -> Option<u16> {
        (self.state == EndpointState::Connected).then_some(self.session_id)
    }

    /// Peer MAC, only while Connected or Ringing
    pub fn peer_address(&self) -> Option<MacAddr> {
        matches!(
            self.state,
            EndpointState::Connected | EndpointState::Ringing
        )
        .then_some(self.peer)
    }

    pub fn host_uniq(&self) -> &[u8] {
        self.host_uniq.as_bytes()
    }

    pub fn ac_cookie(&self) -> &[u8] {
        self.ac_cookie.as_bytes()
    }

    pub fn relay_id(&self) -> &[u8] {
        self.relay_id.as_bytes()
    }

    pub fn local_name(&self) -> &[u8] {
        self.local_name.as_bytes()
    }

    pub fn local_service(&self) -> &[u8] {
        self.local_service.as_bytes()
    }

    pub fn timers(&self) -> &EndpointTimers {
        &self.timers
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    /// Replace the timer reload values; running timers keep their count
    pub fn set_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
    }

    /// AC name offered while listening
    pub fn set_local_name(&mut self, name: &str) -> Result<()> {
        self.local_name = bounded("AC name", name)?;
        Ok(())
    }

    /// Service name offered while listening (empty = serve any)
    pub fn set_local_service(&mut self, service: &str) -> Result<()> {
        self.local_service = bounded("service name", service)?;
        Ok(())
    }

    /// Start discovery as a client.
    ///
    /// `name`/`service` select the AC and service (empty = any). `host_uniq`
    /// is the cookie to tag this attempt with; empty means none is sent and
    /// none is checked.
    pub fn connect(
        &mut self,
        name: &str,
        service: &str,
        host_uniq: Cookie,
    ) -> Result<Vec<EndpointAction>> {
        self.expect_state("connect", EndpointState::Disconnected)?;
        let want_name = bounded("AC name", name)?;
        let want_service = bounded("service name", service)?;

        self.reset();
        self.want_name = want_name;
        self.want_service = want_service;
        self.host_uniq = host_uniq;
        self.state = EndpointState::Looking;
        self.timers.connect.arm(self.settings.connect_timeout);
        self.timers.resend.arm(self.settings.resend_interval);

        debug!(
            "PPPoE: Looking for AC {:?} service {:?}",
            self.want_name, self.want_service
        );
        Ok(vec![self.padi()])
    }

    /// Start answering discovery as an AC
    pub fn listen(&mut self) -> Result<()> {
        self.expect_state("listen", EndpointState::Disconnected)?;
        self.reset();
        self.state = EndpointState::Listening;
        self.serving = true;
        debug!(
            "PPPoE: Listening as {:?} for service {:?}",
            self.local_name, self.local_service
        );
        Ok(())
    }

    /// Accept the ringing session under `session_id` (allocated by the engine)
    pub fn accept(&mut self, session_id: u16) -> Result<Vec<EndpointAction>> {
        self.expect_state("accept", EndpointState::Ringing)?;

        self.session_id = session_id;
        self.state = EndpointState::Connected;
        self.timers.clear();

        info!(
            "PPPoE: Session 0x{:04x} accepted for {}",
            session_id, self.peer
        );
        Ok(vec![self.pads(), EndpointAction::Notify(Event::Connected)])
    }

    /// Close the session with a PADT; outside Connected this is `abort`
    pub fn disconnect(&mut self) -> Vec<EndpointAction> {
        match self.state {
            EndpointState::Disconnected => Vec::new(),
            EndpointState::Connected => {
                let padt = PppoeBuilder::discovery(codes::PADT)
                    .session_id(self.session_id)
                    .build();
                let dst = self.peer;
                info!(
                    "PPPoE: Terminating session 0x{:04x} with {}",
                    self.session_id, dst
                );
                self.reset();
                vec![
                    discovery(dst, padt),
                    EndpointAction::Notify(Event::Disconnected(DisconnectReason::Normal)),
                ]
            }
            _ => self.abort(),
        }
    }

    /// Drop whatever the endpoint is doing and go back to Disconnected
    pub fn abort(&mut self) -> Vec<EndpointAction> {
        match self.state {
            EndpointState::Disconnected => Vec::new(),
            EndpointState::Connected => self.disconnect(),
            state => {
                debug!("PPPoE: Aborting in state {:?}", state);
                self.reset();
                vec![EndpointAction::Notify(Event::Disconnected(
                    DisconnectReason::Normal,
                ))]
            }
        }
    }

    /// Offer a discovery packet to this endpoint.
    ///
    /// `None` means the packet was not for this endpoint and the dispatcher
    /// should try the next one.
    pub fn handle_discovery(
        &mut self,
        src: MacAddr,
        frame: &PppoeFrame,
    ) -> Option<Vec<EndpointAction>> {
        match (frame.code(), self.state) {
            (codes::PADO, EndpointState::Looking) => self.handle_pado(src, frame),
            (codes::PADS, EndpointState::Connecting) => self.handle_pads(src, frame),
            (codes::PADI, EndpointState::Listening) => self.handle_padi(src, frame),
            (codes::PADR, EndpointState::Listening) => self.handle_padr(src, frame),
            (codes::PADR, EndpointState::Ringing | EndpointState::Connected) if self.serving => {
                self.handle_repeated_padr(src, frame)
            }
            (codes::PADT, EndpointState::Connected) => self.handle_padt(src, frame),
            _ => None,
        }
    }

    /// Session-stage acceptance: right state, right session, right peer
    pub fn accepts_data(&self, src: MacAddr, session_id: u16) -> bool {
        self.state == EndpointState::Connected && self.session_id == session_id && self.peer == src
    }

    /// Advance this endpoint's timers by one tick and react to expiries
    pub fn on_tick(&mut self) -> Vec<EndpointAction> {
        let expired = self.timers.advance();
        if !expired.any() {
            return Vec::new();
        }

        match self.state {
            EndpointState::Looking | EndpointState::Connecting if expired.connect => {
                let reason = if self.state == EndpointState::Looking {
                    DisconnectReason::HostUnreachable
                } else {
                    DisconnectReason::ConnectionRefused
                };
                warn!(
                    "PPPoE: Discovery timed out in state {:?} ({:?})",
                    self.state, reason
                );
                self.reset();
                vec![EndpointAction::Notify(Event::Disconnected(reason))]
            }
            EndpointState::Looking if expired.resend => {
                debug!("PPPoE: Retransmitting PADI");
                self.timers.resend.arm(self.settings.resend_interval);
                vec![self.padi()]
            }
            EndpointState::Connecting if expired.resend => {
                debug!("PPPoE: Retransmitting PADR to {}", self.peer);
                self.timers.resend.arm(self.settings.resend_interval);
                vec![self.padr()]
            }
            EndpointState::Ringing if expired.ring => self.ring_expired(),
            _ => Vec::new(),
        }
    }

    /// PADO in Looking: pick this AC if it matches what we asked for
    fn handle_pado(&mut self, src: MacAddr, frame: &PppoeFrame) -> Option<Vec<EndpointAction>> {
        if !is_station(src) || !self.host_uniq_matches(frame) {
            return None;
        }

        if let Some((tag, msg)) = frame.error_tag() {
            debug!(
                "PPPoE: Ignoring PADO from {} with error tag 0x{:04x}: {}",
                src,
                tag,
                String::from_utf8_lossy(msg)
            );
            return None;
        }

        if !self.want_name.is_empty()
            && frame.find_tag(tags::AC_NAME) != Some(self.want_name.as_bytes())
        {
            debug!("PPPoE: PADO from {} is not AC {:?}", src, self.want_name);
            return None;
        }

        if !self.want_service.is_empty()
            && !frame.iter_tags().any(|tag| {
                tag.tag_type == tags::SERVICE_NAME && tag.data == self.want_service.as_bytes()
            })
        {
            debug!(
                "PPPoE: PADO from {} does not offer {:?}",
                src, self.want_service
            );
            return None;
        }

        let ac_cookie = Cookie::from_slice(frame.find_tag(tags::AC_COOKIE).unwrap_or_default());
        let relay_id =
            Cookie::from_slice(frame.find_tag(tags::RELAY_SESSION_ID).unwrap_or_default());
        let (Some(ac_cookie), Some(relay_id)) = (ac_cookie, relay_id) else {
            debug!("PPPoE: PADO from {} carries an oversized cookie", src);
            return None;
        };

        info!(
            "PPPoE: Received PADO from {} (AC: {})",
            src,
            String::from_utf8_lossy(frame.find_tag(tags::AC_NAME).unwrap_or(b"unknown"))
        );

        self.ac_cookie = ac_cookie;
        self.relay_id = relay_id;
        self.peer = src;
        self.state = EndpointState::Connecting;
        self.timers.resend.arm(self.settings.resend_interval);

        Some(vec![self.padr()])
    }

    /// PADS in Connecting: session confirmed, or refused by the AC
    fn handle_pads(&mut self, src: MacAddr, frame: &PppoeFrame) -> Option<Vec<EndpointAction>> {
        if src != self.peer || !self.host_uniq_matches(frame) {
            return None;
        }

        let refused = if let Some((tag, msg)) = frame.error_tag() {
            warn!(
                "PPPoE: PADS error tag 0x{:04x} from {}: {}",
                tag,
                src,
                String::from_utf8_lossy(msg)
            );
            true
        } else if matches!(frame.session_id(), 0 | 0xffff) {
            warn!(
                "PPPoE: PADS from {} with reserved session_id 0x{:04x}",
                src,
                frame.session_id()
            );
            true
        } else {
            false
        };

        if refused {
            self.reset();
            return Some(vec![EndpointAction::Notify(Event::Disconnected(
                DisconnectReason::ConnectionRefused,
            ))]);
        }

        self.session_id = frame.session_id();
        self.state = EndpointState::Connected;
        self.timers.clear();

        info!(
            "PPPoE: Session established (id=0x{:04x}) with {}",
            self.session_id, self.peer
        );
        Some(vec![EndpointAction::Notify(Event::Connected)])
    }

    /// PADI in Listening: answer with a PADO if we serve what is asked
    fn handle_padi(&mut self, src: MacAddr, frame: &PppoeFrame) -> Option<Vec<EndpointAction>> {
        if !is_station(src) || !self.serves(frame) {
            return None;
        }

        let requested = frame.find_tag(tags::SERVICE_NAME).unwrap_or_default();
        let offered = if self.local_service.is_empty() {
            requested
        } else {
            self.local_service.as_bytes()
        };

        let pado = PppoeBuilder::discovery(codes::PADO)
            .ac_name(self.local_name.as_bytes())
            .service_name(offered)
            .add_tag_if_present(
                tags::HOST_UNIQ,
                frame.find_tag(tags::HOST_UNIQ).unwrap_or_default(),
            )
            .add_tag_if_present(
                tags::RELAY_SESSION_ID,
                frame.find_tag(tags::RELAY_SESSION_ID).unwrap_or_default(),
            )
            .build();

        debug!("PPPoE: Offering {:?} to {}", self.local_name, src);
        Some(vec![discovery(src, pado)])
    }

    /// PADR in Listening: remember the requester and ring the owner
    fn handle_padr(&mut self, src: MacAddr, frame: &PppoeFrame) -> Option<Vec<EndpointAction>> {
        if !is_station(src) || !self.serves(frame) {
            return None;
        }

        let host_uniq = Cookie::from_slice(frame.find_tag(tags::HOST_UNIQ).unwrap_or_default());
        let relay_id =
            Cookie::from_slice(frame.find_tag(tags::RELAY_SESSION_ID).unwrap_or_default());
        let requested = frame.find_tag(tags::SERVICE_NAME).unwrap_or_default();
        let service = if requested.is_empty() {
            Some(self.local_service)
        } else {
            Cookie::from_slice(requested)
        };
        let (Some(host_uniq), Some(relay_id), Some(service)) = (host_uniq, relay_id, service)
        else {
            debug!("PPPoE: PADR from {} carries an oversized tag", src);
            return None;
        };

        self.host_uniq = host_uniq;
        self.relay_id = relay_id;
        self.session_service = service;
        self.peer = src;
        self.state = EndpointState::Ringing;
        self.timers.ring.arm(self.settings.ring_timeout);

        info!("PPPoE: Incoming session request from {}", src);
        Some(vec![EndpointAction::Notify(Event::Ringing)])
    }

    /// PADR from the station we are already ringing for or serving.
    ///
    /// The client retransmits PADR until it sees a PADS, so the request is
    /// claimed here rather than left for another listener. Once connected the
    /// PADS is sent again in case the first one was lost.
    fn handle_repeated_padr(
        &mut self,
        src: MacAddr,
        frame: &PppoeFrame,
    ) -> Option<Vec<EndpointAction>> {
        if src != self.peer
            || frame.find_tag(tags::HOST_UNIQ).unwrap_or_default() != self.host_uniq.as_bytes()
        {
            return None;
        }

        match self.state {
            EndpointState::Connected => {
                debug!(
                    "PPPoE: Repeating PADS for session 0x{:04x} to {}",
                    self.session_id, src
                );
                Some(vec![self.pads()])
            }
            _ => {
                debug!("PPPoE: Repeated PADR from {} while ringing", src);
                Some(Vec::new())
            }
        }
    }

    /// PADT in Connected: only from our peer, for our session
    fn handle_padt(&mut self, src: MacAddr, frame: &PppoeFrame) -> Option<Vec<EndpointAction>> {
        if src != self.peer || frame.session_id() != self.session_id {
            return None;
        }

        info!(
            "PPPoE: Received PADT for session 0x{:04x} from {}",
            self.session_id, src
        );
        self.reset();
        Some(vec![EndpointAction::Notify(Event::Disconnected(
            DisconnectReason::Normal,
        ))])
    }

    fn ring_expired(&mut self) -> Vec<EndpointAction> {
        debug!("PPPoE: Ring from {} not accepted in time", self.peer);
        match self.ring_expiry {
            RingExpiry::Listen => {
                self.peer = MacAddr::ZERO;
                self.host_uniq.clear();
                self.relay_id.clear();
                self.session_service.clear();
                self.state = EndpointState::Listening;
                Vec::new()
            }
            RingExpiry::Disconnect => {
                self.reset();
                vec![EndpointAction::Notify(Event::Disconnected(
                    DisconnectReason::Normal,
                ))]
            }
        }
    }

    /// Does the AC/service requested in `frame` match what we offer?
    ///
    /// A peer that names no AC or service is asking for any; an empty local
    /// value serves any.
    fn serves(&self, frame: &PppoeFrame) -> bool {
        let name_ok = offers(&self.local_name, frame.find_tag(tags::AC_NAME));
        let service_ok = offers(&self.local_service, frame.find_tag(tags::SERVICE_NAME));
        if !(name_ok && service_ok) {
            debug!(
                "PPPoE: Not serving {} request for AC {:?} service {:?}",
                codes::name(frame.code()),
                frame.find_tag(tags::AC_NAME).map(String::from_utf8_lossy),
                frame.find_tag(tags::SERVICE_NAME).map(String::from_utf8_lossy),
            );
        }
        name_ok && service_ok
    }

    fn host_uniq_matches(&self, frame: &PppoeFrame) -> bool {
        if self.host_uniq.is_empty() {
            return true;
        }
        let matches = frame.find_tag(tags::HOST_UNIQ) == Some(self.host_uniq.as_bytes());
        if !matches {
            debug!("PPPoE: {} Host-Uniq mismatch", codes::name(frame.code()));
        }
        matches
    }

    fn padi(&self) -> EndpointAction {
        let padi = PppoeBuilder::discovery(codes::PADI)
            .service_name(self.want_service.as_bytes())
            .add_tag_if_present(tags::AC_NAME, self.want_name.as_bytes())
            .add_tag_if_present(tags::HOST_UNIQ, self.host_uniq.as_bytes())
            .build();
        discovery(MacAddr::BROADCAST, padi)
    }

    fn pads(&self) -> EndpointAction {
        let pads = PppoeBuilder::discovery(codes::PADS)
            .session_id(self.session_id)
            .service_name(self.session_service.as_bytes())
            .add_tag_if_present(tags::AC_NAME, self.local_name.as_bytes())
            .add_tag_if_present(tags::HOST_UNIQ, self.host_uniq.as_bytes())
            .add_tag_if_present(tags::RELAY_SESSION_ID, self.relay_id.as_bytes())
            .build();
        discovery(self.peer, pads)
    }

    fn padr(&self) -> EndpointAction {
        let padr = PppoeBuilder::discovery(codes::PADR)
            .service_name(self.want_service.as_bytes())
            .add_tag_if_present(tags::AC_NAME, self.want_name.as_bytes())
            .add_tag_if_present(tags::HOST_UNIQ, self.host_uniq.as_bytes())
            .add_tag_if_present(tags::AC_COOKIE, self.ac_cookie.as_bytes())
            .add_tag_if_present(tags::RELAY_SESSION_ID, self.relay_id.as_bytes())
            .build();
        discovery(self.peer, padr)
    }

    fn expect_state(&self, op: &'static str, expected: EndpointState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    /// Back to Disconnected. Session id and peer are cleared together.
    fn reset(&mut self) {
        self.state = EndpointState::Disconnected;
        self.session_id = 0;
        self.peer = MacAddr::ZERO;
        self.serving = false;
        self.want_name.clear();
        self.want_service.clear();
        self.host_uniq.clear();
        self.ac_cookie.clear();
        self.relay_id.clear();
        self.session_service.clear();
        self.timers.clear();
    }
}

fn bounded(field: &'static str, value: &str) -> Result<Cookie> {
    Cookie::from_slice(value.as_bytes()).ok_or(Error::NameTooLong {
        field,
        len: value.len(),
        max: super::cookie::COOKIE_CAPACITY,
    })
}

fn offers(local: &Cookie, requested: Option<&[u8]>) -> bool {
    match requested {
        None | Some([]) => true,
        Some(name) => local.is_empty() || *local == *name,
    }
}

/// Discovery replies must come from, and go to, a single station
fn is_station(mac: MacAddr) -> bool {
    !mac.is_multicast() && !mac.is_zero()
}

fn discovery(dst: MacAddr, packet: Vec<u8>) -> EndpointAction {
    EndpointAction::Send {
        dst,
        ethertype: PPPOE_DISCOVERY_ETHERTYPE,
        packet,
    }
}

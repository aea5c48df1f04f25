//! PPPoE engine: endpoint arena and frame dispatcher
//!
//! One engine serves one Ethernet interface. It owns every endpoint, routes
//! inbound frames to them, drives their timers and carries out the actions
//! they return.

use super::cookie::Cookie;
use super::endpoint::{Endpoint, EndpointAction, EndpointState};
use super::host::{Datalink, DisconnectReason, EndpointHost, Event};
use super::timer::TimerSettings;
use crate::config::{Config, EngineConfig, ServerConfig};
use crate::protocol::ethernet::Frame;
use crate::protocol::pppoe::{
    PPPOE_DISCOVERY_ETHERTYPE, PPPOE_MAX_PAYLOAD, PPPOE_SESSION_ETHERTYPE, PppoeBuilder,
    PppoeFrame, codes,
};
use crate::protocol::{EtherType, MacAddr};
use crate::telemetry::EngineMetrics;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Highest usable session ID; 0xFFFF is reserved
const MAX_SESSION_ID: u16 = 0xfffe;

/// Handle to an endpoint owned by an [`Engine`].
///
/// The generation is bumped whenever a slot is freed, so a handle to a
/// removed endpoint never reaches the endpoint that reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId {
    index: u32,
    generation: u32,
}

impl EndpointId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

struct Entry {
    endpoint: Endpoint,
    host: Box<dyn EndpointHost>,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// PPPoE engine for one interface
pub struct Engine {
    local_mac: MacAddr,
    config: EngineConfig,
    server: ServerConfig,
    link: Box<dyn Datalink>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    next_session_id: u16,
    uniq_sequence: u32,
    metrics: Arc<EngineMetrics>,
}

impl Engine {
    /// Create an engine sending through `link` with source address `local_mac`
    pub fn new(local_mac: MacAddr, config: &Config, link: impl Datalink + 'static) -> Self {
        info!(
            "PPPoE engine on {} (host_uniq={}, max_endpoints={})",
            local_mac, config.engine.host_uniq, config.engine.max_endpoints
        );
        Self {
            local_mac,
            config: config.engine.clone(),
            server: config.server.clone(),
            link: Box::new(link),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            next_session_id: 1,
            uniq_sequence: 0,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    pub fn local_mac(&self) -> MacAddr {
        self.local_mac
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of live endpoints
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Create a disconnected endpoint whose upper layer is `host`
    pub fn new_client(&mut self, host: impl EndpointHost + 'static) -> Result<EndpointId> {
        if self.live >= self.config.max_endpoints {
            return Err(Error::TooManyEndpoints(self.config.max_endpoints));
        }

        let mut endpoint = Endpoint::new(self.config.timers(), self.config.ring_expiry);
        endpoint.set_local_name(&self.server.ac_name)?;
        endpoint.set_local_service(&self.server.service_name)?;

        let entry = Entry {
            endpoint,
            host: Box::new(host),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                EndpointId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| Error::TooManyEndpoints(self.config.max_endpoints))?;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                EndpointId {
                    index,
                    generation: 0,
                }
            }
        };

        self.live += 1;
        debug!("PPPoE: Created endpoint {}", id);
        Ok(id)
    }

    /// Destroy an endpoint, terminating its session first if it has one
    pub fn remove(&mut self, id: EndpointId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .ok_or(Error::UnknownEndpoint(id))?;
        let mut entry = slot.entry.take().ok_or(Error::UnknownEndpoint(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        let was_connected = entry.endpoint.state() == EndpointState::Connected;
        let actions = entry.endpoint.abort();
        execute(
            self.link.as_mut(),
            &self.metrics,
            id,
            entry.host.as_mut(),
            was_connected,
            actions,
        );
        debug!("PPPoE: Removed endpoint {}", id);
        Ok(())
    }

    pub fn endpoint(&self, id: EndpointId) -> Result<&Endpoint> {
        lookup(&self.slots, id).map(|entry| &entry.endpoint)
    }

    /// Live endpoints in arena order
    pub fn endpoints(&self) -> impl Iterator<Item = (EndpointId, &Endpoint)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (
                    EndpointId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    &entry.endpoint,
                )
            })
        })
    }

    pub fn state(&self, id: EndpointId) -> Result<EndpointState> {
        self.endpoint(id).map(Endpoint::state)
    }

    pub fn session_id(&self, id: EndpointId) -> Result<Option<u16>> {
        self.endpoint(id).map(Endpoint::session_id)
    }

    pub fn peer_address(&self, id: EndpointId) -> Result<Option<MacAddr>> {
        self.endpoint(id).map(Endpoint::peer_address)
    }

    pub fn set_local_name(&mut self, id: EndpointId, name: &str) -> Result<()> {
        lookup_mut(&mut self.slots, id)?.endpoint.set_local_name(name)
    }

    pub fn set_local_service(&mut self, id: EndpointId, service: &str) -> Result<()> {
        lookup_mut(&mut self.slots, id)?.endpoint.set_local_service(service)
    }

    /// Override the timer reload values of one endpoint
    pub fn set_timers(&mut self, id: EndpointId, settings: TimerSettings) -> Result<()> {
        lookup_mut(&mut self.slots, id)?.endpoint.set_settings(settings);
        Ok(())
    }

    /// Start discovery for `service` at AC `name` (empty = any)
    pub fn connect(&mut self, id: EndpointId, name: &str, service: &str) -> Result<()> {
        let host_uniq = self.next_host_uniq(id);
        self.run(id, |endpoint| endpoint.connect(name, service, host_uniq))
    }

    /// Answer discovery as an AC
    pub fn listen(&mut self, id: EndpointId) -> Result<()> {
        self.run(id, |endpoint| endpoint.listen().map(|()| Vec::new()))
    }

    /// Accept a ringing endpoint's session; returns the allocated session ID
    pub fn accept(&mut self, id: EndpointId) -> Result<u16> {
        let state = self.state(id)?;
        if state != EndpointState::Ringing {
            return Err(Error::InvalidState {
                op: "accept",
                state,
            });
        }

        let session_id = self.allocate_session_id()?;
        self.run(id, |endpoint| endpoint.accept(session_id))?;
        Ok(session_id)
    }

    pub fn disconnect(&mut self, id: EndpointId) -> Result<()> {
        self.run(id, |endpoint| Ok(endpoint.disconnect()))
    }

    pub fn abort(&mut self, id: EndpointId) -> Result<()> {
        self.run(id, |endpoint| Ok(endpoint.abort()))
    }

    /// Send a PPP payload on the endpoint's session
    pub fn send_data(&mut self, id: EndpointId, payload: &[u8]) -> Result<()> {
        let endpoint = self.endpoint(id)?;
        if payload.len() > PPPOE_MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: PPPOE_MAX_PAYLOAD,
            });
        }
        let (Some(session_id), Some(peer)) = (endpoint.session_id(), endpoint.peer_address())
        else {
            return Err(Error::NotConnected(id));
        };

        let packet = PppoeBuilder::session(session_id).payload(payload).build();
        self.link
            .send_frame(peer, PPPOE_SESSION_ETHERTYPE, &packet);
        self.metrics.data_sent.inc();
        Ok(())
    }

    /// Feed one received PPPoE frame (Ethernet header already stripped)
    pub fn on_frame(&mut self, src: MacAddr, ethertype: u16, payload: &[u8]) {
        self.metrics.frames_received.inc();

        if src == self.local_mac {
            trace!("PPPoE: Dropping own frame");
            return;
        }

        match EtherType::from_u16(ethertype) {
            Some(EtherType::PppoeDiscovery) => self.on_discovery(src, payload),
            Some(EtherType::PppoeSession) => self.on_session(src, payload),
            _ => {
                trace!("PPPoE: Ignoring ethertype 0x{:04x}", ethertype);
                self.metrics.frames_unhandled.inc();
            }
        }
    }

    /// Feed one raw Ethernet II frame
    pub fn on_ethernet_frame(&mut self, raw: &[u8]) {
        let frame = match Frame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                trace!("PPPoE: Dropping malformed Ethernet frame: {}", e);
                self.metrics.frames_malformed.inc();
                return;
            }
        };

        let dst = frame.dst_mac();
        if dst != self.local_mac && !dst.is_broadcast() {
            trace!("PPPoE: Frame for {} is not ours", dst);
            return;
        }

        self.on_frame(frame.src_mac(), frame.ethertype(), frame.payload());
    }

    /// Advance every endpoint's timers by one tick
    pub fn on_tick(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            let id = EndpointId {
                index: index as u32,
                generation: slot.generation,
            };
            let was_connected = entry.endpoint.state() == EndpointState::Connected;
            let actions = entry.endpoint.on_tick();
            if !actions.is_empty() {
                execute(
                    self.link.as_mut(),
                    &self.metrics,
                    id,
                    entry.host.as_mut(),
                    was_connected,
                    actions,
                );
            }
        }
    }

    fn on_discovery(&mut self, src: MacAddr, payload: &[u8]) {
        let frame = match PppoeFrame::parse(payload) {
            Ok(frame) => frame,
            Err(e) => {
                trace!("PPPoE: Dropping malformed discovery frame from {}: {}", src, e);
                self.metrics.frames_malformed.inc();
                return;
            }
        };

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            let was_connected = entry.endpoint.state() == EndpointState::Connected;
            if let Some(actions) = entry.endpoint.handle_discovery(src, &frame) {
                let id = EndpointId {
                    index: index as u32,
                    generation: slot.generation,
                };
                execute(
                    self.link.as_mut(),
                    &self.metrics,
                    id,
                    entry.host.as_mut(),
                    was_connected,
                    actions,
                );
                return;
            }
        }

        debug!(
            "PPPoE: Unhandled {} from {} (session 0x{:04x})",
            codes::name(frame.code()),
            src,
            frame.session_id()
        );
        self.metrics.frames_unhandled.inc();
    }

    fn on_session(&mut self, src: MacAddr, payload: &[u8]) {
        let frame = match PppoeFrame::parse(payload) {
            Ok(frame) if frame.code() == codes::SESSION => frame,
            Ok(frame) => {
                trace!(
                    "PPPoE: Session frame from {} with code 0x{:02x}",
                    src,
                    frame.code()
                );
                self.metrics.frames_malformed.inc();
                return;
            }
            Err(e) => {
                trace!("PPPoE: Dropping malformed session frame from {}: {}", src, e);
                self.metrics.frames_malformed.inc();
                return;
            }
        };

        let session_id = frame.session_id();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            if entry.endpoint.accepts_data(src, session_id) {
                let id = EndpointId {
                    index: index as u32,
                    generation: slot.generation,
                };
                entry.host.deliver(id, frame.payload());
                self.metrics.data_delivered.inc();
                return;
            }
        }

        trace!(
            "PPPoE: No session 0x{:04x} for {}, dropping",
            session_id, src
        );
        self.metrics.data_dropped.inc();

        if self.config.reply_padt_unknown_session && !src.is_multicast() {
            let padt = PppoeBuilder::discovery(codes::PADT)
                .session_id(session_id)
                .build();
            self.link.send_frame(src, PPPOE_DISCOVERY_ETHERTYPE, &padt);
            self.metrics.record_discovery_sent(codes::PADT);
        }
    }

    /// Run an endpoint operation and carry out what it returns
    fn run(
        &mut self,
        id: EndpointId,
        op: impl FnOnce(&mut Endpoint) -> Result<Vec<EndpointAction>>,
    ) -> Result<()> {
        let entry = lookup_mut(&mut self.slots, id)?;
        let was_connected = entry.endpoint.state() == EndpointState::Connected;
        let actions = op(&mut entry.endpoint)?;
        execute(
            self.link.as_mut(),
            &self.metrics,
            id,
            entry.host.as_mut(),
            was_connected,
            actions,
        );
        Ok(())
    }

    /// Slot index then a running sequence, both big-endian; empty in legacy mode
    fn next_host_uniq(&mut self, id: EndpointId) -> Cookie {
        if !self.config.host_uniq {
            return Cookie::EMPTY;
        }
        self.uniq_sequence = self.uniq_sequence.wrapping_add(1);
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&id.index.to_be_bytes());
        bytes[4..].copy_from_slice(&self.uniq_sequence.to_be_bytes());
        Cookie::from_slice(&bytes).unwrap_or_default()
    }

    /// Next free session ID in 1..=0xFFFE, round-robin
    fn allocate_session_id(&mut self) -> Result<u16> {
        let in_use: HashSet<u16> = self
            .endpoints()
            .filter_map(|(_, endpoint)| endpoint.session_id())
            .collect();

        for _ in 0..MAX_SESSION_ID {
            let candidate = self.next_session_id;
            self.next_session_id = if candidate >= MAX_SESSION_ID {
                1
            } else {
                candidate + 1
            };
            if !in_use.contains(&candidate) {
                return Ok(candidate);
            }
        }

        Err(Error::SessionsExhausted)
    }
}

fn lookup(slots: &[Slot], id: EndpointId) -> Result<&Entry> {
    slots
        .get(id.index())
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.entry.as_ref())
        .ok_or(Error::UnknownEndpoint(id))
}

fn lookup_mut(slots: &mut [Slot], id: EndpointId) -> Result<&mut Entry> {
    slots
        .get_mut(id.index())
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.entry.as_mut())
        .ok_or(Error::UnknownEndpoint(id))
}

fn execute(
    link: &mut dyn Datalink,
    metrics: &EngineMetrics,
    id: EndpointId,
    host: &mut dyn EndpointHost,
    was_connected: bool,
    actions: Vec<EndpointAction>,
) {
    for action in actions {
        match action {
            EndpointAction::Send {
                dst,
                ethertype,
                packet,
            } => {
                if ethertype == PPPOE_DISCOVERY_ETHERTYPE {
                    if let Some(&code) = packet.get(1) {
                        metrics.record_discovery_sent(code);
                    }
                }
                link.send_frame(dst, ethertype, &packet);
            }
            EndpointAction::Notify(event) => {
                match event {
                    Event::Connected => metrics.sessions_established.inc(),
                    Event::Disconnected(_) if was_connected => metrics.sessions_terminated.inc(),
                    Event::Disconnected(
                        DisconnectReason::HostUnreachable | DisconnectReason::ConnectionRefused,
                    ) => metrics.discovery_failures.inc(),
                    _ => {}
                }
                debug!("PPPoE: Endpoint {} -> {:?}", id, event);
                host.notify(id, event);
            }
        }
    }
}

//! Recording doubles for the engine's collaborators

use pppoe_engine::config::Config;
use pppoe_engine::dataplane::{Datalink, EndpointHost, EndpointId, Engine, Event};
use pppoe_engine::protocol::MacAddr;
use pppoe_engine::protocol::pppoe::{PPPOE_DISCOVERY_ETHERTYPE, PppoeFrame};
use std::sync::{Arc, Mutex};

pub const CLIENT_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const AC_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0xac]);
pub const ROGUE_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x66]);

/// A frame the engine handed to its datalink
#[derive(Debug, Clone)]
pub struct Sent {
    pub dst: MacAddr,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

impl Sent {
    pub fn pppoe(&self) -> PppoeFrame<'_> {
        PppoeFrame::parse(&self.payload).expect("engine sent a malformed PPPoE frame")
    }

    pub fn is_discovery(&self, code: u8) -> bool {
        self.ethertype == PPPOE_DISCOVERY_ETHERTYPE && self.pppoe().code() == code
    }
}

#[derive(Clone, Default)]
pub struct Wire(Arc<Mutex<Vec<Sent>>>);

impl Wire {
    /// Everything sent since the last call
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl Datalink for Wire {
    fn send_frame(&mut self, dst: MacAddr, ethertype: u16, payload: &[u8]) {
        self.0.lock().unwrap().push(Sent {
            dst,
            ethertype,
            payload: payload.to_vec(),
        });
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    data: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn data(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.data.lock().unwrap())
    }
}

impl EndpointHost for Recorder {
    fn notify(&mut self, _endpoint: EndpointId, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn deliver(&mut self, _endpoint: EndpointId, payload: &[u8]) {
        self.data.lock().unwrap().push(payload.to_vec());
    }
}

/// An engine with one endpoint and the doubles watching it
pub struct Harness {
    pub engine: Engine,
    pub id: EndpointId,
    pub wire: Wire,
    pub host: Recorder,
}

impl Harness {
    pub fn new(local_mac: MacAddr) -> Self {
        Self::with_config(local_mac, Config::default())
    }

    pub fn with_config(local_mac: MacAddr, config: Config) -> Self {
        let wire = Wire::default();
        let host = Recorder::default();
        let mut engine = Engine::new(local_mac, &config, wire.clone());
        let id = engine.new_client(host.clone()).unwrap();
        Self {
            engine,
            id,
            wire,
            host,
        }
    }

    pub fn discovery(&mut self, src: MacAddr, packet: &[u8]) {
        self.engine
            .on_frame(src, PPPOE_DISCOVERY_ETHERTYPE, packet);
    }

    pub fn ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.engine.on_tick();
        }
    }
}

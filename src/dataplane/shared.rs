//! Sharing an engine between tasks
//!
//! The engine is single-writer. Hosts that drive it from several tasks wrap
//! it in one mutex and let [`spawn_ticker`] deliver the once-per-second tick.
//! The lock is only taken for synchronous engine calls and never held across
//! an await point.

use super::engine::{EndpointId, Engine};
use super::host::{Datalink, EndpointHost, Event};
use crate::protocol::MacAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Engine tick period
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub type SharedEngine = Arc<Mutex<Engine>>;

pub fn share(engine: Engine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Lock the engine. A panic in another holder does not leave the engine
/// half-updated, so a poisoned lock is taken over.
pub fn lock(engine: &SharedEngine) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drive `on_tick` once per [`TICK_INTERVAL`] until the task is aborted.
///
/// Ticks missed while the runtime was busy are delayed rather than burst, so
/// endpoint timers never jump several seconds at once.
pub fn spawn_ticker(engine: SharedEngine) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            trace!("PPPoE: tick");
            lock(&engine).on_tick();
        }
    })
}

/// Frame queued by [`ChannelLink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub dst: MacAddr,
    pub ethertype: u16,
    pub payload: Vec<u8>,
}

/// [`Datalink`] that queues frames for an async writer task
#[derive(Debug, Clone)]
pub struct ChannelLink(mpsc::UnboundedSender<OutboundFrame>);

impl ChannelLink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl Datalink for ChannelLink {
    fn send_frame(&mut self, dst: MacAddr, ethertype: u16, payload: &[u8]) {
        let frame = OutboundFrame {
            dst,
            ethertype,
            payload: payload.to_vec(),
        };
        if self.0.send(frame).is_err() {
            debug!("PPPoE: Link writer gone, dropping frame to {}", dst);
        }
    }
}

/// What a [`ChannelHost`] forwards to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    Event(EndpointId, Event),
    Data(EndpointId, Vec<u8>),
}

/// [`EndpointHost`] that forwards events and payloads over a channel
#[derive(Debug, Clone)]
pub struct ChannelHost(mpsc::UnboundedSender<HostMessage>);

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl EndpointHost for ChannelHost {
    fn notify(&mut self, endpoint: EndpointId, event: Event) {
        if self.0.send(HostMessage::Event(endpoint, event)).is_err() {
            debug!("PPPoE: Owner of {} gone, dropping {:?}", endpoint, event);
        }
    }

    fn deliver(&mut self, endpoint: EndpointId, payload: &[u8]) {
        if self
            .0
            .send(HostMessage::Data(endpoint, payload.to_vec()))
            .is_err()
        {
            debug!("PPPoE: Owner of {} gone, dropping payload", endpoint);
        }
    }
}

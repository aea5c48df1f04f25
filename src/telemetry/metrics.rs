//! Engine counters.
//!
//! Lock-free counters shared between the engine and whoever exports them.

use crate::protocol::pppoe::codes;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for one engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    // Input
    /// Frames handed to the engine.
    pub frames_received: Counter,
    /// Frames that failed to parse.
    pub frames_malformed: Counter,
    /// Well-formed frames no endpoint wanted.
    pub frames_unhandled: Counter,

    // Discovery packets sent
    pub padi_sent: Counter,
    pub pado_sent: Counter,
    pub padr_sent: Counter,
    pub pads_sent: Counter,
    pub padt_sent: Counter,

    // Session stage
    /// Payloads handed to endpoint hosts.
    pub data_delivered: Counter,
    /// Session frames for no known session.
    pub data_dropped: Counter,
    /// Payloads sent by endpoints.
    pub data_sent: Counter,

    // Lifecycle
    pub sessions_established: Counter,
    pub sessions_terminated: Counter,
    /// Discovery attempts that timed out or were refused.
    pub discovery_failures: Counter,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outgoing discovery packet by its code.
    pub fn record_discovery_sent(&self, code: u8) {
        match code {
            codes::PADI => self.padi_sent.inc(),
            codes::PADO => self.pado_sent.inc(),
            codes::PADR => self.padr_sent.inc(),
            codes::PADS => self.pads_sent.inc(),
            codes::PADT => self.padt_sent.inc(),
            _ => {}
        }
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("frames_received".into(), self.frames_received.get()),
            ("frames_malformed".into(), self.frames_malformed.get()),
            ("frames_unhandled".into(), self.frames_unhandled.get()),
            ("padi_sent".into(), self.padi_sent.get()),
            ("pado_sent".into(), self.pado_sent.get()),
            ("padr_sent".into(), self.padr_sent.get()),
            ("pads_sent".into(), self.pads_sent.get()),
            ("padt_sent".into(), self.padt_sent.get()),
            ("data_delivered".into(), self.data_delivered.get()),
            ("data_dropped".into(), self.data_dropped.get()),
            ("data_sent".into(), self.data_sent.get()),
            ("sessions_established".into(), self.sessions_established.get()),
            ("sessions_terminated".into(), self.sessions_terminated.get()),
            ("discovery_failures".into(), self.discovery_failures.get()),
        ]
    }
}

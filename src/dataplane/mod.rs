//! Data plane components
//!
//! Endpoint state machines, their timers, and the engine that dispatches
//! frames to them.

pub mod cookie;
pub mod endpoint;
pub mod engine;
pub mod host;
pub mod shared;
pub mod timer;

pub use cookie::{COOKIE_CAPACITY, Cookie};
pub use endpoint::{Endpoint, EndpointAction, EndpointState};
pub use engine::{EndpointId, Engine};
pub use host::{Datalink, DisconnectReason, EndpointHost, Event};
pub use shared::{
    ChannelHost, ChannelLink, HostMessage, OutboundFrame, SharedEngine, TICK_INTERVAL, lock,
    share, spawn_ticker,
};
pub use timer::{Countdown, EndpointTimers, Expired, TimerSettings};

//! pppoe-engine - RFC 2516 PPPoE discovery and session engine
//!
//! Negotiates an Access Concentrator over raw Ethernet, allocates a session,
//! and then carries PPP traffic inside PPPoE session frames. The engine is
//! host-agnostic: frames come in through [`dataplane::Engine::on_frame`],
//! time advances through [`dataplane::Engine::on_tick`], and everything the
//! engine wants done is handed to the [`dataplane::Datalink`] and
//! [`dataplane::EndpointHost`] collaborators.

pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};

//! Engine integration tests
//!
//! Drive whole engines through their public surface with recording doubles
//! in place of the network and the endpoint owners.

mod harness;
mod loopback;
mod session;

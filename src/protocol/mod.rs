//! Wire formats
//!
//! PPPoE header and TLV tag codec, plus the Ethernet framing around them.

pub mod ethernet;
pub mod pppoe;
pub mod types;

pub use types::*;

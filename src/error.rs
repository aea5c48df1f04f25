use crate::dataplane::{EndpointId, EndpointState};
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("endpoint {0} not found")]
    UnknownEndpoint(EndpointId),

    #[error("cannot {op} while {state:?}")]
    InvalidState {
        op: &'static str,
        state: EndpointState,
    },

    #[error("{field} is {len} bytes, limit is {max}")]
    NameTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("endpoint {0} has no session")]
    NotConnected(EndpointId),

    #[error("payload of {len} bytes exceeds session MTU {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("no free session id")]
    SessionsExhausted,

    #[error("endpoint limit {0} reached")]
    TooManyEndpoints(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

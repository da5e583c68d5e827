//! SOCKS5 module for Shadowlocal
//!
//! This module implements the local side of the SOCKS5 protocol: method
//! negotiation, request parsing, replies, and the address codec used for
//! the tunnel header.

mod auth;
mod command;
mod consts;
mod handshake;
mod types;

pub use auth::{authenticate, AuthMethod};
pub use command::{build_reply, parse_command};
pub use consts::*;
pub use handshake::{handshake, Handshake};
pub use types::{SocksCommand, TargetAddr};

//! `doorio`: byte-level transport plumbing for terminal clients.
//!
//! This crate turns the raw bytes of one client connection into clean input
//! lines:
//! - telnet IAC command/negotiation stripping (`telnet`),
//! - client-dialect quirk rules such as remote-echo backspace (`quirk`),
//! - incremental line buffering and extraction (`decode`).
//!
//! Everything here is synchronous and allocation-light; the session worker
//! owns the socket and calls [`LineDecoder::feed`] per read.

pub mod decode;
pub mod quirk;
pub mod telnet;

pub use decode::{Decoded, LineDecoder};
pub use telnet::IacFilter;

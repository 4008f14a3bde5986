//! Application protocols spoken between peers.
//!
//! Each protocol is identified by an ALPN tag negotiated when the connection
//! is opened. Payloads are deliberately minimal: `/ping` and `/relay-test`
//! carry nothing at all (closing the connection is the acknowledgment) and
//! `/msg` carries one newline-terminated UTF-8 line.

pub mod msg;
pub mod ping;
pub mod relay_test;

pub const PING_ALPN: &[u8] = b"/ping";
pub const MSG_ALPN: &[u8] = b"/msg";
pub const RELAY_TEST_ALPN: &[u8] = b"/relay-test";

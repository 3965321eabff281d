// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog peer-protocol message shapes.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload. The
//! transport itself — whatever carries bytes between peer supervisors — is
//! an external collaborator; this crate only owns the message shapes
//! Watchdog Sync decodes and the framing used to get them off the wire.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod messages;

pub use codec::{decode, encode, read_message, write_message, ProtocolError};
pub use messages::{BackendStatusReport, WatchdogMessage, WatchdogStatusVector};

#![forbid(unsafe_code)]

//! Filler-record injection on a live secure session.
//!
//! A [`Controller`] opens and closes injection windows on one session. While a
//! window is open a background worker seals random-length filler records with
//! the session's live write cipher and hands them to the transport, advancing
//! the shared write sequence exactly as a genuine write would.

use std::sync::Arc;

use rand::rngs::OsRng;
use shroud_core::{ShroudError, ShroudResult};
use shroud_hal::SessionAdapter;

mod controller;
mod inject;
mod worker;

pub use controller::{Controller, FillerRng};
pub use inject::inject_one;
pub use shroud_flow::FillerConfig;

/// Associates a controller with a session. Does not start injection.
///
/// Fails when the configuration is invalid or the session has no write cipher yet.
pub fn enable(session: Arc<dyn SessionAdapter>, config: FillerConfig) -> ShroudResult<Controller> {
    Controller::new(session, config, Box::new(OsRng))
}

pub(crate) fn require_write_cipher(session: &dyn SessionAdapter) -> ShroudResult<()> {
    if session.has_write_cipher() {
        Ok(())
    } else {
        Err(ShroudError::CipherUnavailable)
    }
}

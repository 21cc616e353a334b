//! Error kinds for the leader elector.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The hostname supplied at construction was empty; the elector cannot
    /// register a participant node without one.
    #[error("unknown host: an empty hostname was supplied to the leader elector")]
    UnknownHost,

    /// Our own participant node disappeared from the children listing
    /// between registration and election (session expiry, coordination
    /// service restart). The caller must re-register from scratch.
    #[error("participant node for this process was not found among the election children; reconnect and retry")]
    ReconnectNeeded,

    #[error("coordination service error: {0}")]
    Coordination(String),
}

pub type Result<T> = std::result::Result<T, Error>;

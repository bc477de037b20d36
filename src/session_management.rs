//! Session management core module.
//!
//! One [`Session`](session::Session) relays a single intercepted connection
//! between the client and its origin while a protocol engine reconstructs the
//! print job from a copy of the client's bytes.

use log::debug;

/// Submodule for the session relay itself.
pub mod session;


/// Represents the lifecycle of a session.
///
/// Variants:
/// - `Opening`: the origin connection is being established.
/// - `Relaying`: both relay directions and the protocol engine are running.
/// - `Closed`: every task finished and both socket pairs are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Opening,
    Relaying,
    Closed,
}

impl SessionStatus {
    pub(crate) fn advance(&mut self, next: SessionStatus, session: &str) {
        debug!("[{}] {:?} -> {:?}", session, self, next);
        *self = next;
    }
}

//! Daemon bootstrap.
//!
//! The [`Daemon`](daemon::Daemon) binds every configured listener while the
//! process still holds its network capability, switches to the run-as
//! identity described by [`RunAs`](privileges::RunAs), then serves forever.

pub mod daemon;
pub mod privileges;

pub use daemon::Daemon;
pub use privileges::RunAs;

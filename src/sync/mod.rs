//! Keeps a local mirror of one table in step with the service.
//!
//! The service never ships state over its push channel; it only signals
//! "something changed" with a bare token. This module turns that into a
//! pull-based loop: the listener bumps a monotonic cursor per invalidation,
//! the refresh worker answers every cursor change with one `GET` and swaps
//! the mirrored state wholesale. A cursor gate rejects pulls that would
//! apply out of order.

pub mod cursor;
pub mod session;

mod listener;
mod refresher;

pub use cursor::{CursorGate, SyncCursor};
pub use listener::STATE_CHANGED_TOKEN;
pub use session::{SessionError, SessionParams, TableSession};

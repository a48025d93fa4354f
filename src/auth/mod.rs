//! Authentication module for managing the dashboard session.
//!
//! This module provides `SessionManager`, the state machine over
//! `Anonymous -> Authenticating -> Authenticated / Error` that owns login,
//! logout, and session verification. Consumers read state through
//! `current()` or `subscribe()`; only the manager mutates it.

pub mod session;

pub use session::{AuthStatus, SessionManager, SessionState};

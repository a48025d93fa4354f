//! Poldash library: session management and the cached policy collection.
//!
//! The binary in `main.rs` is a thin interactive shell; everything with
//! behavior worth testing lives here:
//!
//! - `auth`: the session state machine (login, logout, verification)
//! - `cache`: two-tier (memory + disk) caching of policy collections
//! - `api`: the HTTP client for the policy governance backend
//! - `models`: policy records and the status vocabulary
//! - `app`: application state driven by the interactive shell

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

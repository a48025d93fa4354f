//! REST API client module for the policy governance backend.
//!
//! This module provides the `ApiClient` for the four endpoints the dashboard
//! consumes: `/login`, `/session`, `/logout`, and the paginated `/policies`
//! collection. Authentication is cookie-based; the cookie store inside the
//! client carries the credential implicitly.

pub mod client;
pub mod error;

pub use client::{ApiClient, SessionInfo};
pub use error::ApiError;

//! Data models for policy governance records.
//!
//! - `Policy`: one record from the `/policies` collection, with the fields
//!   the dashboard displays modeled explicitly and the rest passed through
//! - `STATUS_OPTIONS`: the approval-status vocabulary used for filtering

pub mod policy;

pub use policy::{Policy, STATUS_OPTIONS};

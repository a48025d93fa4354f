//! Policy records as returned by the governance API.
//!
//! The cache layer treats these as opaque rows; only the identifier is
//! interpreted, as a stable list key. Fields the dashboard displays are
//! modeled explicitly, everything else rides along in `extra` so records
//! survive a cache round-trip byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Approval statuses the dashboard knows how to filter on.
pub const STATUS_OPTIONS: [&str; 4] = ["Approved", "Draft", "Pending", "Rejected"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Resource ID", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "OPSS-Pol:Approval Status",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub approval_status: Option<String>,
    #[serde(rename = "Creation Date", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(
        rename = "Last Modification Date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub modified: Option<String>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Fields we don't model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Policy {
    /// Stable identifier used as the list key.
    pub fn key(&self) -> &str {
        self.id
            .as_deref()
            .or(self.resource_id.as_deref())
            .unwrap_or("")
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed policy)")
    }

    /// Case-insensitive substring match against name and description.
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        self.name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&needle))
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Match against a set of selected statuses. An empty selection matches
    /// everything; otherwise the record's status must contain one of them.
    pub fn matches_status(&self, selected: &[String]) -> bool {
        if selected.is_empty() {
            return true;
        }
        match self.approval_status.as_deref() {
            Some(status) => selected.iter().any(|s| status.contains(s.as_str())),
            None => false,
        }
    }
}

//! Technician models for ServiceDesk Plus API.
//!
//! A technician appears as the nested `technician` block of a request.

use serde::Deserialize;

/// The technician assigned to a request.
///
/// Only the fields the ticket summary shows are read.
#[derive(Debug, Clone, Deserialize)]
pub struct Technician {
    /// Technician's display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Technician's email address.
    #[serde(default)]
    pub email_id: Option<String>,
}

impl Technician {
    /// Returns the email if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.email_id.as_deref().filter(|e| !e.trim().is_empty())
    }
}

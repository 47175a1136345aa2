//! Request (ticket) models for ServiceDesk Plus API.
//!
//! This module defines the subset of the SDP request object the gateway
//! reads, and its projection into a [`TicketSummary`].

use serde::Deserialize;

use super::{TicketSummary, Technician};

/// A named entity reference, e.g. the request status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedEntity {
    /// Unique identifier.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub id: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Deserializes a value that can be either a string or an integer into a String.
pub(crate) fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(StringOrIntVisitor)
}

/// Deserializes an optional value that can be either a string or an integer into Option<String>.
pub(crate) fn deserialize_optional_string_or_int<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(OptionalStringOrIntVisitor)
}

struct OptionalStringOrIntVisitor;

impl<'de> serde::de::Visitor<'de> for OptionalStringOrIntVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("null, a string, or an integer")
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(StringOrIntVisitor).map(Some)
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }
}

struct StringOrIntVisitor;

impl<'de> serde::de::Visitor<'de> for StringOrIntVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string or an integer")
    }

    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(value.to_string())
    }

    fn visit_string<E: serde::de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(value)
    }

    fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(value.to_string())
    }

    fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(value.to_string())
    }
}

/// Minimal reference to a request; what the create endpoint echoes back.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestRef {
    /// The request ID, if present.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub id: Option<String>,
}

/// The parts of an SDP request object the gateway reads.
///
/// Every other field of the remote object is ignored, whatever its shape.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Unique request ID.
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    /// Current status.
    #[serde(default)]
    pub status: Option<NamedEntity>,

    /// Assigned technician.
    #[serde(default)]
    pub technician: Option<Technician>,

    /// Resolution details written by the technician.
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Request {
    /// Returns the status name or "Unknown".
    pub fn display_status(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Unknown")
    }

    /// Returns the technician name or "Unassigned".
    pub fn display_technician(&self) -> &str {
        self.technician
            .as_ref()
            .and_then(|t| t.name.as_deref())
            .unwrap_or("Unassigned")
    }

    /// Projects the request into the caller-facing summary.
    pub fn summary(&self) -> TicketSummary {
        TicketSummary {
            ticket_id: self.id.clone(),
            status: self.display_status().to_string(),
            technician_assigned: self.display_technician().to_string(),
            technician_contact_email: self
                .technician
                .as_ref()
                .and_then(|t| t.email())
                .map(str::to_string),
            technician_comments: self
                .resolution
                .as_ref()
                .and_then(|r| r.content.clone())
                .filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Resolution details for a request.
#[derive(Debug, Clone, Deserialize)]
pub struct Resolution {
    /// Resolution content (may contain HTML).
    #[serde(default)]
    pub content: Option<String>,
}

//! Caller-facing ticket shapes.
//!
//! [`TicketRequest`] is the validated input for ticket creation and knows how
//! to wrap itself in the SDP envelope. [`CreatedTicket`] and [`TicketSummary`]
//! are what the gateway hands back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A validated ticket creation request.
///
/// The optional objects are passed through to SDP as-is, so both
/// `{"name": "..."}` and richer structures work.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketRequest {
    /// Ticket subject.
    pub subject: String,
    /// Ticket description.
    pub description: String,
    /// Email of the requester raising the ticket.
    pub requester_email: String,
    /// Request template, e.g. `{"name": "Default Request"}`.
    pub template: Option<Value>,
    /// Urgency, e.g. `{"name": "High"}`.
    pub urgency: Option<Value>,
    /// Category.
    pub category: Option<Value>,
    /// Subcategory.
    pub subcategory: Option<Value>,
    /// Item.
    pub item: Option<Value>,
    /// User-defined fields keyed by their SDP field name.
    pub udf_fields: Option<Map<String, Value>>,
}

impl TicketRequest {
    /// Builds the `{"request": {...}}` envelope SDP expects.
    pub fn to_envelope(&self) -> Value {
        let mut request_data = Map::new();

        request_data.insert("subject".to_string(), json!(self.subject));
        request_data.insert("description".to_string(), json!(self.description));
        request_data.insert(
            "requester".to_string(),
            json!({"email_id": self.requester_email}),
        );

        let optional = [
            ("template", &self.template),
            ("urgency", &self.urgency),
            ("category", &self.category),
            ("subcategory", &self.subcategory),
            ("item", &self.item),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                request_data.insert(key.to_string(), value.clone());
            }
        }

        if let Some(udf) = self.udf_fields.as_ref().filter(|udf| !udf.is_empty()) {
            request_data.insert("udf_fields".to_string(), Value::Object(udf.clone()));
        }

        json!({ "request": request_data })
    }
}

/// Identifier of a ticket the gateway just created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    /// The SDP request ID.
    pub ticket_id: String,
}

/// Compact view of a remote ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    /// The SDP request ID.
    pub ticket_id: String,
    /// Status name, e.g. "Open".
    pub status: String,
    /// Assigned technician's name, or "Unassigned".
    pub technician_assigned: String,
    /// Assigned technician's email, if known.
    pub technician_contact_email: Option<String>,
    /// Resolution text written by the technician, if any.
    pub technician_comments: Option<String>,
}

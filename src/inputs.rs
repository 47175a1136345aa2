//! Inbound request bodies.
//!
//! # Input Sanitization
//!
//! `CreateTicketInput::sanitize()` trims whitespace from string fields and
//! drops the empty ones. `validate()` sanitizes first, so handlers only need
//! to call that.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::models::TicketRequest;

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Body of `POST /create_ticket`.
///
/// The required fields are optional on the wire so that a missing field is
/// reported by [`validate`](Self::validate) with the others, rather than as
/// a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTicketInput {
    /// Ticket subject (required).
    #[serde(default)]
    pub subject: Option<String>,

    /// Ticket description (required).
    #[serde(default)]
    pub description: Option<String>,

    /// Requester email (required).
    #[serde(default)]
    pub requester_email: Option<String>,

    /// Request template, e.g. `{"name": "Default Request"}`.
    #[serde(default)]
    pub template: Option<Value>,

    /// Urgency, e.g. `{"name": "High"}`.
    #[serde(default)]
    pub urgency: Option<Value>,

    /// Category.
    #[serde(default)]
    pub category: Option<Value>,

    /// Subcategory.
    #[serde(default)]
    pub subcategory: Option<Value>,

    /// Item.
    #[serde(default)]
    pub item: Option<Value>,

    /// User-defined fields.
    #[serde(default)]
    pub udf_fields: Option<Map<String, Value>>,
}

impl CreateTicketInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            subject: trim_option(&self.subject),
            description: trim_option(&self.description),
            requester_email: trim_option(&self.requester_email),
            template: self.template.filter(|v| !v.is_null()),
            urgency: self.urgency.filter(|v| !v.is_null()),
            category: self.category.filter(|v| !v.is_null()),
            subcategory: self.subcategory.filter(|v| !v.is_null()),
            item: self.item.filter(|v| !v.is_null()),
            udf_fields: self.udf_fields,
        }
    }

    /// Checks required fields and the email, producing a [`TicketRequest`].
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` listing every missing field, or
    /// `"Invalid email format"` if the email is malformed.
    pub fn validate(self) -> Result<TicketRequest, GatewayError> {
        let input = self.sanitize();

        let missing: Vec<String> = [
            ("subject", &input.subject),
            ("description", &input.description),
            ("requester_email", &input.requester_email),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(subject), Some(description), Some(requester_email)) =
            (input.subject, input.description, input.requester_email)
        else {
            return Err(GatewayError::missing_fields(missing));
        };

        if !is_valid_email(&requester_email) {
            return Err(GatewayError::validation("Invalid email format"));
        }

        Ok(TicketRequest {
            subject,
            description,
            requester_email,
            template: input.template,
            urgency: input.urgency,
            category: input.category,
            subcategory: input.subcategory,
            item: input.item,
            udf_fields: input.udf_fields,
        })
    }
}

/// An address needs an `@` and a dot somewhere in its domain.
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((_, domain)) => domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> CreateTicketInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_trim_option_trims_whitespace() {
        assert_eq!(trim_option(&Some("  hi ".into())), Some("hi".into()));
    }

    #[test]
    fn test_trim_option_filters_empty() {
        assert_eq!(trim_option(&Some("   ".into())), None);
        assert_eq!(trim_option(&None), None);
    }

    #[test]
    fn test_validate_minimal() {
        let request = tokio_test::assert_ok!(parse(json!({
            "subject": " Printer jam ",
            "description": "Tray 2",
            "requester_email": "a@b.com"
        }))
        .validate());

        assert_eq!(
            request,
            TicketRequest {
                subject: "Printer jam".into(),
                description: "Tray 2".into(),
                requester_email: "a@b.com".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_validate_keeps_optional_objects() {
        let request = parse(json!({
            "subject": "X",
            "description": "Y",
            "requester_email": "a@b.com",
            "template": {"name": "T"},
            "category": null,
            "udf_fields": {"udf_sline_301": "Laptop-42"}
        }))
        .validate()
        .unwrap();

        assert_eq!(request.template, Some(json!({"name": "T"})));
        assert_eq!(request.category, None);
        assert_eq!(
            request.udf_fields.unwrap().get("udf_sline_301"),
            Some(&json!("Laptop-42"))
        );
    }

    #[test]
    fn test_missing_fields_listed_in_order() {
        let err = parse(json!({"requester_email": "a@b.com", "description": "  "}))
            .validate()
            .unwrap_err();

        match err {
            GatewayError::Validation {
                message,
                missing_fields,
            } => {
                assert_eq!(message, "Missing required fields: subject, description");
                assert_eq!(missing_fields, vec!["subject", "description"]);
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_all_fields_missing() {
        let err = CreateTicketInput::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: Missing required fields: subject, description, requester_email"
        );
    }

    #[test]
    fn test_invalid_email_format() {
        for email in ["no-at-sign", "user@localhost", "user@"] {
            let err = parse(json!({
                "subject": "X",
                "description": "Y",
                "requester_email": email
            }))
            .validate()
            .unwrap_err();
            assert!(
                matches!(err, GatewayError::Validation { ref message, .. } if message == "Invalid email format"),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let input = parse(json!({"subject": "X", "priority": "High"}));
        assert_eq!(input.subject.as_deref(), Some("X"));
    }
}

//! Inbound webhook events from the task-tracking service.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

pub const EVENT: &str = "event";
pub const OBJECT_ID: &str = "objectId";
pub const ACCOUNT_ID: &str = "accountId";
pub const USER_ID: &str = "userId";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EventKind {
    ProjectCreated,
    ProjectUpdated,
    ProjectCopied,
    CompanyCreated,
    CompanyUpdated,
    Other(String),
}

impl EventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "PROJECT.CREATED" => EventKind::ProjectCreated,
            "PROJECT.UPDATED" => EventKind::ProjectUpdated,
            "PROJECT.COPIED" => EventKind::ProjectCopied,
            "COMPANY.CREATED" => EventKind::CompanyCreated,
            "COMPANY.UPDATED" => EventKind::CompanyUpdated,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::ProjectCreated => "PROJECT.CREATED",
            EventKind::ProjectUpdated => "PROJECT.UPDATED",
            EventKind::ProjectCopied => "PROJECT.COPIED",
            EventKind::CompanyCreated => "COMPANY.CREATED",
            EventKind::CompanyUpdated => "COMPANY.UPDATED",
            EventKind::Other(s) => s,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEvent {
    pub kind: EventKind,
    pub object_id: String,
    pub account_id: Option<String>,
    pub user_id: Option<String>,
}

/// Why a webhook form could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required field '{}'", self.0)
    }
}

impl std::error::Error for MissingField {}

impl WebhookEvent {
    /// Decode the form-encoded webhook fields. `event` and `objectId` are
    /// required; blank values count as missing.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, MissingField> {
        let field = |key: &str| {
            form.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let kind = field(EVENT).ok_or(MissingField(EVENT))?;
        let object_id = field(OBJECT_ID).ok_or(MissingField(OBJECT_ID))?;
        Ok(Self {
            kind: EventKind::parse(&kind),
            object_id,
            account_id: field(ACCOUNT_ID),
            user_id: field(USER_ID),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decodes_known_event() {
        let event = WebhookEvent::from_form(&form(&[
            ("event", "PROJECT.COPIED"),
            ("objectId", "42"),
            ("accountId", "1"),
            ("userId", "7"),
        ]))
        .unwrap();
        assert_eq!(event.kind, EventKind::ProjectCopied);
        assert_eq!(event.object_id, "42");
        assert_eq!(event.account_id.as_deref(), Some("1"));
        assert_eq!(event.user_id.as_deref(), Some("7"));
    }

    #[test]
    fn unknown_event_is_kept_verbatim() {
        let event =
            WebhookEvent::from_form(&form(&[("event", "TASK.CREATED"), ("objectId", "1")])).unwrap();
        assert_eq!(event.kind, EventKind::Other("TASK.CREATED".into()));
        assert_eq!(event.kind.to_string(), "TASK.CREATED");
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_eq!(
            WebhookEvent::from_form(&form(&[("objectId", "1")])),
            Err(MissingField("event"))
        );
        assert_eq!(
            WebhookEvent::from_form(&form(&[("event", "PROJECT.CREATED"), ("objectId", " ")])),
            Err(MissingField("objectId"))
        );
    }
}

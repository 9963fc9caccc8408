use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SessionError};
use crate::models::cookie::SessionCookie;

/// Persisted session state as read from or written to a store.
///
/// `expires` and `cookie` are managed by the session and never copied back
/// into it verbatim. Every other unknown key lands in `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<CookieSnapshot>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SessionSnapshot {
    /// Decodes a snapshot from the JSON a store handed back.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(sonic_rs::from_str(json)?)
    }

    /// Encodes the snapshot as JSON for a store.
    pub fn to_json(&self) -> Result<String> {
        Ok(sonic_rs::to_string(self)?)
    }

    /// The expiry the store last persisted for this session.
    ///
    /// Read from `cookie.expires` when a cookie was stored, otherwise from the
    /// top-level `expires`. `Ok(None)` means no absolute expiry was recorded.
    pub fn stored_expiry(&self) -> Result<Option<DateTime<Utc>>> {
        match (&self.cookie, &self.expires) {
            (Some(cookie), _) => cookie.parse_expires(),
            (None, Some(expires)) => parse_expiry_value(expires),
            (None, None) => Ok(None),
        }
    }
}

/// The stored form of the session cookie.
///
/// Only `expires` is interpreted; a store may hand it back as an ISO-8601
/// string, an RFC 2822 string, epoch milliseconds or `null`. An absent key
/// stays `None`, an explicit `null` is `Some(Value::Null)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieSnapshot {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires: Option<Value>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CookieSnapshot {
    /// Parses the stored expiry.
    ///
    /// # Returns
    ///
    /// `Ok(None)` for an explicit `null` (browser-session cookie),
    /// `Ok(Some(t))` for a valid timestamp, and `SessionError::InvalidExpiry`
    /// for a missing key or anything else. Invalid input is never coerced to
    /// a default date.
    pub fn parse_expires(&self) -> Result<Option<DateTime<Utc>>> {
        match &self.expires {
            None => Err(invalid("<missing>", "stored cookie has no expires")),
            Some(value) => parse_expiry_value(value),
        }
    }
}

impl From<&SessionCookie> for CookieSnapshot {
    fn from(cookie: &SessionCookie) -> Self {
        let mut attributes = Map::new();
        attributes.insert(
            "originalMaxAge".to_string(),
            cookie
                .max_age()
                .map(|d| Value::from(d.num_milliseconds()))
                .unwrap_or(Value::Null),
        );
        attributes.insert("path".to_string(), Value::from(cookie.path()));
        if let Some(domain) = cookie.domain() {
            attributes.insert("domain".to_string(), Value::from(domain));
        }
        attributes.insert("secure".to_string(), Value::from(cookie.secure()));
        attributes.insert("httpOnly".to_string(), Value::from(cookie.http_only()));
        if let Some(same_site) = cookie.same_site() {
            attributes.insert("sameSite".to_string(), Value::from(same_site.as_str()));
        }

        Self {
            expires: Some(
                cookie
                    .expires()
                    .map(|t| Value::from(format_timestamp(t)))
                    .unwrap_or(Value::Null),
            ),
            attributes,
        }
    }
}

/// Formats a timestamp the way JavaScript's `Date.toISOString` does.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 or RFC 2822 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| invalid(raw, &e.to_string()))
}

/// Parses a stored expiry value; `null` means no absolute expiry.
fn parse_expiry_value(value: &Value) -> Result<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => parse_timestamp(raw).map(Some),
        Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(|| invalid(&n.to_string(), "not an integer"))?;
            DateTime::from_timestamp_millis(millis)
                .map(Some)
                .ok_or_else(|| invalid(&n.to_string(), "timestamp out of range"))
        }
        other => Err(invalid(&other.to_string(), "unsupported type")),
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it differs from an absent key.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn invalid(value: &str, reason: &str) -> SessionError {
    SessionError::InvalidExpiry {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

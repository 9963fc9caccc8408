use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookie;
use tower_cookies::cookie::time::OffsetDateTime;

use crate::error::{Result, SessionError};

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// The lowercase attribute value, as stored in snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "none",
        }
    }
}

impl From<SameSite> for tower_cookies::cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Strict => tower_cookies::cookie::SameSite::Strict,
            SameSite::Lax => tower_cookies::cookie::SameSite::Lax,
            SameSite::None => tower_cookies::cookie::SameSite::None,
        }
    }
}

/// Options the session cookie is built from.
///
/// `max_age` is in milliseconds. `None` (or zero) means no absolute expiry:
/// the cookie lives as long as the browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieOptions {
    pub max_age: Option<u64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            path: None,
            domain: None,
            secure: false,
            http_only: true,
            same_site: None,
        }
    }
}

impl CookieOptions {
    /// Sets the max age in milliseconds.
    pub fn with_max_age(mut self, max_age_ms: u64) -> Self {
        self.max_age = Some(max_age_ms);
        self
    }
}

/// Attribute container for the session cookie.
///
/// Holds presentation metadata and the cookie's `expires`. The owning
/// [`Session`](crate::Session) reads its own expiry from here, so the two
/// can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    max_age: Option<u64>,
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
    expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
    /// Creates a new `SessionCookie` with no expiry set.
    ///
    /// # Returns
    ///
    /// A `Result` containing the cookie, or a configuration error when
    /// `SameSite=None` is requested without `Secure` or the max age does not
    /// fit in a duration.
    pub fn new(options: &CookieOptions) -> Result<Self> {
        if options.same_site == Some(SameSite::None) && !options.secure {
            return Err(SessionError::Configuration(
                "SameSite=None requires the Secure attribute".to_string(),
            ));
        }

        if let Some(ms) = options.max_age {
            i64::try_from(ms)
                .ok()
                .and_then(Duration::try_milliseconds)
                .ok_or_else(|| {
                    SessionError::Configuration(format!("Cookie max age out of range: {} ms", ms))
                })?;
        }

        Ok(Self {
            max_age: options.max_age.filter(|ms| *ms > 0),
            path: options.path.clone().unwrap_or_else(|| "/".to_string()),
            domain: options.domain.clone(),
            secure: options.secure,
            http_only: options.http_only,
            same_site: options.same_site,
            expires: None,
        })
    }

    /// The configured max age, if any.
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
            .and_then(|ms| i64::try_from(ms).ok())
            .and_then(Duration::try_milliseconds)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// The absolute expiry of the cookie; `None` for a browser-session cookie.
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub(crate) fn set_expires(&mut self, expires: Option<DateTime<Utc>>) {
        self.expires = expires;
    }

    /// Builds a `Set-Cookie` ready cookie carrying `value` with these attributes.
    ///
    /// # Arguments
    ///
    /// * `name` - The cookie name.
    /// * `value` - The cookie value, normally the signed session id.
    pub fn to_cookie(&self, name: &str, value: &str) -> Result<Cookie<'static>> {
        let mut cookie = Cookie::new(name.to_string(), value.to_string());

        cookie.set_path(self.path.clone());
        cookie.set_http_only(self.http_only);
        cookie.set_secure(self.secure);

        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }

        if let Some(same_site) = self.same_site {
            cookie.set_same_site(tower_cookies::cookie::SameSite::from(same_site));
        }

        if let Some(expires) = self.expires {
            let expires = OffsetDateTime::from_unix_timestamp(expires.timestamp())
                .map_err(|e| SessionError::Configuration(format!("Cookie expiry out of range: {}", e)))?;
            cookie.set_expires(expires);
        }

        Ok(cookie)
    }
}

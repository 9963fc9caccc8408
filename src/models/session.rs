use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::crypto::id::IdGenerator;
use crate::crypto::secret::Secret;
use crate::crypto::signature;
use crate::error::{Result, SessionError};
use crate::models::cookie::{CookieOptions, SessionCookie};
use crate::models::snapshot::{CookieSnapshot, SessionSnapshot, format_timestamp};

/// Keys owned by the session itself. Application data may not use them.
pub const RESERVED_KEYS: [&str; 4] = ["sessionId", "encryptedSessionId", "expires", "cookie"];

/// Represents one HTTP session.
///
/// The session id is signed with the secret for transport in a cookie
/// (`encrypted_session_id`). Expiry is held once, by the cookie, so the
/// session expiry and `cookie.expires` are always the same value.
///
/// ⚠️ A session built from a prior snapshot trusts the snapshot's
/// `sessionId`. Verify the client's signed cookie (see
/// [`SessionManager::load_signed`](crate::SessionManager::load_signed))
/// before handing a stored snapshot to [`Session::new`] or [`Session::restore`].
#[derive(Clone)]
pub struct Session {
    session_id: String,
    encrypted_session_id: String,
    cookie: SessionCookie,
    data: Map<String, Value>,
    generate_id: Arc<dyn IdGenerator>,
    max_age: Option<Duration>,
    secret: Secret,
}

impl Session {
    /// Creates a session, merging in prior state if any.
    ///
    /// Expiry is always recomputed from `cookie_options` (rolling). A fresh id
    /// is minted only when `prior` carries no `sessionId`.
    ///
    /// # Arguments
    ///
    /// * `generate_id` - The identifier generator.
    /// * `cookie_options` - Options for the session cookie, including `max_age`.
    /// * `secret` - The signing secret.
    /// * `prior` - Previously stored state; `SessionSnapshot::default()` for none.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Session`.
    pub fn new(
        generate_id: Arc<dyn IdGenerator>,
        cookie_options: &CookieOptions,
        secret: Secret,
        prior: SessionSnapshot,
    ) -> Result<Self> {
        let cookie = SessionCookie::new(cookie_options)?;
        let max_age = cookie.max_age();

        let mut session = Self {
            session_id: String::new(),
            encrypted_session_id: String::new(),
            cookie,
            data: Map::new(),
            generate_id,
            max_age,
            secret,
        };

        session.merge(prior);
        session.touch();

        if session.session_id.is_empty() {
            session.regenerate()?;
        } else if session.encrypted_session_id.is_empty() {
            session.encrypted_session_id = signature::sign(&session.session_id, &session.secret)?;
        }

        Ok(session)
    }

    /// Creates a session without rolling expiry.
    ///
    /// Builds the session exactly like [`Session::new`], then, if `prior`
    /// carries a cookie, replaces the freshly computed expiry with the stored
    /// one. Without a stored cookie the rolling expiry is kept.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Session`, or `SessionError::InvalidExpiry`
    /// if the stored cookie expiry cannot be parsed.
    pub fn restore(
        generate_id: Arc<dyn IdGenerator>,
        cookie_options: &CookieOptions,
        secret: Secret,
        mut prior: SessionSnapshot,
    ) -> Result<Self> {
        let prior_cookie = prior.cookie.take();
        let mut restored = Self::new(generate_id, cookie_options, secret, prior)?;

        if let Some(prior_cookie) = prior_cookie {
            let mut cookie = SessionCookie::new(cookie_options)?;
            cookie.set_expires(prior_cookie.parse_expires()?);
            restored.cookie = cookie;
            tracing::debug!("Session expiry restored: {:?}", restored.expires());
        }

        Ok(restored)
    }

    /// Pushes expiry to now + max age. No-op without a max age.
    pub fn touch(&mut self) {
        if let Some(max_age) = self.max_age {
            let expires = Utc::now()
                .checked_add_signed(max_age)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.cookie.set_expires(Some(expires));
        }
    }

    /// Rotates the session id and its signature.
    ///
    /// On failure the current id and signature are left untouched.
    pub fn regenerate(&mut self) -> Result<()> {
        let session_id = self.generate_id.generate()?;
        let encrypted_session_id = signature::sign(&session_id, &self.secret)?;

        self.session_id = session_id;
        self.encrypted_session_id = encrypted_session_id;

        tracing::debug!("🔑 Session id regenerated: {}…", prefix(&self.session_id));
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The signed session id, as sent to the client.
    pub fn encrypted_session_id(&self) -> &str {
        &self.encrypted_session_id
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.cookie.expires()
    }

    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    /// Whether the session has an expiry that has already passed.
    pub fn is_expired(&self) -> bool {
        self.expires().is_some_and(|expires| expires <= Utc::now())
    }

    /// Checks that `encrypted_session_id` is the signature of `session_id`.
    pub fn verify_signature(&self) -> bool {
        signature::unsign(&self.encrypted_session_id, &self.secret).as_deref()
            == Some(self.session_id.as_str())
    }

    /// Application data carried by the session.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Reads and deserializes an application value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.data
            .get(key)
            .map(|value| T::deserialize(value).map_err(SessionError::from))
            .transpose()
    }

    /// Stores an application value, returning the previous one.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<Option<Value>> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(SessionError::ReservedKey(key));
        }
        let value = serde_json::to_value(value)?;
        Ok(self.data.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// The persisted form of this session. Private configuration is never included.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Some(self.session_id.clone()),
            encrypted_session_id: Some(self.encrypted_session_id.clone()),
            expires: Some(
                self.expires()
                    .map(|t| Value::from(format_timestamp(t)))
                    .unwrap_or(Value::Null),
            ),
            cookie: Some(CookieSnapshot::from(&self.cookie)),
            data: self.data.clone(),
        }
    }

    /// Copies prior state in, skipping `expires` and `cookie`.
    fn merge(&mut self, prior: SessionSnapshot) {
        let SessionSnapshot {
            session_id,
            encrypted_session_id,
            data,
            ..
        } = prior;

        if let Some(session_id) = session_id {
            self.session_id = session_id;
        }
        if let Some(encrypted_session_id) = encrypted_session_id {
            self.encrypted_session_id = encrypted_session_id;
        }

        self.data.extend(
            data.into_iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str())),
        );
    }
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("encrypted_session_id", &self.encrypted_session_id)
            .field("cookie", &self.cookie)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

fn prefix(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

use std::sync::Arc;

use chrono::Utc;
use tower_cookies::Cookie;

use crate::config::SessionConfig;
use crate::crypto::id::{IdGenerator, RandomIdGenerator};
use crate::crypto::signature;
use crate::error::Result;
use crate::models::session::Session;
use crate::models::snapshot::SessionSnapshot;

/// Builds sessions from a [`SessionConfig`].
///
/// Picks the rolling ([`Session::new`]) or fixed ([`Session::restore`])
/// entry point from `config.rolling`, and checks client cookies before a
/// stored snapshot is trusted.
#[derive(Clone)]
pub struct SessionManager {
    config: SessionConfig,
    generate_id: Arc<dyn IdGenerator>,
}

impl SessionManager {
    /// Creates a new `SessionManager` that mints random ids.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_generator(config, Arc::new(RandomIdGenerator))
    }

    /// Creates a new `SessionManager` with a custom id generator.
    pub fn with_generator(config: SessionConfig, generate_id: Arc<dyn IdGenerator>) -> Self {
        Self { config, generate_id }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a brand new session.
    pub fn create(&self) -> Result<Session> {
        let session = Session::new(
            self.generate_id.clone(),
            &self.config.cookie,
            self.config.secret.clone(),
            SessionSnapshot::default(),
        )?;
        tracing::debug!("✅ Session created");
        Ok(session)
    }

    /// Rebuilds a session from stored state.
    ///
    /// The caller must already have checked the client's signed cookie
    /// against `prior`; use [`SessionManager::load_signed`] otherwise.
    pub fn load(&self, prior: SessionSnapshot) -> Result<Session> {
        if self.config.rolling {
            Session::new(
                self.generate_id.clone(),
                &self.config.cookie,
                self.config.secret.clone(),
                prior,
            )
        } else {
            Session::restore(
                self.generate_id.clone(),
                &self.config.cookie,
                self.config.secret.clone(),
                prior,
            )
        }
    }

    /// Verifies the client's signed cookie value, then rebuilds the session.
    ///
    /// # Arguments
    ///
    /// * `cookie_value` - The signed session id sent by the client.
    /// * `prior` - The snapshot the store returned for that id.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the signature is invalid, does not name the stored
    /// session, or the expiry the store recorded has passed (in rolling mode
    /// too). The caller should then discard the stored entry and [`create`](SessionManager::create) a new
    /// session.
    pub fn load_signed(&self, cookie_value: &str, prior: SessionSnapshot) -> Result<Option<Session>> {
        let Some(session_id) = signature::unsign(cookie_value, &self.config.secret) else {
            tracing::warn!("❌ Session cookie signature rejected");
            return Ok(None);
        };

        if prior.session_id.as_deref() != Some(session_id.as_str()) {
            tracing::warn!("❌ Session cookie does not match stored session");
            return Ok(None);
        }

        let stored_expiry = prior.stored_expiry().map_err(|e| {
            tracing::warn!("❌ Stored session unusable: {}", e);
            e
        })?;

        if stored_expiry.is_some_and(|expires| expires <= Utc::now()) {
            tracing::debug!("Session expired, discarding");
            return Ok(None);
        }

        self.load(prior).map(Some)
    }

    /// Whether `session` should be written to the store.
    ///
    /// With `save_uninitialized` off, sessions carrying no application data
    /// are not persisted.
    pub fn should_save(&self, session: &Session) -> bool {
        self.config.save_uninitialized || !session.data().is_empty()
    }

    /// Builds the cookie carrying the signed session id.
    pub fn set_cookie(&self, session: &Session) -> Result<Cookie<'static>> {
        session
            .cookie()
            .to_cookie(&self.config.cookie_name, session.encrypted_session_id())
    }
}

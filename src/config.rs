use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroize;

use crate::crypto::secret::Secret;
use crate::models::cookie::{CookieOptions, SameSite};

/// The minimum length of the signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;
/// The default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "sessionId";

/// The session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// The name of the session cookie.
    pub cookie_name: String,
    /// Attributes of the session cookie, including the max age.
    pub cookie: CookieOptions,
    /// The secret used to sign session ids.
    pub secret: Secret,
    /// Whether every load pushes expiry forward. When `false`, stored
    /// sessions keep their absolute expiry.
    pub rolling: bool,
    /// Whether sessions without application data are worth persisting.
    pub save_uninitialized: bool,
}

impl SessionConfig {
    /// Creates a new `SessionConfig` with defaults for everything but the secret.
    pub fn new(secret: Secret) -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie: CookieOptions::default(),
            secret,
            rolling: true,
            save_uninitialized: true,
        }
    }

    /// Creates a new `SessionConfig` from environment variables.
    ///
    /// A `.env` file in the working directory is honored if present.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `SessionConfig`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `SessionConfig` from an arbitrary variable source.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of a variable, or `None` if unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secret_raw = lookup("SESSION_SECRET")
            .context("SESSION_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if secret_raw.len() < MIN_SECRET_LEN {
            secret_raw.zeroize();
            anyhow::bail!("SESSION_SECRET must be at least {} bytes", MIN_SECRET_LEN);
        }

        let secret = Secret::new(secret_raw.as_bytes());
        secret_raw.zeroize();
        let secret = secret.context("Invalid SESSION_SECRET")?;

        let max_age = match non_empty(lookup("SESSION_MAX_AGE_MS")) {
            Some(raw) => Some(raw.parse::<u64>().context("Invalid SESSION_MAX_AGE_MS")?),
            None => None,
        };

        let same_site = match non_empty(lookup("SESSION_COOKIE_SAME_SITE")) {
            Some(raw) => Some(parse_same_site(&raw)?),
            None => None,
        };

        Ok(Self {
            cookie_name: non_empty(lookup("SESSION_COOKIE_NAME"))
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            cookie: CookieOptions {
                max_age,
                path: non_empty(lookup("SESSION_COOKIE_PATH")),
                domain: non_empty(lookup("SESSION_COOKIE_DOMAIN")),
                secure: parse_flag(&lookup, "SESSION_COOKIE_SECURE", false)?,
                http_only: parse_flag(&lookup, "SESSION_COOKIE_HTTP_ONLY", true)?,
                same_site,
            },
            secret,
            rolling: parse_flag(&lookup, "SESSION_ROLLING", true)?,
            save_uninitialized: parse_flag(&lookup, "SESSION_SAVE_UNINITIALIZED", true)?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("Invalid {}: expected a boolean, got {:?}", key, raw),
        },
    }
}

fn parse_same_site(raw: &str) -> Result<SameSite> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        _ => anyhow::bail!("Invalid SESSION_COOKIE_SAME_SITE: {:?}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "a-secret-with-at-least-thirty-two-bytes";

    fn load(vars: &[(&str, &str)]) -> Result<SessionConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SessionConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SESSION_SECRET", SECRET)]).unwrap();

        assert_eq!(config.cookie_name, "sessionId");
        assert_eq!(config.cookie.max_age, None);
        assert!(config.cookie.http_only);
        assert!(!config.cookie.secure);
        assert!(config.rolling);
        assert!(config.save_uninitialized);
        assert_eq!(config.secret.as_bytes(), SECRET.as_bytes());
    }

    #[test]
    fn test_missing_secret_fails() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_short_secret_fails() {
        let err = load(&[("SESSION_SECRET", "s3cret")]).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_full_configuration() {
        let config = load(&[
            ("SESSION_SECRET", SECRET),
            ("SESSION_COOKIE_NAME", "sid"),
            ("SESSION_MAX_AGE_MS", "60000"),
            ("SESSION_COOKIE_PATH", "/app"),
            ("SESSION_COOKIE_DOMAIN", "example.com"),
            ("SESSION_COOKIE_SECURE", "true"),
            ("SESSION_COOKIE_HTTP_ONLY", "false"),
            ("SESSION_COOKIE_SAME_SITE", "Strict"),
            ("SESSION_ROLLING", "0"),
            ("SESSION_SAVE_UNINITIALIZED", "no"),
        ])
        .unwrap();

        assert_eq!(config.cookie_name, "sid");
        assert_eq!(config.cookie.max_age, Some(60_000));
        assert_eq!(config.cookie.path.as_deref(), Some("/app"));
        assert_eq!(config.cookie.domain.as_deref(), Some("example.com"));
        assert!(config.cookie.secure);
        assert!(!config.cookie.http_only);
        assert_eq!(config.cookie.same_site, Some(SameSite::Strict));
        assert!(!config.rolling);
        assert!(!config.save_uninitialized);
    }

    #[test]
    fn test_empty_max_age_means_session_cookie() {
        let config = load(&[("SESSION_SECRET", SECRET), ("SESSION_MAX_AGE_MS", "")]).unwrap();
        assert_eq!(config.cookie.max_age, None);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(load(&[("SESSION_SECRET", SECRET), ("SESSION_MAX_AGE_MS", "soon")]).is_err());
        assert!(load(&[("SESSION_SECRET", SECRET), ("SESSION_ROLLING", "maybe")]).is_err());
        assert!(load(&[("SESSION_SECRET", SECRET), ("SESSION_COOKIE_SAME_SITE", "loose")]).is_err());
    }
}

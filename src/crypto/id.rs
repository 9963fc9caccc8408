use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// The number of random bytes in a session id.
const SESSION_ID_SIZE: usize = 24;

/// Produces fresh, unguessable session identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier. Each call must yield a distinct value.
    fn generate(&self) -> Result<String>;
}

impl<F> IdGenerator for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn generate(&self) -> Result<String> {
        self()
    }
}

/// Generates URL-safe base64 ids from OS randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String> {
        let mut id = [0u8; SESSION_ID_SIZE];
        OsRng
            .try_fill_bytes(&mut id)
            .map_err(|e| SessionError::IdGeneration(format!("OS RNG failure: {}", e)))?;

        Ok(general_purpose::URL_SAFE_NO_PAD.encode(id))
    }
}

/// Generates hyphenated UUIDv4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}

//! Server-side HTTP session lifecycle: id generation, signed ids for the
//! session cookie, rolling or fixed expiry, and restoration from a stored
//! snapshot.

pub mod config;
pub mod error;
pub mod manager;

pub mod crypto {
    pub mod id;
    pub mod secret;
    pub mod signature;
}

pub mod models {
    pub mod cookie;
    pub mod session;
    pub mod snapshot;
}

pub use config::SessionConfig;
pub use crypto::id::{IdGenerator, RandomIdGenerator, UuidGenerator};
pub use crypto::secret::Secret;
pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use models::cookie::{CookieOptions, SameSite, SessionCookie};
pub use models::session::Session;
pub use models::snapshot::{CookieSnapshot, SessionSnapshot};

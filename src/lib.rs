//! Security and content-validation core for the laboratory site admin area.
//!
//! The rendering shell is an external collaborator; it consumes two things
//! from this crate: a validated, sanitized [`SiteContent`] snapshot, and an
//! authentication decision ([`LoginOutcome`]). Everything persisted lives
//! behind the [`KeyValueStore`] seam, which in the browser is backed by
//! local storage.
//!
//! None of this is true cryptographic secrecy — every secret here is
//! derivable client-side. The session machinery raises the bar against
//! casual tampering and leaves an encrypted audit trail; it does not defend
//! against an attacker with access to the runtime.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod sanitize;
pub mod store;

pub mod crypto {
    pub mod aes;
    pub mod fingerprint;
}

pub mod models {
    pub mod content;
    pub mod session;
}

pub mod validation {
    pub mod content;
}

pub mod services {
    pub mod audit;
    pub mod auth;
    pub mod content;
    pub mod limiter;
}

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use crypto::fingerprint::BrowserEnvironment;
pub use error::{AppError, Result};
pub use events::ContentBroadcast;
pub use models::content::SiteContent;
pub use models::session::{
    BlockStatus, LoginAttemptState, LoginOutcome, SecurityEvent, SecurityEventKind, TokenClaims,
};
pub use services::audit::SecurityLog;
pub use services::auth::AuthService;
pub use services::content::{ContentList, ContentService, SaveOutcome};
pub use services::limiter::AttemptLimiter;
pub use store::{KeyValueStore, MemoryStore};
pub use validation::content::{FieldError, ValidationOutcome, validate_site_content};

/// Initializes the tracing subscriber, honoring `RUST_LOG`.
///
/// Intended for the embedding shell or demos; safe to skip in tests.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

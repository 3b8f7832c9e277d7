//! Bearer token authentication.
//!
//! Dual-token system: short-lived access tokens (stateless, verified by
//! signature alone) and long-lived refresh tokens (database-tracked,
//! exchanged through the token service). Protected routes are wrapped in
//! [`require_bearer`] and read the caller through [`Authenticated`].

mod errors;
mod extractors;
mod ip;
mod middleware;
mod types;

pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::Authenticated;
pub use ip::client_ip;
pub use middleware::{BEARER_SCHEME, bearer_token, require_bearer};
pub use types::AuthenticatedSubject;

//! # Conferma
//!
//! Passwordless login by confirmation: the service mails (or otherwise
//! delivers) a signed, short-lived token to an address, and whoever presents
//! it back proves control of that address. The flow keeps no server-side
//! state; every step travels inside a signed JWT.
//!
//! 1. `GET /login?user=&address=&site=` sends a "confirm" token.
//! 2. `GET /login?token=` resolves it into a session cookie, or, when
//!    password mode is on, into a "credentials" token.
//! 3. `GET|POST /credentials` finishes the password step.
//!
//! The core lives in [`conferma::VerifyProvider`]; delivery, persistence and
//! password checks are injected collaborators.

pub mod cli;
pub mod conferma;

pub use self::conferma::GIT_COMMIT_HASH;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

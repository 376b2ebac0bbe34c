//! Auth handlers and supporting modules.
//!
//! This module coordinates registration, password login with brute-force
//! lockout, refresh-token rotation, and password changes.
//!
//! ## Lockout
//!
//! Login failures increment a per-user counter in a single atomic UPDATE.
//! Reaching the configured threshold locks the account for the configured
//! window; login and bearer auth both reject locked accounts with 423. Locks
//! expire lazily, the counter resets only on the next successful login.
//!
//! ## Refresh tokens
//!
//! Every refresh token is registered by `jti` and redeemed exactly once.
//! Redemption revokes the presented token and registers its successor in one
//! transaction; password changes revoke all of a user's tokens the same way.

pub(crate) mod change_password;
mod credentials;
mod lockout;
pub(crate) mod login;
pub(crate) mod principal;
pub(crate) mod refresh;
pub(crate) mod register;
mod state;
pub(crate) mod storage;
pub(crate) mod types;
pub(crate) mod utils;

pub use state::{AuthConfig, AuthState};

pub(crate) use credentials::check_dummy_hash;

#[cfg(test)]
mod tests;

//! # auth-adapters
//!
//! Credential and session primitives: Argon2 password hashing, the random
//! secrets behind password reset, signed session tokens, and the Google
//! sign-in client.

pub mod codes;
pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "oauth-google")]
pub mod google;

pub use codes::RandomCodes;
pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtSessions, OAuthState, SessionClaims, TokenError};

#[cfg(feature = "oauth-google")]
pub use google::{GoogleConfig, GoogleIdentityProvider};

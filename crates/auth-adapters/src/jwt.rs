//! HS256 session tokens and the short-lived `state` token that protects the
//! Google sign-in round trip.

use chrono::{Duration, Utc};
use domains::{CodeGenerator, User, UserRole};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::codes::RandomCodes;

const SESSION_AUDIENCE: &str = "session";
const STATE_AUDIENCE: &str = "oauth-state";
const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: i64,
    pub role: UserRole,
    pub aud: String,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    nonce: String,
    aud: String,
    exp: i64,
}

/// A signed `state` for the provider round trip and the nonce it carries.
/// The nonce goes to the browser that started the flow; the callback must
/// present both.
#[derive(Debug, Clone)]
pub struct OAuthState {
    pub token: String,
    pub nonce: String,
}

pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &SecretString, session_ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            session_ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sub: user.id,
            role: user.role,
            aud: SESSION_AUDIENCE.to_string(),
            exp: (Utc::now() + self.session_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.check(token, SESSION_AUDIENCE)
    }

    pub fn issue_state(&self) -> Result<OAuthState, TokenError> {
        let claims = StateClaims {
            nonce: RandomCodes.lookup_token(),
            aud: STATE_AUDIENCE.to_string(),
            exp: (Utc::now() + Duration::minutes(STATE_TTL_MINUTES)).timestamp(),
        };
        let token = self.sign(&claims)?;
        Ok(OAuthState { token, nonce: claims.nonce })
    }

    /// Accepts `state` only alongside the nonce it was issued with.
    pub fn verify_state(&self, state: &str, nonce: &str) -> Result<(), TokenError> {
        let claims = self.check::<StateClaims>(state, STATE_AUDIENCE)?;
        if bool::from(claims.nonce.as_bytes().ct_eq(nonce.as_bytes())) {
            Ok(())
        } else {
            Err(TokenError::Invalid)
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "failed to sign token");
            TokenError::Invalid
        })
    }

    fn check<T: for<'de> Deserialize<'de>>(&self, token: &str, audience: &str) -> Result<T, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(&[audience]);
        validation.leeway = 0;

        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

//! Random secrets for the password-reset flow.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use domains::CodeGenerator;
use rand::Rng;

/// Bytes of entropy behind each lookup token.
const TOKEN_BYTES: usize = 16;

/// Draws codes and tokens from the thread-local CSPRNG.
#[derive(Debug, Default, Clone)]
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn numeric_code(&self) -> String {
        rand::rng().random_range(1000..10000).to_string()
    }

    fn lookup_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

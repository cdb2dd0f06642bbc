//! RSVP token generation.
//!
//! Tokens are 128 random bits from the OS CSPRNG, base58 encoded (Bitcoin
//! alphabet) and left-padded with the base58 zero digit to a fixed width, so
//! every token is URL path safe and the same length.

use crate::domain::record::RsvpId;
use rand::rngs::OsRng;
use rand::RngCore;

/// Entropy per token in bytes (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Encoded token length. 58^22 > 2^128, so 22 digits hold any 128-bit value.
pub const TOKEN_LENGTH: usize = 22;

/// Base58 zero digit used for padding.
const PAD_DIGIT: char = '1';

/// Token generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenGenerator;

impl TokenGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh token id.
    pub fn generate(&self) -> RsvpId {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        RsvpId::new(encode_fixed(&bytes))
    }
}

/// Base58 encode and left-pad to [`TOKEN_LENGTH`].
fn encode_fixed(bytes: &[u8; TOKEN_BYTES]) -> String {
    let encoded = bs58::encode(bytes).into_string();
    let mut id = String::with_capacity(TOKEN_LENGTH);
    for _ in encoded.len()..TOKEN_LENGTH {
        id.push(PAD_DIGIT);
    }
    id.push_str(&encoded);
    id
}

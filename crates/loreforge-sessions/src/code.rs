//! Join-code issuance.
//!
//! Codes are six characters over `A-Z0-9`, drawn from the operating
//! system's entropy source. Simulation randomness elsewhere in the
//! workspace uses a seedable PRNG; codes are security-sensitive and
//! deliberately do not share that stream. Uniqueness is the session
//! repository's job -- on collision the caller regenerates and retries.

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::SessionError;

/// Length of a join code.
pub const CODE_LENGTH: usize = 6;

/// The join-code alphabet.
const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a fresh join code from OS entropy.
///
/// Each output byte is reduced modulo the alphabet size. The slight
/// modulo bias is irrelevant at this entropy level and code lifetime.
pub fn generate_join_code() -> Result<String, SessionError> {
    let mut bytes = [0_u8; CODE_LENGTH];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SessionError::Entropy(e.to_string()))?;

    let code: String = bytes
        .iter()
        .map(|byte| {
            let index = usize::from(*byte) % ALPHABET.len();
            char::from(ALPHABET.get(index).copied().unwrap_or(b'A'))
        })
        .collect();
    Ok(code)
}

/// Whether a string is a well-formed join code.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_chars_over_the_alphabet() {
        for _ in 0..100 {
            let code = generate_join_code().unwrap_or_default();
            assert!(is_valid_code(&code), "bad code: {code}");
        }
    }

    #[test]
    fn codes_vary() {
        let first = generate_join_code().unwrap_or_default();
        let mut any_different = false;
        for _ in 0..10 {
            if generate_join_code().unwrap_or_default() != first {
                any_different = true;
                break;
            }
        }
        assert!(any_different, "entropy source produced ten identical codes");
    }

    #[test]
    fn validity_check_rejects_malformed_codes() {
        assert!(is_valid_code("ABC123"));
        assert!(!is_valid_code("abc123"));
        assert!(!is_valid_code("ABC12"));
        assert!(!is_valid_code("ABC12!"));
        assert!(!is_valid_code(""));
    }
}

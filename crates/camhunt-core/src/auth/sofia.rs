//! The "sofia" password digest.
//!
//! XM firmware never receives a plaintext password.  It expects an 8-character
//! string derived from the MD5 digest of the password:
//!
//! ```text
//! digest = md5(utf8(password))               16 bytes
//! pair i = (digest[2i], digest[2i + 1])       i in 0..8
//! char i = ALPHABET[(pair.0 + pair.1) % 62]
//! ```
//!
//! There is no salt, so this is an interoperability shim and provides no
//! protection for the password.

/// Characters the digest maps into, in firmware order.
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of every sofia digest.
pub const SOFIA_HASH_LEN: usize = 8;

/// Computes the sofia digest of `password`.
///
/// # Examples
///
/// ```rust
/// use camhunt_core::sofia_hash;
///
/// assert_eq!(sofia_hash(""), "tlJwpbo6");
/// ```
pub fn sofia_hash(password: &str) -> String {
    let digest = md5::compute(password.as_bytes());
    digest
        .0
        .chunks_exact(2)
        .map(|pair| {
            let sum = pair[0] as usize + pair[1] as usize;
            ALPHABET[sum % ALPHABET.len()] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_empty_password() {
        assert_eq!(sofia_hash(""), "tlJwpbo6");
    }

    #[test]
    fn test_golden_fixture_passwords() {
        assert_eq!(sofia_hash("admin"), "6QNMIQGe");
        assert_eq!(sofia_hash("123456"), "nTBCS19C");
        assert_eq!(sofia_hash("password"), "mF95aD4o");
    }

    #[test]
    fn test_non_ascii_password_is_hashed_as_utf8() {
        assert_eq!(sofia_hash("Zażółć"), "RVtkcBbn");
    }

    #[test]
    fn test_output_shape_and_determinism() {
        for password in ["", "a", "admin", "correct horse battery staple", "ü"] {
            let first = sofia_hash(password);
            assert_eq!(first, sofia_hash(password));
            assert_eq!(first.len(), SOFIA_HASH_LEN);
            assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}

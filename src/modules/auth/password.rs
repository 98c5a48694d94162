use pbkdf2::pbkdf2;
use rand::Rng;

use crate::HmacSha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Default PBKDF2 work factor for stored passwords
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// One-way password encoder using PBKDF2-HMAC-SHA256 with a per-password salt.
///
/// Encoded form: `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`. The
/// iteration count travels with the hash so it can be raised later without
/// invalidating existing passwords.
#[derive(Debug, Clone)]
pub struct PasswordEncoder {
    iterations: u32,
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordEncoder {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` with a fresh random salt
    pub fn encode(&self, password: &str) -> String {
        let salt = generate_salt();
        let key = derive(password, &salt, self.iterations);

        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(salt),
            hex::encode(key)
        )
    }

    /// Check `password` against a hash produced by [`encode`](Self::encode).
    /// Anything that does not parse is treated as a mismatch.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.split('$');

        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        if scheme != SCHEME {
            return false;
        }

        let (Ok(iterations), Ok(salt), Ok(expected)) = (
            iterations.parse::<u32>(),
            hex::decode(salt),
            hex::decode(expected),
        ) else {
            return false;
        };

        if iterations == 0 || expected.len() != KEY_LEN {
            return false;
        }

        let actual = derive(password, &salt, iterations);
        constant_time_eq(&actual, &expected)
    }
}

fn generate_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN).map(|_| rng.gen()).collect()
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

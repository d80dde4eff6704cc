//! Credential hashing
//!
//! Stored format is `hex(salt) || hex(hash)`: a 16-byte random salt followed
//! by a raw Argon2id digest.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 1;
pub const DEFAULT_HASH_LEN: u32 = 32;
pub const SALT_LEN: usize = 16;

/// Argon2id parameters for credential hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
    pub hash_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

impl Argon2Params {
    fn derive(&self, secret: &str, salt: &[u8], hash_len: usize) -> Result<Vec<u8>> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(hash_len))
            .map_err(|e| Error::Config(format!("Invalid argon2 params: {:?}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = vec![0u8; hash_len];
        argon2
            .hash_password_into(secret.as_bytes(), salt, &mut out)
            .map_err(|e| Error::validation(format!("Failed to hash credential: {:?}", e)))?;
        Ok(out)
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = self.derive(secret, &salt, self.hash_len as usize)?;
        Ok(format!("{}{}", hex::encode(salt), hex::encode(hash)))
    }

    /// Check a secret against stored material
    ///
    /// Malformed material never verifies.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        let stored = stored.trim();
        let salt_hex_len = SALT_LEN * 2;
        if stored.len() <= salt_hex_len || !stored.is_char_boundary(salt_hex_len) {
            return false;
        }

        let (salt_hex, hash_hex) = stored.split_at(salt_hex_len);
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
            return false;
        };

        match self.derive(secret, &salt, expected.len()) {
            Ok(computed) => constant_time_eq(&computed, &expected),
            Err(_) => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

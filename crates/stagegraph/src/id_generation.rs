//! Hash-based stage ID generation.
//!
//! IDs have the form `{prefix}-{hash}` where the hash is base36-encoded
//! SHA256 of the stage's item, name, a timestamp and a retry nonce. The hash
//! length grows with the number of stored stages (4 to 6 characters) so IDs
//! stay short for small projects while collisions stay rare for large ones.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_HASH_LENGTH: usize = 6;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Every nonce at the maximum length collided
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried
        attempts: u32,
    },
}

/// Stage ID generator with collision detection.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    existing_ids: HashSet<String>,
}

impl IdGenerator {
    /// Create a generator for the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            existing_ids: HashSet::new(),
        }
    }

    /// Register an existing ID to prevent collisions
    pub fn register_id(&mut self, id: impl Into<String>) {
        self.existing_ids.insert(id.into());
    }

    /// Number of known IDs
    pub fn known_ids(&self) -> usize {
        self.existing_ids.len()
    }

    /// Generate a new unique ID for a stage of `item_id` named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if every nonce collides even at the maximum length.
    pub fn generate(&mut self, item_id: &str, name: &str) -> Result<String, IdGenerationError> {
        let mut length = adaptive_length(self.existing_ids.len());

        loop {
            for nonce in 0..MAX_NONCE {
                let id = self.hash_id(item_id, name, nonce, length);
                if self.existing_ids.insert(id.clone()) {
                    if nonce > 0 {
                        debug!(nonce, length, "Generated unique ID after collision retries");
                    }
                    return Ok(id);
                }
            }

            if length >= MAX_HASH_LENGTH {
                return Err(IdGenerationError::CollisionExhausted {
                    attempts: MAX_NONCE,
                });
            }
            warn!(length, "All nonces exhausted, increasing ID length");
            length += 1;
        }
    }

    fn hash_id(&self, item_id: &str, name: &str, nonce: u32, length: usize) -> String {
        let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let content = format!("{}|{}|{}|{}", item_id, name, timestamp, nonce);

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        format!("{}-{}", self.prefix, encode_base36(&hash_bytes[..8], length))
    }
}

/// Hash length for the current number of stages.
///
/// - 0-500 stages: 4 chars
/// - 501-1,500: 5 chars
/// - 1,501+: 6 chars
fn adaptive_length(stage_count: usize) -> usize {
    match stage_count {
        0..=500 => 4,
        501..=1500 => 5,
        _ => MAX_HASH_LENGTH,
    }
}

/// Encode the first bytes of a hash as a fixed-length base36 string.
fn encode_base36(bytes: &[u8], length: usize) -> String {
    let mut n: u64 = 0;
    for &byte in bytes {
        n = n.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut result = Vec::with_capacity(length);
    while result.len() < length {
        result.push(char::from(BASE36_CHARS[(n % 36) as usize]));
        n /= 36;
    }
    result.iter().rev().collect()
}

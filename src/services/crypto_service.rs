use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use zeroize::Zeroize;

use crate::types::errors::CryptoError;

/// Default PBKDF2 iteration count for key derivation and PIN hashing.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Largest iteration count accepted from a stored hash or backup header.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Separates the iteration count from the salt and hash in a stored PIN.
const PIN_ITERATIONS_SEPARATOR: char = '$';

/// Salt length in bytes for PBKDF2.
pub const SALT_LENGTH: usize = 16;

/// AES-256-GCM key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce/IV length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

/// Length in bytes of a PIN hash (PBKDF2-HMAC-SHA512 output).
const PIN_HASH_LENGTH: usize = 64;

/// Ciphertext, IV and authentication tag of one AES-256-GCM message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

/// Trait defining the cryptographic operations of the tracker.
pub trait CryptoServiceTrait {
    /// Derives an encryption key from a passphrase and salt using PBKDF2
    /// with the configured iteration count.
    fn derive_key(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Derives an encryption key with an explicit iteration count, as recorded
    /// alongside data encrypted earlier.
    fn derive_key_with_iterations(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Encrypts plaintext using AES-256-GCM, returning ciphertext, IV, and auth tag.
    fn encrypt_aes256gcm(&self, plaintext: &[u8], key: &[u8])
        -> Result<EncryptedData, CryptoError>;

    /// Decrypts data encrypted with AES-256-GCM.
    fn decrypt_aes256gcm(&self, encrypted: &EncryptedData, key: &[u8])
        -> Result<Vec<u8>, CryptoError>;

    /// Hashes a PIN with a fresh random salt.
    ///
    /// The result is `<iterations>$hex(salt) ‖ hex(hash)`: the decimal
    /// iteration count, then 32 hex characters of salt followed by 128 hex
    /// characters of PBKDF2-HMAC-SHA512 output.
    fn hash_pin(&self, pin: &str) -> Result<String, CryptoError>;

    /// Checks `pin` against a value produced by [`CryptoServiceTrait::hash_pin`],
    /// using the iteration count stored with it. Values without a count are
    /// checked with the configured count. Malformed stored values never verify.
    fn verify_pin(&self, pin: &str, stored: &str) -> bool;

    /// Generates a cryptographically secure random salt.
    fn generate_salt(&self) -> Result<Vec<u8>, CryptoError>;

    /// Generates cryptographically secure random bytes of the specified length.
    fn generate_random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError>;
}

/// A nonce sequence that uses a single nonce value.
/// Used for one-shot encryption/decryption operations.
struct SingleNonce {
    nonce: Option<[u8; NONCE_LENGTH]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_LENGTH]) -> Self {
        Self {
            nonce: Some(nonce_bytes),
        }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.nonce
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Implementation of cryptographic services using the `ring` crate.
#[derive(Clone)]
pub struct CryptoService {
    rng: SystemRandom,
    iterations: u32,
}

impl CryptoService {
    /// Creates a CryptoService with the default iteration count.
    pub fn new() -> Self {
        Self::with_iterations(DEFAULT_PBKDF2_ITERATIONS)
    }

    /// Creates a CryptoService with a custom PBKDF2 iteration count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            rng: SystemRandom::new(),
            iterations,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn iteration_count(&self) -> Result<NonZeroU32, CryptoError> {
        checked_iterations(self.iterations)
    }
}

fn checked_iterations(iterations: u32) -> Result<NonZeroU32, CryptoError> {
    if iterations > MAX_PBKDF2_ITERATIONS {
        return Err(CryptoError::KeyDerivation(format!(
            "Iteration count {} exceeds {}",
            iterations, MAX_PBKDF2_ITERATIONS
        )));
    }
    NonZeroU32::new(iterations)
        .ok_or_else(|| CryptoError::KeyDerivation("Invalid iteration count".to_string()))
}

/// Splits a stored PIN into its iteration count (if recorded) and `salt ‖ hash` hex.
fn split_stored_pin(stored: &str) -> Option<(Option<u32>, &str)> {
    match stored.split_once(PIN_ITERATIONS_SEPARATOR) {
        Some((count, rest)) => count.parse().ok().map(|n| (Some(n), rest)),
        None => Some((None, stored)),
    }
}

impl Default for CryptoService {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoServiceTrait for CryptoService {
    fn derive_key(&self, password: &str, salt: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.derive_key_with_iterations(password, salt, self.iterations)
    }

    fn derive_key_with_iterations(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Vec<u8>, CryptoError> {
        let iterations = checked_iterations(iterations)?;

        let mut key = vec![0u8; KEY_LENGTH];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            password.as_bytes(),
            &mut key,
        );

        Ok(key)
    }

    fn encrypt_aes256gcm(
        &self,
        plaintext: &[u8],
        key: &[u8],
    ) -> Result<EncryptedData, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate nonce".to_string()))?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::Encryption("Failed to create encryption key".to_string()))?;

        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Encryption("Encryption operation failed".to_string()))?;

        // ring appends the tag; the last TAG_LENGTH bytes are split off.
        let tag_start = in_out.len() - TAG_LENGTH;
        let auth_tag = in_out[tag_start..].to_vec();
        in_out.truncate(tag_start);

        Ok(EncryptedData {
            ciphertext: in_out,
            iv: nonce_bytes.to_vec(),
            auth_tag,
        })
    }

    fn decrypt_aes256gcm(
        &self,
        encrypted: &EncryptedData,
        key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }

        if encrypted.iv.len() != NONCE_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "IV must be {} bytes, got {}",
                NONCE_LENGTH,
                encrypted.iv.len()
            )));
        }

        if encrypted.auth_tag.len() != TAG_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "Auth tag must be {} bytes, got {}",
                TAG_LENGTH,
                encrypted.auth_tag.len()
            )));
        }

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        nonce_bytes.copy_from_slice(&encrypted.iv);

        let unbound_key = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| CryptoError::Decryption("Failed to create decryption key".to_string()))?;

        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut in_out = Vec::with_capacity(encrypted.ciphertext.len() + encrypted.auth_tag.len());
        in_out.extend_from_slice(&encrypted.ciphertext);
        in_out.extend_from_slice(&encrypted.auth_tag);

        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut in_out)
            .map_err(|_| {
                CryptoError::Decryption(
                    "Decryption failed: invalid key or corrupted data".to_string(),
                )
            })?;

        Ok(plaintext.to_vec())
    }

    fn hash_pin(&self, pin: &str) -> Result<String, CryptoError> {
        let iterations = self.iteration_count()?;
        let salt = self.generate_salt()?;

        let mut hash = [0u8; PIN_HASH_LENGTH];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA512,
            iterations,
            &salt,
            pin.as_bytes(),
            &mut hash,
        );

        let encoded = format!(
            "{}{}{}{}",
            iterations,
            PIN_ITERATIONS_SEPARATOR,
            hex::encode(&salt),
            hex::encode(hash)
        );
        hash.zeroize();
        Ok(encoded)
    }

    fn verify_pin(&self, pin: &str, stored: &str) -> bool {
        let Some((recorded, stored)) = split_stored_pin(stored) else {
            return false;
        };
        let Ok(iterations) = checked_iterations(recorded.unwrap_or(self.iterations)) else {
            return false;
        };
        if stored.len() != (SALT_LENGTH + PIN_HASH_LENGTH) * 2 || !stored.is_ascii() {
            return false;
        }
        let (salt_hex, hash_hex) = stored.split_at(SALT_LENGTH * 2);
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
            return false;
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA512,
            iterations,
            &salt,
            pin.as_bytes(),
            &expected,
        )
        .is_ok()
    }

    fn generate_salt(&self) -> Result<Vec<u8>, CryptoError> {
        self.generate_random_bytes(SALT_LENGTH)
    }

    fn generate_random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = vec![0u8; length];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| CryptoError::RandomGeneration("Failed to generate random bytes".to_string()))?;
        Ok(bytes)
    }
}

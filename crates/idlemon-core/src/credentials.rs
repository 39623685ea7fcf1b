// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Credential hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{Error, Result};

/// Hashes and verifies player credentials.
///
/// Implementations are CPU-bound; the service calls them on the blocking pool.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext credential into a self-describing string.
    fn hash(&self, password: &str) -> Result<String>;

    /// Whether `password` matches `hash`.
    ///
    /// A mismatch is `Ok(false)`; an unparseable hash is an error.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id with default parameters, producing PHC strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Credential(format!("failed to hash credential: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Credential(format!("invalid credential hash: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Password hashing and verification using Argon2id
use crate::error::{AuthError, AuthResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::warn;

/// Upper bound on the accepted Argon2 time cost (iterations)
pub const MAX_TIME_COST: u32 = 16;

/// Argon2id encoder with a configurable time cost
#[derive(Debug, Clone)]
pub struct PasswordEncoder {
    time_cost: u32,
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        Self {
            time_cost: Params::DEFAULT_T_COST,
        }
    }
}

impl PasswordEncoder {
    /// Out-of-range costs fall back to the Argon2 default
    pub fn new(time_cost: u32) -> Self {
        if !(Params::MIN_T_COST..=MAX_TIME_COST).contains(&time_cost) {
            warn!(
                provided = time_cost,
                using_default = Params::DEFAULT_T_COST,
                "Invalid Argon2 time cost"
            );
            return Self::default();
        }
        Self { time_cost }
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    fn hasher(&self) -> AuthResult<Argon2<'static>> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            self.time_cost,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `password` into a PHC string with a random 16-byte salt
    pub fn encode(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Constant-time check of `password` against a PHC string.
    ///
    /// The parameters embedded in `encoded` are used, so hashes produced with
    /// another time cost still verify.
    pub fn matches(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)
            .map_err(|e| AuthError::PasswordHash(format!("Invalid password hash format: {e}")))?;

        match self.hasher()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }
}

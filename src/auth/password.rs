// Password hashing with bcrypt

use bcrypt::{hash, verify, BcryptError};

pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    hash(password, cost)
}

/// Ok(false) for a wrong password; Err when the stored value is not a bcrypt hash
pub fn verify_password(password: &str, stored: &str) -> Result<bool, BcryptError> {
    verify(password, stored)
}

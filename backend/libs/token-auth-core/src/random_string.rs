use crate::error::{AuthError, AuthResult};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;

pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random string drawn uniformly from `characters` using the OS CSPRNG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomString {
    pub characters: String,
    pub length: usize,
}

impl RandomString {
    pub fn new(characters: impl Into<String>, length: usize) -> Self {
        Self {
            characters: characters.into(),
            length,
        }
    }

    pub fn alphanumeric(length: usize) -> Self {
        Self::new(ALPHANUMERIC, length)
    }

    pub fn generate(&self) -> AuthResult<String> {
        let alphabet: Vec<char> = self.characters.chars().collect();
        if alphabet.is_empty() {
            return Err(AuthError::Random("character set is empty".to_string()));
        }

        let index = Uniform::from(0..alphabet.len());
        Ok((0..self.length)
            .map(|_| alphabet[index.sample(&mut OsRng)])
            .collect())
    }
}

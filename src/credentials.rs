use std::env;

use crate::error::{Error, Result};

pub trait CredentialSource: Send + Sync {
    fn get(&self, key: &str) -> Result<String>;
}

/// Reads secrets from the process environment.
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, key: &str) -> Result<String> {
        match env::var(key) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) => Err(Error::Config(format!("{key} environment variable is empty"))),
            Err(_) => Err(Error::Config(format!("{key} environment variable is not set"))),
        }
    }
}

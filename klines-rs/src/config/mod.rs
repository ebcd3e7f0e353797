//! Configuration module
//!
//! Plain structs with defaults, loadable from environment variables.

pub mod fetch;
pub mod resample;
pub mod retry;

pub use fetch::*;
pub use resample::*;
pub use retry::*;

use crate::error::KlineError;
use crate::Result;
use std::fmt::Display;
use std::str::FromStr;

/// Non-empty environment variable
pub(crate) fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, using `default` when it is unset
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| KlineError::config(format!("{key}={raw}: {e}"))),
        None => Ok(default),
    }
}

//! Server configuration from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use iv_data::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};
use iv_types::{config_error, IvResult};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// How request data is divided into training and held-out rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitSettings {
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Largest accepted request body; datasets travel inline.
    pub max_body_bytes: usize,
    pub split: SplitSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            split: SplitSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Read `INVML_ADDR`, `INVML_MAX_BODY_BYTES`, `INVML_TEST_SIZE` and
    /// `INVML_SPLIT_SEED`, falling back to the defaults for unset variables.
    pub fn from_env() -> IvResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> IvResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("INVML_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| config_error!("INVML_ADDR '{}' is not a socket address: {}", addr, e))?;

        let max_body_bytes = parse_var(&lookup, "INVML_MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(config_error!("INVML_MAX_BODY_BYTES must be positive"));
        }

        let test_size = parse_var(&lookup, "INVML_TEST_SIZE")?.unwrap_or(DEFAULT_TEST_SIZE);
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(config_error!("INVML_TEST_SIZE must lie strictly between 0 and 1, got {}", test_size));
        }
        let seed = parse_var(&lookup, "INVML_SPLIT_SEED")?.unwrap_or(DEFAULT_SPLIT_SEED);

        Ok(Self {
            addr,
            max_body_bytes,
            split: SplitSettings { test_size, seed },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> IvResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| config_error!("{} '{}' is invalid: {}", key, raw, e)),
    }
}

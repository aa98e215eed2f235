use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ADDR, DEFAULT_CLEANUP_ATTEMPTS, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_OUTPUT_BYTES,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide settings, read once at startup from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub addr: SocketAddr,
    pub workspace_root: PathBuf,
    pub javac_path: PathBuf,
    pub java_path: PathBuf,
    pub max_concurrent: usize,
    pub compile_timeout: Option<Duration>,
    pub max_output_bytes: usize,
    pub cleanup_attempts: u32,
    pub use_stub: bool,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable source, so tests
    /// do not have to touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = match lookup("ENGINE_ADDR") {
            Some(value) => parse("ENGINE_ADDR", value)?,
            None => parse("ENGINE_ADDR", DEFAULT_ADDR.to_string())?,
        };
        let compile_timeout = parsed(&lookup, "ENGINE_COMPILE_TIMEOUT_MS")?
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis);
        let use_stub = lookup("ENGINE_USE_STUB")
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(EngineConfig {
            addr,
            workspace_root: lookup("ENGINE_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("submission-engine")),
            javac_path: lookup("JAVAC_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| "javac".into()),
            java_path: lookup("JAVA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| "java".into()),
            max_concurrent: parsed(&lookup, "ENGINE_MAX_CONCURRENT")?.unwrap_or(DEFAULT_MAX_CONCURRENT),
            compile_timeout,
            max_output_bytes: parsed(&lookup, "ENGINE_MAX_OUTPUT_BYTES")?
                .unwrap_or(DEFAULT_MAX_OUTPUT_BYTES),
            cleanup_attempts: parsed(&lookup, "ENGINE_CLEANUP_ATTEMPTS")?
                .unwrap_or(DEFAULT_CLEANUP_ATTEMPTS),
            use_stub,
        })
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map(|value| parse(key, value)).transpose()
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.addr, "[::1]:50051".parse().unwrap());
        assert_eq!(config.javac_path, PathBuf::from("javac"));
        assert_eq!(config.java_path, PathBuf::from("java"));
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.compile_timeout, None);
        assert_eq!(config.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(config.cleanup_attempts, DEFAULT_CLEANUP_ATTEMPTS);
        assert!(!config.use_stub);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ENGINE_ADDR", "127.0.0.1:6000"),
            ("ENGINE_WORKSPACE_ROOT", "/var/lib/engine"),
            ("JAVAC_PATH", "/opt/jdk/bin/javac"),
            ("ENGINE_MAX_CONCURRENT", "2"),
            ("ENGINE_COMPILE_TIMEOUT_MS", "15000"),
            ("ENGINE_USE_STUB", "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.workspace_root, PathBuf::from("/var/lib/engine"));
        assert_eq!(config.javac_path, PathBuf::from("/opt/jdk/bin/javac"));
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.compile_timeout, Some(Duration::from_secs(15)));
        assert!(config.use_stub);
    }

    #[test]
    fn test_zero_compile_timeout_means_unbounded() {
        let config = config(&[("ENGINE_COMPILE_TIMEOUT_MS", "0")]).unwrap();
        assert_eq!(config.compile_timeout, None);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config(&[("ENGINE_MAX_CONCURRENT", "many")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: "ENGINE_MAX_CONCURRENT", .. }
        ));
    }
}

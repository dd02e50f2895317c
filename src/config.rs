//! Runtime configuration read from `CARDIOGRADE_*` environment variables.

use std::path::PathBuf;

use crate::adapters::artifacts::{verifying_key_from_b64, ArtifactPolicy};
use crate::domain::ArtifactError;

pub const ARTIFACT_DIR_ENV: &str = "CARDIOGRADE_ARTIFACT_DIR";
pub const MODEL_PATH_ENV: &str = "CARDIOGRADE_MODEL_PATH";
pub const ALLOW_UNSIGNED_ENV: &str = "CARDIOGRADE_ALLOW_UNSIGNED_ARTIFACTS";
pub const PUBKEY_B64_ENV: &str = "CARDIOGRADE_ARTIFACT_PUBKEY_B64";
pub const PUBKEY_B64_FILE_ENV: &str = "CARDIOGRADE_ARTIFACT_PUBKEY_B64_FILE";
pub const LOG_MODE_ENV: &str = "CARDIOGRADE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CARDIOGRADE_LOG_FILE";

const DEFAULT_ARTIFACT_DIR: &str = "data/processed";
const DEFAULT_MODEL_PATH: &str = "models/severity_model.json";
const DEFAULT_LOG_FILE: &str = "cardiograde.log";

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
}

/// Source of the artifact-signing public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub artifact_dir: PathBuf,
    pub model_path: PathBuf,
    pub allow_unsigned_artifacts: bool,
    pub public_key: Option<PublicKeySource>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let artifact_dir = non_empty(ARTIFACT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR));
        let model_path = non_empty(MODEL_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let allow_unsigned_artifacts = non_empty(ALLOW_UNSIGNED_ENV)
            .map(|value| parse_bool(&value))
            .unwrap_or(cfg!(debug_assertions));

        let public_key = non_empty(PUBKEY_B64_ENV)
            .map(PublicKeySource::Inline)
            .or_else(|| non_empty(PUBKEY_B64_FILE_ENV).map(|p| PublicKeySource::File(p.into())));

        let log_mode = match non_empty(LOG_MODE_ENV)
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            Some("file") => LogMode::File,
            _ => LogMode::Stderr,
        };
        let log_file = non_empty(LOG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        Config {
            artifact_dir,
            model_path,
            allow_unsigned_artifacts,
            public_key,
            log_mode,
            log_file,
        }
    }

    /// Resolve the integrity policy used when loading artifacts.
    ///
    /// # Errors
    /// Returns `ArtifactError::Integrity` if the configured key cannot be read
    /// or decoded.
    pub fn artifact_policy(&self) -> Result<ArtifactPolicy, ArtifactError> {
        let verifying_key = match &self.public_key {
            None => None,
            Some(PublicKeySource::Inline(b64)) => Some(verifying_key_from_b64(b64)?),
            Some(PublicKeySource::File(path)) => {
                let b64 = std::fs::read_to_string(path).map_err(|e| {
                    ArtifactError::Integrity(format!("Failed reading pubkey file: {e}"))
                })?;
                Some(verifying_key_from_b64(&b64)?)
            }
        };

        Ok(ArtifactPolicy {
            allow_unsigned: self.allow_unsigned_artifacts,
            verifying_key,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

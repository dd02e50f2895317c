//! Artifact loader: Reads the fitted preprocessing artifacts from disk.
//!
//! A directory holds three JSON files:
//! - `scaler.json`: `{ "mean": [...], "scale": [...], "feature_names": [...] }`
//! - `encodings.json`: `{ "<field>": { "<value>": code, ... }, ... }`
//! - `feature_names.json`: `["age", "trestbps", ...]`
//!
//! # Security
//!
//! The directory may carry a signed manifest (`manifest.json`) and an Ed25519
//! signature over it (`artifacts.sig`). When they are present the signature
//! is checked against the configured public key and every artifact's SHA-256
//! must match the manifest. When they are absent, loading only proceeds if
//! the policy allows unsigned artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{
    ArtifactError, Artifacts, EncodingTable, FeatureOrder, ScalerFile, ScalingParameters,
};

pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODINGS_FILE: &str = "encodings.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "artifacts.sig";

/// Files a manifest must bind.
pub const ARTIFACT_FILES: [&str; 3] = [SCALER_FILE, ENCODINGS_FILE, FEATURE_NAMES_FILE];

pub const MANIFEST_VERSION: u32 = 1;

/// Clock skew tolerated on `created_at`.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

const NONCE_LEN: usize = 16;

/// Signed description of an artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// Random nonce (base64, 16 bytes)
    pub nonce_b64: String,
    /// File name to lowercase SHA-256 hex
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash the artifact files in `dir` into a fresh manifest.
    ///
    /// # Errors
    /// Returns `ArtifactError::MissingArtifact` or `ArtifactError::Read` if a
    /// file cannot be read.
    pub fn for_dir(dir: &Path) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in ARTIFACT_FILES {
            let bytes = read_bytes(&dir.join(name))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            nonce_b64: base64::engine::general_purpose::STANDARD.encode(nonce),
            files,
        })
    }
}

/// How strictly artifact integrity is enforced.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPolicy {
    /// Accept a directory without `manifest.json`/`artifacts.sig`
    pub allow_unsigned: bool,
    /// Key used to check `artifacts.sig`
    pub verifying_key: Option<VerifyingKey>,
}

/// Outcome of the integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    Verified,
    Unsigned,
}

/// Load and cross-check the three artifacts in `dir`.
///
/// # Errors
/// - `ArtifactError::MissingArtifact` if any file is absent
/// - `ArtifactError::Integrity` if the signed manifest does not verify, or the
///   directory is unsigned and the policy refuses that
/// - `ArtifactError::Parse` / `ArtifactError::Inconsistent` for malformed or
///   disagreeing artifacts
pub fn load_artifacts(dir: &Path, policy: &ArtifactPolicy) -> Result<Artifacts, ArtifactError> {
    for name in ARTIFACT_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            return Err(ArtifactError::MissingArtifact(path));
        }
    }

    let status = verify_integrity(dir, policy)?;

    let scaler: ScalerFile = read_json(&dir.join(SCALER_FILE))?;
    let encodings: BTreeMap<String, BTreeMap<String, u32>> =
        read_json(&dir.join(ENCODINGS_FILE))?;
    let names: Vec<String> = read_json(&dir.join(FEATURE_NAMES_FILE))?;

    let artifacts = Artifacts::new(
        ScalingParameters::from_file(scaler)?,
        EncodingTable::from_map(encodings)?,
        FeatureOrder::from_names(&names)?,
    )?;

    tracing::info!(
        "Loaded preprocessing artifacts from {} ({:?})",
        dir.display(),
        status
    );
    Ok(artifacts)
}

/// Check `manifest.json` and `artifacts.sig` in `dir` against `policy`.
///
/// # Errors
/// Returns `ArtifactError::Integrity` on any verification failure.
pub fn verify_integrity(
    dir: &Path,
    policy: &ArtifactPolicy,
) -> Result<IntegrityStatus, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    match (manifest_path.exists(), sig_path.exists()) {
        (false, false) => {
            if policy.allow_unsigned {
                tracing::warn!(
                    "Loading UNSIGNED artifacts from {} (unsigned artifacts allowed by configuration)",
                    dir.display()
                );
                return Ok(IntegrityStatus::Unsigned);
            }
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} and {SIGNATURE_FILE} are required"
            )));
        }
        (true, false) => {
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} present without {SIGNATURE_FILE}"
            )));
        }
        (false, true) => {
            return Err(ArtifactError::Integrity(format!(
                "{SIGNATURE_FILE} present without {MANIFEST_FILE}"
            )));
        }
        (true, true) => {}
    }

    let public_key = policy.verifying_key.as_ref().ok_or_else(|| {
        ArtifactError::Integrity("signed artifacts found but no public key configured".into())
    })?;

    let sig_bytes = read_bytes(&sig_path)?;
    let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity("Invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig_bytes);

    let manifest_content = read_bytes(&manifest_path)?;
    public_key
        .verify(&manifest_content, &signature)
        .map_err(|_| ArtifactError::Integrity("Invalid artifact signature".into()))?;

    let manifest: ArtifactManifest = serde_json::from_slice(&manifest_content).map_err(|e| {
        ArtifactError::Integrity(format!("Invalid {MANIFEST_FILE} format: {e}"))
    })?;
    check_manifest(&manifest, chrono::Utc::now().timestamp())?;

    for name in ARTIFACT_FILES {
        let expected_hex = manifest.files.get(name).ok_or_else(|| {
            ArtifactError::Integrity(format!("{MANIFEST_FILE} does not bind {name}"))
        })?;
        let actual_hex = sha256_hex(&read_bytes(&dir.join(name))?);
        if !constant_time_eq_str(&actual_hex, expected_hex) {
            return Err(ArtifactError::Integrity(format!(
                "File hash mismatch for {name}"
            )));
        }
    }

    for extra in manifest
        .files
        .keys()
        .filter(|k| !ARTIFACT_FILES.contains(&k.as_str()))
    {
        tracing::warn!("{MANIFEST_FILE} binds unexpected file {extra}; ignoring");
    }

    tracing::info!("Artifact signature and hashes verified successfully");
    Ok(IntegrityStatus::Verified)
}

fn check_manifest(manifest: &ArtifactManifest, now: i64) -> Result<(), ArtifactError> {
    if manifest.version != MANIFEST_VERSION {
        return Err(ArtifactError::Integrity(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    if manifest.created_at > now + MAX_FUTURE_SKEW_SECS {
        return Err(ArtifactError::Integrity(
            "manifest created_at is in the future".into(),
        ));
    }
    let nonce = base64::engine::general_purpose::STANDARD
        .decode(manifest.nonce_b64.trim())
        .map_err(|e| ArtifactError::Integrity(format!("Invalid nonce base64: {e}")))?;
    if nonce.len() != NONCE_LEN {
        return Err(ArtifactError::Integrity(
            "nonce must decode to exactly 16 bytes".into(),
        ));
    }
    Ok(())
}

/// Write `manifest.json` and `artifacts.sig` for the artifacts in `dir`.
///
/// # Errors
/// Returns `ArtifactError::Read` if an artifact cannot be read, or
/// `ArtifactError::Write` if the manifest or signature cannot be written.
pub fn sign_artifacts(
    dir: &Path,
    signing_key: &SigningKey,
) -> Result<ArtifactManifest, ArtifactError> {
    let manifest = ArtifactManifest::for_dir(dir)?;
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).map_err(|source| ArtifactError::Parse {
            path: manifest_path.clone(),
            source,
        })?;

    write_bytes(&manifest_path, &manifest_bytes)?;
    let signature: Signature = signing_key.sign(&manifest_bytes);
    write_bytes(&dir.join(SIGNATURE_FILE), &signature.to_bytes())?;

    Ok(manifest)
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ArtifactError::Integrity` for bad base64, wrong length, or an
/// invalid curve point.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Integrity("Invalid public key base64".into()))?;
    let pubkey: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&pubkey)
        .map_err(|_| ArtifactError::Integrity("Invalid verifying key".into()))
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::MissingArtifact(path.to_path_buf())
        } else {
            ArtifactError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    fs::write(path, bytes).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Feature;
    use tempfile::tempdir;

    fn write_artifacts(dir: &Path) {
        let names: Vec<&str> = Feature::ALL.iter().map(Feature::name).collect();
        let scaler = ScalerFile {
            mean: vec![0.0; 13],
            scale: vec![1.0; 13],
            feature_names: Some(names.iter().map(|n| (*n).to_string()).collect()),
        };
        fs::write(
            dir.join(SCALER_FILE),
            serde_json::to_vec(&scaler).expect("serialize scaler"),
        )
        .expect("write scaler");
        fs::write(
            dir.join(ENCODINGS_FILE),
            serde_json::to_vec(&EncodingTable::label_encoded().to_map())
                .expect("serialize encodings"),
        )
        .expect("write encodings");
        fs::write(
            dir.join(FEATURE_NAMES_FILE),
            serde_json::to_vec(&names).expect("serialize names"),
        )
        .expect("write names");
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn policy_for(key: &SigningKey) -> ArtifactPolicy {
        ArtifactPolicy {
            allow_unsigned: false,
            verifying_key: Some(key.verifying_key()),
        }
    }

    #[test]
    fn test_signed_round_trip() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let key = signing_key();
        sign_artifacts(temp.path(), &key).expect("sign");

        let status = verify_integrity(temp.path(), &policy_for(&key)).expect("verify");
        assert_eq!(status, IntegrityStatus::Verified);
        load_artifacts(temp.path(), &policy_for(&key)).expect("load");
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let key = signing_key();
        sign_artifacts(temp.path(), &key).expect("sign");

        let mut map = EncodingTable::label_encoded().to_map();
        if let Some(sex) = map.get_mut("sex") {
            sex.insert("Female".into(), 1);
            sex.insert("Male".into(), 0);
        }
        fs::write(
            temp.path().join(ENCODINGS_FILE),
            serde_json::to_vec(&map).expect("serialize"),
        )
        .expect("overwrite");

        let err = load_artifacts(temp.path(), &policy_for(&key)).expect_err("must fail");
        assert!(err.to_string().contains("File hash mismatch for encodings.json"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        sign_artifacts(temp.path(), &signing_key()).expect("sign");

        let err = verify_integrity(temp.path(), &policy_for(&signing_key()))
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_unsigned_policy() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let strict = ArtifactPolicy::default();
        assert!(matches!(
            load_artifacts(temp.path(), &strict),
            Err(ArtifactError::Integrity(_))
        ));

        let lenient = ArtifactPolicy {
            allow_unsigned: true,
            verifying_key: None,
        };
        assert_eq!(
            verify_integrity(temp.path(), &lenient).expect("unsigned allowed"),
            IntegrityStatus::Unsigned
        );
        load_artifacts(temp.path(), &lenient).expect("load");
    }

    #[test]
    fn test_missing_artifact() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        fs::remove_file(temp.path().join(FEATURE_NAMES_FILE)).expect("remove");

        let lenient = ArtifactPolicy {
            allow_unsigned: true,
            verifying_key: None,
        };
        match load_artifacts(temp.path(), &lenient) {
            Err(ArtifactError::MissingArtifact(path)) => {
                assert!(path.ends_with(FEATURE_NAMES_FILE));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_manifest_checks() {
        let now = 1_700_000_000;
        let nonce = base64::engine::general_purpose::STANDARD.encode([7u8; 16]);
        let manifest = ArtifactManifest {
            version: MANIFEST_VERSION,
            created_at: now,
            nonce_b64: nonce.clone(),
            files: BTreeMap::new(),
        };
        assert!(check_manifest(&manifest, now).is_ok());

        let future = ArtifactManifest {
            created_at: now + MAX_FUTURE_SKEW_SECS + 1,
            ..manifest.clone()
        };
        assert!(check_manifest(&future, now).is_err());

        let short_nonce = ArtifactManifest {
            nonce_b64: base64::engine::general_purpose::STANDARD.encode([7u8; 8]),
            ..manifest.clone()
        };
        assert!(check_manifest(&short_nonce, now).is_err());

        let v2 = ArtifactManifest {
            version: 2,
            ..manifest
        };
        assert!(check_manifest(&v2, now).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq_str("abc", "abc"));
        assert!(!constant_time_eq_str("abc", "abd"));
        assert!(!constant_time_eq_str("abc", "ab"));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().as_bytes());
        assert_eq!(
            verifying_key_from_b64(&format!("{b64}\n")).expect("decode"),
            key.verifying_key()
        );
        assert!(verifying_key_from_b64("AAAA").is_err());
    }

    #[test]
    fn test_sign_reports_write_failure() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        // A directory where the signature file should go.
        fs::create_dir(temp.path().join(SIGNATURE_FILE)).expect("mkdir");

        let err = sign_artifacts(temp.path(), &signing_key()).expect_err("unwritable");
        match &err {
            ArtifactError::Write { path, .. } => {
                assert_eq!(path, &temp.path().join(SIGNATURE_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Failed to write"));
    }
}

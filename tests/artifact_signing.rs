//! Signed-manifest workflow over a copy of the shipped artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::RngCore;
use tempfile::tempdir;

use cardiograde::adapters::artifacts::{
    sign_artifacts, verify_integrity, IntegrityStatus, ARTIFACT_FILES, MANIFEST_FILE,
    SCALER_FILE, SIGNATURE_FILE,
};
use cardiograde::adapters::{load_artifacts, ArtifactPolicy};
use cardiograde::config::{Config, PublicKeySource};
use cardiograde::domain::ArtifactError;

fn copy_shipped(dest: &Path) {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/processed");
    for name in ARTIFACT_FILES {
        fs::copy(src.join(name), dest.join(name)).expect("copy artifact");
    }
}

fn signing_key() -> SigningKey {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut seed);
    SigningKey::from_bytes(&seed)
}

fn strict(key: &SigningKey) -> ArtifactPolicy {
    ArtifactPolicy {
        allow_unsigned: false,
        verifying_key: Some(key.verifying_key()),
    }
}

#[test]
fn test_signed_artifacts_load_under_strict_policy() {
    let temp = tempdir().expect("tempdir");
    copy_shipped(temp.path());
    let key = signing_key();

    let manifest = sign_artifacts(temp.path(), &key).expect("sign");
    assert_eq!(manifest.files.len(), 3);
    assert!(temp.path().join(MANIFEST_FILE).is_file());
    assert_eq!(
        fs::read(temp.path().join(SIGNATURE_FILE)).expect("sig").len(),
        64
    );

    assert_eq!(
        verify_integrity(temp.path(), &strict(&key)).expect("verify"),
        IntegrityStatus::Verified
    );
    let artifacts = load_artifacts(temp.path(), &strict(&key)).expect("load");
    assert_eq!(artifacts.order.names()[0], "age");
}

#[test]
fn test_modified_scaler_is_rejected() {
    let temp = tempdir().expect("tempdir");
    copy_shipped(temp.path());
    let key = signing_key();
    sign_artifacts(temp.path(), &key).expect("sign");

    let path = temp.path().join(SCALER_FILE);
    let tampered = fs::read_to_string(&path)
        .expect("read scaler")
        .replacen("53.51", "43.51", 1);
    fs::write(&path, tampered).expect("write scaler");

    match load_artifacts(temp.path(), &strict(&key)) {
        Err(ArtifactError::Integrity(msg)) => assert!(msg.contains(SCALER_FILE)),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_signature_without_manifest_is_rejected() {
    let temp = tempdir().expect("tempdir");
    copy_shipped(temp.path());
    let key = signing_key();
    sign_artifacts(temp.path(), &key).expect("sign");
    fs::remove_file(temp.path().join(MANIFEST_FILE)).expect("remove manifest");

    let lenient = ArtifactPolicy {
        allow_unsigned: true,
        verifying_key: Some(key.verifying_key()),
    };
    assert!(matches!(
        load_artifacts(temp.path(), &lenient),
        Err(ArtifactError::Integrity(_))
    ));
}

#[test]
fn test_public_key_from_file_config() {
    let temp = tempdir().expect("tempdir");
    copy_shipped(temp.path());
    let key = signing_key();
    sign_artifacts(temp.path(), &key).expect("sign");

    let key_path = temp.path().join("artifact_pubkey.b64");
    let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().as_bytes());
    fs::write(&key_path, format!("{b64}\n")).expect("write key");

    let config = Config {
        artifact_dir: temp.path().to_path_buf(),
        allow_unsigned_artifacts: false,
        public_key: Some(PublicKeySource::File(key_path)),
        ..Config::default()
    };
    let policy = config.artifact_policy().expect("policy");
    load_artifacts(&config.artifact_dir, &policy).expect("load with configured key");
}

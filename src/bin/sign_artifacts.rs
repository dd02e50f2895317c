//! Artifact signing utility.
//!
//! Writes `manifest.json` (SHA-256 of scaler, encodings and feature names,
//! creation time, random nonce) and `artifacts.sig` (Ed25519 over the
//! manifest bytes) into an artifact directory.
//!
//! # Usage
//!
//! ```bash
//! sign_artifacts <artifact_dir>
//! ```
//!
//! The base64 signing seed is read from, in order:
//! `CARDIOGRADE_SIGNING_KEY_B64_FD`, `CARDIOGRADE_SIGNING_KEY_B64_FILE`,
//! `/run/secrets/cardiograde_signing_key_b64`, and (debug builds only)
//! `CARDIOGRADE_SIGNING_KEY_B64`.

use std::env;
use std::fs;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiograde::adapters::artifacts::{sign_artifacts, MANIFEST_FILE, SIGNATURE_FILE};

const KEY_FD_ENV: &str = "CARDIOGRADE_SIGNING_KEY_B64_FD";
const KEY_FILE_ENV: &str = "CARDIOGRADE_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "CARDIOGRADE_SIGNING_KEY_B64";
const DOCKER_SECRET_PATH: &str = "/run/secrets/cardiograde_signing_key_b64";

const USAGE: &str = "Usage: sign_artifacts <artifact_dir>";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn non_empty_secret(content: &str) -> Result<Zeroizing<String>> {
    let secret = content.trim_end_matches(['\n', '\r']).to_string();
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    #[cfg(unix)]
    if let Ok(fd_str) = env::var(KEY_FD_ENV) {
        let fd: i32 = fd_str.trim().parse().context("Invalid key FD")?;
        if fd <= 2 {
            bail!("Refusing to read signing key from stdio FD");
        }
        // SAFETY: the FD is handed to this process for a one-time secret read.
        let mut file = unsafe { fs::File::from_raw_fd(fd) };
        let mut buf = Zeroizing::new(String::new());
        use std::io::Read;
        file.read_to_string(&mut buf)
            .context("Failed reading signing key from FD")?;
        return non_empty_secret(&buf);
    }

    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        return non_empty_secret(&content);
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        let content = Zeroizing::new(
            fs::read_to_string(DOCKER_SECRET_PATH).context("Failed reading docker secret")?,
        );
        return non_empty_secret(&content);
    }

    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV) {
            return non_empty_secret(&Zeroizing::new(v));
        }
    }

    Err(anyhow!(
        "Missing signing key. Provide one of: {KEY_FD_ENV}, {KEY_FILE_ENV}, or {DOCKER_SECRET_PATH} ({KEY_ENV} only in debug builds)."
    ))
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );
    let seed: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(seed))
}

fn parse_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let dir = match args.next().as_deref() {
        None | Some("-h") | Some("--help") => bail!("{USAGE}"),
        Some(dir) => PathBuf::from(dir),
    };
    if args.next().is_some() {
        bail!("{USAGE}");
    }
    Ok(dir)
}

fn main() -> Result<()> {
    let dir = parse_args()?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest = sign_artifacts(&dir, &signing_key)
        .with_context(|| format!("signing artifacts in {}", dir.display()))?;

    println!("Signed manifest: {}", dir.join(MANIFEST_FILE).display());
    println!("Wrote signature: {}", dir.join(SIGNATURE_FILE).display());
    for name in manifest.files.keys() {
        println!("  bound {name}");
    }
    println!(
        "CARDIOGRADE_ARTIFACT_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );

    Ok(())
}

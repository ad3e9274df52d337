/// On-disk identity key management.
///
/// The signing key lives as a single base64-encoded 32-byte seed in the
/// data directory, readable only by the owner.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use data_encoding::BASE64;
use tracing::info;

use damnet_common::protocol;
use damnet_core::KeyPair;

/// Generate a fresh identity and persist its seed under `data_dir`.
/// Overwrites any previous identity.
pub fn generate(data_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    let keypair = KeyPair::generate();
    let path = data_dir.join(protocol::SEED_FILE);
    fs::write(&path, BASE64.encode(&keypair.seed_bytes()))
        .with_context(|| format!("writing key seed to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    info!("wrote new identity seed to {}", path.display());
    Ok(path)
}

/// Load the identity whose seed is stored at `path`
pub fn load(path: &Path) -> Result<KeyPair> {
    let encoded = fs::read_to_string(path)
        .with_context(|| format!("reading key seed from {}", path.display()))?;

    let seed = BASE64
        .decode(encoded.trim().as_bytes())
        .context("key seed is not valid base64")?;
    let seed: [u8; 32] = seed
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("key seed must decode to 32 bytes, got {}", seed.len()))?;

    Ok(KeyPair::from_seed(&seed))
}

//! File Handoff Store
//!
//! Implements `HandoffStore` as one JSON file per order in a directory.
//! The file holds the swap secret, so it is created owner-only on unix
//! and replaced atomically through a rename.

use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::domain::{OrderHash, SwapError, SwapHandoff};
use crate::ports::outbound::HandoffStore;

/// Directory-backed handoff store.
pub struct FileHandoffStore {
    dir: PathBuf,
}

impl FileHandoffStore {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SwapError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the artifact for an order.
    pub fn path_for(&self, order_hash: &OrderHash) -> PathBuf {
        self.dir
            .join(format!("handoff-{}.json", hex::encode(order_hash.0)))
    }
}

/// JSON encoding of a handoff. The buffer holds the secret and is wiped on drop.
fn encode(handoff: &SwapHandoff) -> Result<Zeroizing<Vec<u8>>, SwapError> {
    Ok(Zeroizing::new(serde_json::to_vec_pretty(handoff)?))
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    // A leftover file would keep its old permissions.
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => return Err(err),
        _ => {}
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[async_trait]
impl HandoffStore for FileHandoffStore {
    async fn save(&self, handoff: &SwapHandoff) -> Result<(), SwapError> {
        handoff.validate()?;
        let path = self.path_for(&handoff.order_hash);
        let tmp = path.with_extension("json.tmp");
        let bytes = encode(handoff)?;
        write_private(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;
        info!("[swap] Handoff for order {} written to {}", handoff.order_hash, path.display());
        Ok(())
    }

    async fn load(&self, order_hash: &OrderHash) -> Result<Option<SwapHandoff>, SwapError> {
        let path = self.path_for(order_hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let handoff: SwapHandoff = serde_json::from_slice(&bytes)?;
        if handoff.order_hash != *order_hash {
            return Err(SwapError::Persistence(format!(
                "{} holds order {}",
                path.display(),
                handoff.order_hash
            )));
        }
        handoff.validate()?;
        debug!("[swap] Loaded handoff for order {}", order_hash);
        Ok(Some(handoff))
    }

    async fn remove(&self, order_hash: &OrderHash) -> Result<(), SwapError> {
        match fs::remove_file(self.path_for(order_hash)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

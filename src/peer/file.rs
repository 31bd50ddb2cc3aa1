//! File-backed peer directory.
//!
//! The file is re-read on every cycle, so membership managed by an external
//! tool (config management, a sidecar) is picked up without a restart.
//!
//! ```toml
//! [[peers]]
//! name = "node-a"
//! addr = "10.0.0.1:7946"
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::PeerConfig;
use crate::peer::directory::{ensure_unique, without_self, DirectoryError, PeerDirectory};
use crate::peer::types::Peer;

#[derive(Debug, Deserialize)]
struct PeersFile {
    #[serde(default)]
    peers: Vec<PeerConfig>,
}

/// Directory that reads its peer set from a TOML file.
#[derive(Debug, Clone)]
pub struct FileDirectory {
    path: PathBuf,
    self_name: Option<String>,
}

impl FileDirectory {
    pub fn new(path: impl AsRef<Path>, self_name: Option<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            self_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PeerDirectory for FileDirectory {
    async fn peers(&self) -> Result<Vec<Peer>, DirectoryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DirectoryError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let file: PeersFile = toml::from_str(&content)
            .map_err(|e| DirectoryError::Invalid(format!("{}: {}", self.path.display(), e)))?;

        let peers: Vec<Peer> = file.peers.into_iter().map(Peer::from).collect();
        ensure_unique(&peers)?;

        Ok(without_self(peers, self.self_name.as_deref()))
    }
}

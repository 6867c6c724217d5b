//! Install receipt (`app-game-config.json`).
//!
//! The receipt is the durable marker the launcher uses to answer "is this
//! game installed" and "what version". The promoter writes it as the final
//! step of a run; the game manager side reads it back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Receipt file name inside the install root.
pub const RECEIPT_FILE: &str = "app-game-config.json";

/// Durable marker describing an installed game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Installed game version string; empty when unknown.
    #[serde(default)]
    pub version: String,

    /// Basename of the manifest URL the install was driven by.
    #[serde(rename = "indexFile", default)]
    pub index_file: String,

    /// Install-type tag (e.g. distribution channel).
    #[serde(rename = "InstallType", default)]
    pub install_type: String,
}

impl InstallReceipt {
    /// Path of the receipt file under `install_root`.
    pub fn path(install_root: &Path) -> PathBuf {
        install_root.join(RECEIPT_FILE)
    }

    /// Load the receipt from `install_root`.
    ///
    /// Returns `Ok(None)` when no receipt exists.
    pub fn load(install_root: &Path) -> io::Result<Option<Self>> {
        let path = Self::path(install_root);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let receipt = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(receipt))
    }

    /// Write the receipt into `install_root`, replacing any existing one.
    pub fn save(&self, install_root: &Path) -> io::Result<()> {
        let path = Self::path(install_root);
        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), version = %self.version, "wrote install receipt");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let receipt = InstallReceipt {
            version: "1.4.2".to_string(),
            index_file: "resource.json".to_string(),
            install_type: "steam".to_string(),
        };

        receipt.save(temp.path()).unwrap();
        let loaded = InstallReceipt::load(temp.path()).unwrap().unwrap();

        assert_eq!(loaded, receipt);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(InstallReceipt::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_wire_field_names() {
        let receipt = InstallReceipt {
            version: "2.0.0".to_string(),
            index_file: "resource.json".to_string(),
            install_type: "epic".to_string(),
        };
        let json = serde_json::to_string(&receipt).unwrap();

        assert!(json.contains("\"version\""));
        assert!(json.contains("\"indexFile\""));
        assert!(json.contains("\"InstallType\""));
    }

    #[test]
    fn test_load_tolerates_missing_fields() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(RECEIPT_FILE),
            br#"{"version": "1.0.0"}"#,
        )
        .unwrap();

        let loaded = InstallReceipt::load(temp.path()).unwrap().unwrap();
        assert_eq!(loaded.version, "1.0.0");
        assert!(loaded.index_file.is_empty());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use super::types::CoefficientSet;
use crate::logic::error::EnvResult;

/// Durable per-host coefficient storage
pub trait CoefficientStore {
    /// Stored coefficients, or `None` when missing, empty or unreadable
    fn load(&self, host: &str) -> Option<CoefficientSet>;

    fn save(&self, host: &str, set: &CoefficientSet) -> EnvResult<()>;
}

/// One `<host>.json` file per backend host
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, host: &str) -> PathBuf {
        self.dir.join(format!("{}.json", host))
    }
}

impl CoefficientStore for JsonFileStore {
    fn load(&self, host: &str) -> Option<CoefficientSet> {
        let path = self.path_for(host);
        match load_coefficients(&path) {
            Ok(set) if set.is_empty() => {
                log::info!("Coefficient cache {} is empty", path.display());
                None
            }
            Ok(set) => {
                log::info!("Loaded coefficients for {} ({} attacks, gamma = {})",
                    host, set.coeff.len(), set.gamma);
                Some(set)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No coefficient cache at {}", path.display());
                None
            }
            Err(e) => {
                log::warn!("Coefficient cache {} unreadable: {}. Treating as empty.", path.display(), e);
                None
            }
        }
    }

    fn save(&self, host: &str, set: &CoefficientSet) -> EnvResult<()> {
        let path = self.path_for(host);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(set)?;
        fs::write(&path, json)?;
        log::info!("Saved coefficients for {} to {}", host, path.display());
        Ok(())
    }
}

fn load_coefficients(path: &Path) -> std::io::Result<CoefficientSet> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

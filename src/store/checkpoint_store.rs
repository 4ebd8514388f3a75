use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use super::write_atomic;
use crate::config::DiscoveryConfig;
use crate::errors::PersistenceError;
use crate::models::{normalize_wallet, Checkpoint};

/// Durable discovery progress: a sorted wallet list file and a file holding
/// a single epoch-second watermark.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    seen_users_file: PathBuf,
    last_check_file: PathBuf,
    lookback: Duration,
}

impl CheckpointStore {
    pub fn new(seen_users_file: impl Into<PathBuf>, last_check_file: impl Into<PathBuf>, lookback: Duration) -> Self {
        Self {
            seen_users_file: seen_users_file.into(),
            last_check_file: last_check_file.into(),
            lookback,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(
            config.seen_users_file.clone(),
            config.last_check_file.clone(),
            config.scan_interval,
        )
    }

    /// Load the checkpoint. Never fails: absent or unreadable state falls
    /// back to an empty wallet set and a watermark one lookback before `now`.
    pub fn load(&self, now: i64) -> Checkpoint {
        let mut checkpoint = Checkpoint::fresh(now, self.lookback.as_secs() as i64);
        checkpoint.wallets = self.load_wallets();
        if let Some(ts) = self.load_timestamp() {
            checkpoint.last_timestamp = ts;
        }
        checkpoint
    }

    /// Rewrite both files. The wallet list is written first so a failed
    /// watermark write leaves the old window to be re-scanned.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut wallets = String::new();
        for wallet in &checkpoint.wallets {
            wallets.push_str(wallet);
            wallets.push('\n');
        }
        write_atomic(&self.seen_users_file, wallets.as_bytes())?;
        write_atomic(
            &self.last_check_file,
            checkpoint.last_timestamp.to_string().as_bytes(),
        )?;
        Ok(())
    }

    fn load_wallets(&self) -> BTreeSet<String> {
        match std::fs::read(&self.seen_users_file) {
            Ok(bytes) => String::from_utf8_lossy(&bytes)
                .lines()
                .map(normalize_wallet)
                .filter(|w| !w.is_empty())
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.seen_users_file.display(),
                    error = %e,
                    "could not read wallet list, starting from an empty set"
                );
                BTreeSet::new()
            }
        }
    }

    fn load_timestamp(&self) -> Option<i64> {
        let raw = match std::fs::read_to_string(&self.last_check_file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(
                    path = %self.last_check_file.display(),
                    error = %e,
                    "could not read watermark, using default lookback"
                );
                return None;
            }
        };
        match raw.trim().parse::<i64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                tracing::warn!(
                    path = %self.last_check_file.display(),
                    contents = raw.trim(),
                    "corrupt watermark, using default lookback"
                );
                None
            }
        }
    }
}

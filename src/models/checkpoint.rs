use std::collections::BTreeSet;

/// Lower-case, trimmed form used for every stored wallet address.
pub fn normalize_wallet(addr: &str) -> String {
    addr.trim().to_lowercase()
}

/// Ingestion progress: the watermark timestamp plus every wallet seen so far.
///
/// The timestamp never moves backwards and the wallet set only grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Epoch seconds of the last completed scan.
    pub last_timestamp: i64,
    pub wallets: BTreeSet<String>,
}

impl Checkpoint {
    /// First-run checkpoint: look back one poll interval, know no wallets.
    pub fn fresh(now: i64, lookback_secs: i64) -> Self {
        Self {
            last_timestamp: now - lookback_secs,
            wallets: BTreeSet::new(),
        }
    }

    /// Wallets in `candidates` that are not known yet.
    pub fn unseen<I>(&self, candidates: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = String>,
    {
        candidates
            .into_iter()
            .map(|w| normalize_wallet(&w))
            .filter(|w| !w.is_empty() && !self.wallets.contains(w))
            .collect()
    }

    /// Union `wallets` into the known set; returns how many were added.
    pub fn absorb(&mut self, wallets: &BTreeSet<String>) -> usize {
        let before = self.wallets.len();
        self.wallets.extend(wallets.iter().cloned());
        self.wallets.len() - before
    }

    pub fn advance_to(&mut self, ts: i64) {
        self.last_timestamp = self.last_timestamp.max(ts);
    }
}

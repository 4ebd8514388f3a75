use std::path::Path;

/// Read a newline-delimited wallet list, skipping blank lines and keeping
/// at most `limit` entries.
pub fn read_wallet_list(path: &Path, limit: Option<usize>) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    let wallets = contents
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .take(limit.unwrap_or(usize::MAX))
        .map(str::to_string)
        .collect();
    Ok(wallets)
}

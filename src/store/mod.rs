pub mod checkpoint_store;
pub mod grades_file;
pub mod wallet_list;

pub use checkpoint_store::CheckpointStore;
pub use grades_file::{render_grades, write_grades, GradeLayout};
pub use wallet_list::read_wallet_list;

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::errors::PersistenceError;

/// Replace `path` with `contents` all-or-nothing: the bytes go to a temp file
/// in the same directory which is then renamed over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fail = |e: std::io::Error| PersistenceError::new(path, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(contents).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}

//! Atomic output writes.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// What happened to an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// Existing content was already identical; the file was left alone.
    Unchanged,
}

/// Write `content` to `path` through a sibling temporary file and a rename,
/// so readers see either the old file or the complete new one.
///
/// Parent directories are created as needed. Identical content is not
/// rewritten.
pub fn write_atomic(path: &Path, content: &[u8]) -> RenderResult<WriteOutcome> {
    let existed = path.exists();
    if existed && fs::read(path).map(|current| current == content).unwrap_or(false) {
        debug!("Unchanged: {:?}", path);
        return Ok(WriteOutcome::Unchanged);
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let wrap = |source: std::io::Error| RenderError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(parent).map_err(wrap)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(wrap)?;
    tmp.write_all(content).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;

    // Temporaries are created 0600; manifests are meant to be readable.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tmp.as_file().metadata().map_err(wrap)?.permissions();
        perms.set_mode(0o644);
        tmp.as_file().set_permissions(perms).map_err(wrap)?;
    }

    tmp.persist(path).map_err(|e| wrap(e.error))?;
    debug!("Wrote: {:?}", path);

    Ok(if existed {
        WriteOutcome::Updated
    } else {
        WriteOutcome::Created
    })
}

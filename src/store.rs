//! File persistence shared by the snapshot, ledger and series store.

use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Reads a whole file. A missing file is `None`; any other failure is an error.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::persistence(path, e)),
    }
}

/// Replaces `path` with `contents`. Readers see either the old or the new document.
///
/// The replacement keeps the permissions of the file it replaces. New files are
/// created world-readable, since other tools read these documents.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| Error::persistence(dir, e))?;

    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == ErrorKind::NotFound => default_permissions(),
        Err(e) => return Err(Error::persistence(path, e)),
    };

    let write = || -> std::io::Result<()> {
        let mut temp = NamedTempFile::new_in(dir)?;
        if let Some(permissions) = permissions {
            temp.as_file().set_permissions(permissions)?;
        }
        temp.write_all(contents)?;
        temp.flush()?;
        temp.as_file_mut().sync_all()?;
        temp.into_temp_path().persist(path).map_err(|e| e.error)
    };
    write().map_err(|e| Error::persistence(path, e))
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_optional(&dir.path().join("nope.json")).unwrap(), None);
    }

    #[test]
    fn write_replaces_and_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history").join("trends.json");
        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"code\":{}}").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("{\"code\":{}}"));
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counts.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(mode(&path), 0o644);

        fs::set_permissions(&path, Permissions::from_mode(0o664)).unwrap();
        write_atomic(&path, b"{\"table\":1}").unwrap();
        assert_eq!(mode(&path), 0o664);
    }

    #[test]
    fn failed_replace_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("history.csv");
        fs::create_dir(&target).unwrap();

        let err = write_atomic(&target, b"date,section\n").unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }), "{err}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(target.is_dir());
    }

    #[test]
    fn unreadable_path_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let err = read_optional(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }), "{err}");
    }
}

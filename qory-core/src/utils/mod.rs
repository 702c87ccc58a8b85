//! Utility functions and helpers

use std::path::{Path, PathBuf};

/// Ensure a directory exists, creating it with owner-only access if necessary
pub fn ensure_private_dir<P: AsRef<Path>>(path: P) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    if path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists, but is not a directory", path.display()),
        ));
    }

    std::fs::create_dir_all(path)?;
    set_mode(path, 0o700)?;
    Ok(path.to_path_buf())
}

/// Restrict a path to the given unix mode. No-op elsewhere.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Write `contents` to `path`, creating the file with `mode` so it is never
/// readable by others, and restricting a pre-existing file to the same mode.
#[cfg(unix)]
pub fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    set_mode(path, mode)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
pub fn write_with_mode(path: &Path, contents: &[u8], _mode: u32) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Truncate a string to at most `max_chars` characters, appending "..." when cut
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w...");
    }

    #[test]
    fn test_ensure_private_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a").join("b");
        let created = ensure_private_dir(&dir).unwrap();
        assert!(created.is_dir());

        // Idempotent
        ensure_private_dir(&dir).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_write_with_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let fresh = temp_dir.path().join("fresh");
        write_with_mode(&fresh, b"secret", 0o600).unwrap();
        assert_eq!(std::fs::read(&fresh).unwrap(), b"secret");
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let shared = temp_dir.path().join("shared");
        std::fs::write(&shared, "old content that is longer").unwrap();
        set_mode(&shared, 0o644).unwrap();
        write_with_mode(&shared, b"new", 0o600).unwrap();
        assert_eq!(std::fs::read(&shared).unwrap(), b"new");
        let mode = std::fs::metadata(&shared).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_ensure_private_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_private_dir(&file).is_err());
    }
}

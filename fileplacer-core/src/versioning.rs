//! Collision-free destination naming
//!
//! `report.pdf` is tried first, then `report_v2.pdf`, `report_v3.pdf`, ...
//! until a free slot turns up. The scan is unbounded and the existence
//! check is not atomic with the later write.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Split a file name into base name and extension (dot included).
///
/// The extension starts at the last dot that is not part of the leading
/// run of dots, so `.env` has no extension and `archive.tar.gz` yields
/// `("archive.tar", ".gz")`.
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    let leading_dots = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name[leading_dots..].rfind('.') {
        Some(idx) => file_name.split_at(leading_dots + idx),
        None => (file_name, ""),
    }
}

/// `split_file_name` for names that may not be valid UTF-8.
///
/// Non-UTF-8 names keep their original bytes; they are split at the last
/// dot the way `Path::extension` does.
pub fn split_os_file_name(file_name: &OsStr) -> (OsString, OsString) {
    if let Some(name) = file_name.to_str() {
        let (base, extension) = split_file_name(name);
        return (base.into(), extension.into());
    }

    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) => {
            let mut dotted = OsString::from(".");
            dotted.push(extension);
            (stem.to_os_string(), dotted)
        }
        _ => (file_name.to_os_string(), OsString::new()),
    }
}

/// Nothing at `path`, not even a dangling symlink
fn is_free(path: &Path) -> bool {
    fs::symlink_metadata(path).is_err()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionAllocator;

impl VersionAllocator {
    pub fn new() -> Self {
        Self
    }

    /// First path in `folder` for `base_name` + `extension` that does not exist
    pub fn allocate(
        &self,
        folder: &Path,
        base_name: impl AsRef<OsStr>,
        extension: impl AsRef<OsStr>,
    ) -> PathBuf {
        let (base_name, extension) = (base_name.as_ref(), extension.as_ref());

        let mut name = base_name.to_os_string();
        name.push(extension);
        let path = folder.join(&name);
        if is_free(&path) {
            return path;
        }

        let mut version: u64 = 2;
        loop {
            let mut name = base_name.to_os_string();
            name.push(format!("_v{version}"));
            name.push(extension);
            let candidate = folder.join(name);
            if is_free(&candidate) {
                tracing::debug!("{} taken, using version {}", path.display(), version);
                return candidate;
            }
            version += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("invoice.2024.pdf"), ("invoice.2024", ".pdf"));
        assert_eq!(split_file_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_file_name("README"), ("README", ""));
        assert_eq!(split_file_name(".env"), (".env", ""));
        assert_eq!(split_file_name("..hidden.txt"), ("..hidden", ".txt"));
        assert_eq!(split_file_name("trailing."), ("trailing", "."));
    }

    #[test]
    fn test_sequential_allocation() {
        let temp = TempDir::new().unwrap();
        let allocator = VersionAllocator::new();

        let mut names = Vec::new();
        for _ in 0..3 {
            let path = allocator.allocate(temp.path(), "report", ".pdf");
            fs::write(&path, b"x").unwrap();
            names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        }

        assert_eq!(names, ["report.pdf", "report_v2.pdf", "report_v3.pdf"]);
    }

    #[test]
    fn test_fills_first_gap() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("plan.ifc"), b"1").unwrap();
        fs::write(temp.path().join("plan_v2.ifc"), b"2").unwrap();
        fs::write(temp.path().join("plan_v4.ifc"), b"4").unwrap();

        let path = VersionAllocator::new().allocate(temp.path(), "plan", ".ifc");
        assert_eq!(path, temp.path().join("plan_v3.ifc"));
    }

    #[cfg(unix)]
    #[test]
    fn test_split_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let (base, extension) = split_os_file_name(OsStr::from_bytes(b"caf\xe9.txt"));
        assert_eq!(base.as_bytes(), b"caf\xe9");
        assert_eq!(extension, OsString::from(".txt"));

        let (base, extension) = split_os_file_name(OsStr::from_bytes(b"r\xe9sum\xe9"));
        assert_eq!(base.as_bytes(), b"r\xe9sum\xe9");
        assert!(extension.is_empty());
    }

    #[test]
    fn test_split_os_matches_str_split() {
        for name in ["invoice.2024.pdf", "README", ".env", "..hidden.txt"] {
            let (base, extension) = split_os_file_name(OsStr::new(name));
            let (expected_base, expected_extension) = split_file_name(name);
            assert_eq!(base, OsString::from(expected_base));
            assert_eq!(extension, OsString::from(expected_extension));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_slot_is_taken() {
        let temp = TempDir::new().unwrap();
        let outside = temp.path().join("outside.txt");
        std::os::unix::fs::symlink(&outside, temp.path().join("notes.txt")).unwrap();

        let path = VersionAllocator::new().allocate(temp.path(), "notes", ".txt");
        assert_eq!(path, temp.path().join("notes_v2.txt"));
    }

    #[test]
    fn test_no_extension() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Makefile"), b"all:").unwrap();
        let path = VersionAllocator::new().allocate(temp.path(), "Makefile", "");
        assert_eq!(path, temp.path().join("Makefile_v2"));
    }
}

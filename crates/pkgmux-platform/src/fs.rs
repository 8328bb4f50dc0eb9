use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirStats {
    pub size: u64,
    pub file_count: u64,
}

/// Total byte size and number of regular files below `root`.
///
/// Symlinks are not followed. Entries that vanish or cannot be read while
/// walking are skipped, so a cache being written concurrently still yields
/// a best-effort answer.
///
/// # Errors
/// Returns an error only when `root` itself cannot be read.
pub fn dir_stats(root: &Path) -> std::io::Result<DirStats> {
    let mut stats = DirStats::default();
    let mut pending = vec![root.to_path_buf()];
    let mut first = true;

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) if first => return Err(error),
            Err(_) => continue,
        };
        first = false;

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                stats.file_count += 1;
                stats.size += entry.metadata().map_or(0, |m| m.len());
            }
        }
    }

    Ok(stats)
}

#[must_use]
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Expand a leading `~` to the user's home directory.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Directories never descended into while scanning for projects.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", ".hg", ".svn"];

/// Every directory below `root` (including `root`) containing a file named
/// `file_name`, skipping [`SKIPPED_DIRS`] and unreadable directories.
#[must_use]
pub fn find_dirs_containing(root: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if dir.join(file_name).is_file() {
            found.push(dir.clone());
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let name = entry.file_name();
            if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                continue;
            }
            pending.push(entry.path());
        }
    }

    found.sort();
    found
}

use log::debug;
use std::path::{Path, PathBuf};
use which::which;

use crate::tool::NodeTool;

/// Resolve the executable for `tool`: `PATH` first, then the usual install
/// locations. `None` when the tool cannot be found anywhere.
#[must_use]
pub fn locate(tool: NodeTool) -> Option<PathBuf> {
    if let Ok(path) = which(tool.name()) {
        debug!("Found {} on PATH: {}", tool.name(), path.display());
        return Some(path);
    }

    select_existing(tool.fallback_paths())
}

fn select_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.is_file())
}

/// First line of `--version` output with any leading `v` removed.
#[must_use]
pub fn parse_version(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    Some(line.strip_prefix('v').unwrap_or(line).to_string())
}

pub(crate) fn display_program(program: &Path) -> String {
    program
        .file_name()
        .map_or_else(|| program.display().to_string(), |name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{display_program, parse_version, select_existing};

    #[test]
    fn select_existing_skips_missing_candidates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let present = dir.path().join("pnpm");
        std::fs::write(&present, b"").expect("write fake binary");

        let selected = select_existing(vec![dir.path().join("missing"), present.clone()]);

        assert_eq!(selected, Some(present));
    }

    #[test]
    fn select_existing_returns_none_when_nothing_exists() {
        let dir = tempfile::tempdir().expect("temp dir");

        assert_eq!(select_existing(vec![dir.path().join("bun")]), None);
    }

    #[test]
    fn parse_version_strips_prefix_and_blank_lines() {
        assert_eq!(parse_version("\n10.2.4\n").as_deref(), Some("10.2.4"));
        assert_eq!(parse_version("v1.1.38").as_deref(), Some("1.1.38"));
        assert_eq!(parse_version("   "), None);
    }

    #[test]
    fn display_program_uses_file_name() {
        assert_eq!(display_program(&PathBuf::from("/usr/local/bin/npm")), "npm");
    }
}

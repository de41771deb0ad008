use std::path::{Path, PathBuf};

/// Resolve the directory that holds `.guestwatch/`.
///
/// Priority:
/// 1. `--root` flag / `GUESTWATCH_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.guestwatch/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_marked_ancestor(&cwd).unwrap_or(cwd)
}

fn find_marked_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| guestwatch_core::paths::guestwatch_dir(dir).is_dir())
        .map(Path::to_path_buf)
}

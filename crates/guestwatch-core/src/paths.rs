use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GUESTWATCH_DIR: &str = ".guestwatch";
pub const CONFIG_FILE: &str = ".guestwatch/config.yaml";
pub const STATE_FILE: &str = ".guestwatch/state.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn guestwatch_dir(root: &Path) -> PathBuf {
    root.join(GUESTWATCH_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

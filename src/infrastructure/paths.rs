//! Platform path helpers.

use std::path::PathBuf;

const APP_DIR: &str = "feedsync";

/// Per-user data directory, e.g. `~/.local/share/feedsync` on Linux.
///
/// Falls back to `./feedsync` when the platform has no data directory.
#[must_use]
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the configuration file, e.g.
/// `~/.config/feedsync/config.toml`.
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Default trace export file inside [`get_data_dir`].
#[must_use]
pub fn default_trace_file() -> PathBuf {
    get_data_dir().join("feedsync-trace.jsonl")
}

/// Expands a leading `~` to the home directory.
///
/// ```
/// use feedsync::infrastructure::expand_tilde;
/// use std::path::PathBuf;
///
/// assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

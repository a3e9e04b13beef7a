//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default root of the proc filesystem.
pub const DEFAULT_PROCFS_ROOT: &str = "/proc";

/// Directory under the procfs root holding the socket tables.
pub const NET_TABLE_DIR: &str = "net";

/// Default data refresh period in milliseconds.
pub const DEFAULT_REFRESH_PERIOD_MS: u64 = 500;

/// Number of collections performed before the first frame is drawn.
pub const WARMUP_COLLECTIONS: usize = 2;

/// Format tag written in the header line of every session file.
pub const SESSION_FORMAT: &str = "sockwatch-session";

/// Current session file format version.
pub const SESSION_VERSION: u32 = 1;

/// Conventional extension for session files.
pub const SESSION_EXTENSION: &str = ".swrec";

/// Application name used in CLI output and log files.
pub const APP_NAME: &str = "sockwatch";

/// Fallback data directory when no home directory is available.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/sockwatch";

/// Returns the data directory, preferring `$HOME/.sockwatch` and falling
/// back to `/var/lib/sockwatch`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".sockwatch");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default log file used while the dashboard owns the terminal.
pub fn default_log_file() -> PathBuf {
    data_dir().join(format!("{APP_NAME}.log"))
}

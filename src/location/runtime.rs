//! Runtime detection — resolved once at startup, never queried ad hoc.

use std::env;
use std::fmt;
use std::path::Path;

/// The scripting environment we are running inside. Decides which location
/// backends are worth attempting, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// An SL4A RPC bridge is reachable (Pydroid 3 exports AP_PORT).
    Sl4a,
    /// Termux with the termux-api tools on PATH.
    Termux,
    /// Anything else — desktops fall back to IP geolocation.
    Desktop,
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sl4a => write!(f, "Android (SL4A)"),
            Self::Termux => write!(f, "Termux"),
            Self::Desktop => write!(f, "Desktop"),
        }
    }
}

impl Runtime {
    /// Probe the environment. Call once and pass the result down; the
    /// providers themselves never re-detect.
    pub fn detect() -> Self {
        if env::var_os("AP_PORT").is_some() {
            return Self::Sl4a;
        }
        if on_path("termux-location") {
            return Self::Termux;
        }
        Self::Desktop
    }
}

/// `which`-style PATH lookup.
fn on_path(binary: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| is_executable(&dir.join(binary)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

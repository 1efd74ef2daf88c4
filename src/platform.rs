//! Platform capabilities: hosts directory, DNS refresh, privilege check.
//!
//! One variant per supported operating system, selected once at startup.
//! Anything else is fatal — there is no portable fallback for either the
//! hosts path or the refresh command.

use crate::error::{HostsError, Result};
use std::path::PathBuf;

/// The supported operating systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows: `%SystemRoot%\System32\drivers\etc`, `ipconfig /flushdns`.
    Windows,
    /// Linux: `/etc`, networking service restart.
    Linux,
    /// macOS: `/etc`, primary interface cycle.
    MacOs,
}

impl Platform {
    /// Detects the running platform.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnsupportedPlatform`] on any other OS.
    pub fn detect() -> Result<Self> {
        match std::env::consts::OS {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            os => Err(HostsError::UnsupportedPlatform { os: os.to_string() }),
        }
    }

    /// Returns the directory containing the live hosts file.
    #[must_use]
    pub fn hosts_dir(self) -> PathBuf {
        match self {
            Self::Windows => {
                let root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".into());
                PathBuf::from(root).join("System32").join("drivers").join("etc")
            }
            Self::Linux | Self::MacOs => PathBuf::from("/etc"),
        }
    }

    /// The command run after a hosts rewrite so the OS picks up the change.
    #[must_use]
    pub const fn refresh_argv(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &["ipconfig", "/flushdns"],
            Self::Linux => &["/etc/init.d/networking", "restart"],
            // No daemon rereads /etc/hosts on macOS; cycling the primary
            // interface forces the resolver to drop its cache.
            Self::MacOs => &["sh", "-c", "ifconfig en0 down && ifconfig en0 up"],
        }
    }

    /// Runs the platform refresh command and waits for it.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] if the command cannot be spawned; a
    /// non-zero exit is reported in the returned status, not as an error.
    pub fn refresh(self) -> Result<std::process::ExitStatus> {
        let argv = self.refresh_argv();
        tracing::info!(command = %argv.join(" "), "Refreshing DNS state");
        Ok(std::process::Command::new(argv[0])
            .args(&argv[1..])
            .status()?)
    }

    /// Returns `true` if the process holds the privilege needed to rewrite
    /// the hosts file.
    ///
    /// Unix checks for effective UID 0. Windows probes the hosts file for
    /// write access, which reflects the admin token without any extra
    /// bindings.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        #[cfg(unix)]
        {
            // SAFETY: geteuid has no preconditions and cannot fail.
            unsafe { libc::geteuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            std::fs::OpenOptions::new()
                .append(true)
                .open(self.hosts_dir().join("hosts"))
                .is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_recognizes_build_host() {
        // Tests only run on the three supported platforms.
        Platform::detect().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn unix_hosts_dir_is_etc() {
        assert_eq!(Platform::Linux.hosts_dir(), PathBuf::from("/etc"));
        assert_eq!(Platform::MacOs.hosts_dir(), PathBuf::from("/etc"));
    }

    #[test]
    fn refresh_argv_is_nonempty_per_platform() {
        for p in [Platform::Windows, Platform::Linux, Platform::MacOs] {
            assert!(!p.refresh_argv().is_empty());
        }
    }

    #[test]
    fn windows_refresh_flushes_dns() {
        assert_eq!(Platform::Windows.refresh_argv(), ["ipconfig", "/flushdns"]);
    }
}

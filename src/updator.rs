//! Hosts download, caching, and live-file splicing.
//!
//! Each source owns a working directory holding its last-downloaded payload
//! and a digest sidecar. The live hosts file is split at a sentinel line:
//! everything above it is user-authored and preserved verbatim, everything
//! from the sentinel down is owned by this module and replaced wholesale on
//! every apply.

use crate::error::{HostsError, Result};
use crate::platform::Platform;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Sentinel line separating the user region from the managed region.
///
/// Matched by line prefix, so it survives trailing whitespace and re-runs.
pub const SEPARATOR: &str = "# -------------------- Modified -------------------- #";

/// Template written when no hosts file exists yet, so the system always has
/// a valid hosts file before being managed.
pub const INITIAL_HOSTS: &str = "\
# Copyright (c) 1993-2009 Microsoft Corp.
#
# This is a sample HOSTS file used by Microsoft TCP/IP for Windows.
#
# This file contains the mappings of IP addresses to host names. Each
# entry should be kept on an individual line. The IP address should
# be placed in the first column followed by the corresponding host name.
# The IP address and the host name should be separated by at least one
# space.
#
# Additionally, comments (such as these) may be inserted on individual
# lines or following the machine name denoted by a '#' symbol.
#
# For example:
#
#      102.54.94.97     rhino.acme.com          # source server
#       38.25.63.10     x.acme.com              # x client host

# localhost name resolution is handled within DNS itself.
#   127.0.0.1       localhost
#   ::1             localhost

";

/// Cached payload file name inside a source's working directory.
const PAYLOAD_FILE: &str = "hosts.txt";

/// Digest sidecar file name: bare hex of the last stored payload.
const DIGEST_FILE: &str = "digest.txt";

/// Live hosts file name inside the platform hosts directory.
const HOSTS_FILE: &str = "hosts";

/// Result of [`HostsUpdator::pull`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// New content was downloaded and cached.
    Updated,
    /// Remote content matched the stored digest; nothing was written.
    Unchanged,
}

/// Downloads one source's hosts payload and splices it into the live file.
///
/// # Lifecycle
///
/// 1. [`pull`](Self::pull) fetches the source URL and caches the payload,
///    skipping the write when the content digest is unchanged.
/// 2. [`apply`](Self::apply) backs up the live hosts file, preserves the
///    user region, and rewrites the managed region from the cache.
///
/// Only one source is ever live; applying a source implicitly displaces
/// whatever was spliced in before.
///
/// # Recovery
///
/// Neither operation is transactional across its steps. Both are idempotent,
/// and re-running them repairs any partially-updated state; the timestamped
/// backups make the live file recoverable even outside the tool.
///
/// # Permissions
///
/// Rewriting the hosts file requires elevation
/// ([`Platform::is_elevated`]). The caller must handle that before calling
/// [`apply`](Self::apply).
pub struct HostsUpdator {
    name: String,
    url: String,
    hosts_dir: PathBuf,
    working_dir: PathBuf,
    platform: Platform,
    refresh_enabled: bool,
}

impl HostsUpdator {
    /// Creates an updator for one source, with its working directory under
    /// `app_root/data/<name>` (created if absent).
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnsupportedPlatform`] on an unrecognized OS, or
    /// [`HostsError::Io`] if the working directory cannot be created.
    pub fn new(name: impl Into<String>, url: impl Into<String>, app_root: &Path) -> Result<Self> {
        let name = name.into();
        let platform = Platform::detect()?;
        let working_dir = app_root.join("data").join(&name);
        if !working_dir.is_dir() {
            std::fs::create_dir_all(&working_dir)?;
        }
        Ok(Self {
            name,
            url: url.into(),
            hosts_dir: platform.hosts_dir(),
            working_dir,
            platform,
            refresh_enabled: true,
        })
    }

    /// Overrides the hosts directory (useful for testing).
    #[must_use]
    pub fn hosts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.hosts_dir = dir.into();
        self
    }

    /// Disables the post-apply OS refresh (useful for testing).
    #[must_use]
    pub const fn no_refresh(mut self) -> Self {
        self.refresh_enabled = false;
        self
    }

    /// Returns this source's working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the live hosts file path.
    #[must_use]
    pub fn hosts_path(&self) -> PathBuf {
        self.hosts_dir.join(HOSTS_FILE)
    }

    /// Downloads the source payload and caches it if its content changed.
    ///
    /// No retry and no internal timeout: transport and HTTP-status failures
    /// propagate to the caller untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Network`] on fetch failure or
    /// [`HostsError::Io`] on cache-write failure.
    pub fn pull(&self) -> Result<PullOutcome> {
        tracing::info!(source = %self.name, url = %self.url, "Downloading hosts payload");
        let body = reqwest::blocking::get(&self.url)?
            .error_for_status()?
            .bytes()?;
        self.ingest(&body)
    }

    /// Caches `bytes` as this source's payload, unless the stored digest
    /// already matches.
    ///
    /// Payload and sidecar are each written through a temp-file rename, so
    /// neither is ever observed half-written. A crash between the two
    /// renames leaves a stale digest, which the next pull repairs.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] on write failure.
    pub fn ingest(&self, bytes: &[u8]) -> Result<PullOutcome> {
        let digest = format!("{:x}", Sha256::digest(bytes));
        if self.stored_digest().as_deref() == Some(digest.as_str()) {
            tracing::info!(source = %self.name, "Hosts already up to date, skipping");
            return Ok(PullOutcome::Unchanged);
        }
        write_atomic(&self.payload_path(), decode_text(bytes).as_bytes())?;
        write_atomic(&self.digest_path(), digest.as_bytes())?;
        tracing::info!(source = %self.name, digest = %digest, "Cached hosts payload");
        Ok(PullOutcome::Updated)
    }

    /// Returns the cached payload text for this source.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::MissingCache`] if no payload has ever been
    /// pulled, or [`HostsError::Io`] on read failure.
    pub fn cached_payload(&self) -> Result<String> {
        let path = self.payload_path();
        if !path.is_file() {
            return Err(HostsError::MissingCache {
                name: self.name.clone(),
            });
        }
        Ok(std::fs::read_to_string(&path)?)
    }

    /// Splices the cached payload into the live hosts file.
    ///
    /// Creates a boilerplate hosts file if none exists, takes a timestamped
    /// backup, preserves every line above the sentinel verbatim, and
    /// rewrites the rest from the cache. On success the OS-level refresh
    /// runs; its failure is logged and deliberately not propagated, since
    /// the hosts file is already in its new state.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::MissingCache`] if the source was never pulled,
    /// or [`HostsError::Io`] on any file operation.
    pub fn apply(&self) -> Result<()> {
        let payload = self.cached_payload()?;
        let hosts = self.hosts_path();

        if !hosts.is_file() {
            tracing::info!(path = %hosts.display(), "Hosts file absent, initializing");
            std::fs::write(&hosts, INITIAL_HOSTS)?;
        }
        self.backup()?;

        let user_region = read_user_region(&hosts)?;
        let mut next = user_region;
        next.push_str(SEPARATOR);
        next.push('\n');
        next.push_str(&payload);
        write_atomic(&hosts, next.as_bytes())?;
        tracing::info!(source = %self.name, path = %hosts.display(), "Switched hosts source");

        if self.refresh_enabled {
            match self.platform.refresh() {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    tracing::warn!(%status, "DNS refresh command exited non-zero");
                }
                Err(e) => tracing::warn!(error = %e, "DNS refresh command failed to run"),
            }
        }
        Ok(())
    }

    /// Copies the live hosts file to `hosts.<YYYYMMDD.HHMMSS>.bak` beside it.
    ///
    /// Backups accumulate; nothing prunes them.
    fn backup(&self) -> Result<()> {
        let stamp = chrono::Local::now().format("%Y%m%d.%H%M%S");
        let backup = self.hosts_dir.join(format!("{HOSTS_FILE}.{stamp}.bak"));
        std::fs::copy(self.hosts_path(), &backup)?;
        tracing::info!(path = %backup.display(), "Backed up hosts file");
        Ok(())
    }

    fn stored_digest(&self) -> Option<String> {
        std::fs::read_to_string(self.digest_path())
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn payload_path(&self) -> PathBuf {
        self.working_dir.join(PAYLOAD_FILE)
    }

    fn digest_path(&self) -> PathBuf {
        self.working_dir.join(DIGEST_FILE)
    }
}

/// Deletes a removed source's working directory, if it exists.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be removed.
pub fn purge_working_dir(app_root: &Path, name: &str) -> std::io::Result<()> {
    let dir = app_root.join("data").join(name);
    if dir.is_dir() {
        std::fs::remove_dir_all(&dir)?;
        tracing::info!(source = %name, path = %dir.display(), "Removed source cache");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Writes `bytes` to `path` via a temp file and atomic rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Decodes downloaded bytes, falling back to lossy UTF-8 rather than
/// failing on a payload in some other charset.
fn decode_text(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes).map_or_else(
        |_| {
            tracing::warn!("Payload is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        },
        str::to_owned,
    )
}

/// Reads the user region of a hosts file: every line before the first line
/// starting with [`SEPARATOR`], verbatim. A file with no sentinel is all
/// user region. Hand-edited hosts files are not always UTF-8, so the read
/// goes through the same tolerant decoding as downloaded payloads.
fn read_user_region(path: &Path) -> std::io::Result<String> {
    let raw = decode_text(&std::fs::read(path)?);
    Ok(raw
        .split_inclusive('\n')
        .take_while(|line| !line.starts_with(SEPARATOR))
        .collect())
}

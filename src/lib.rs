//! # hostman
//!
//! Switch the operating system's hosts file between named remote sources.
//!
//! A [`Registry`] holds an ordered set of sources (name, URL, note) with one
//! "current" selection, persisted as a single JSON file. A [`HostsUpdator`]
//! bound to one source downloads its payload, caches it keyed by content
//! digest, and splices it into the live hosts file below a sentinel line —
//! everything the user wrote above the sentinel is preserved verbatim.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hostman::{HostsUpdator, Registry, Source};
//!
//! let mut registry = Registry::load(&config_path)?;
//! registry.add(Source::new("default", "https://example.com/hosts", ""));
//! registry.set_current("default")?;
//!
//! let source = registry.current_source().unwrap();
//! let updator = HostsUpdator::new(&source.name, &source.url, &app_root)?;
//! updator.pull()?;   // fetch + cache (no-op when content is unchanged)
//! updator.apply()?;  // backup, splice below the sentinel, refresh DNS
//!
//! registry.save(&config_path)?;
//! ```
//!
//! ## Recovery
//!
//! Operations are not transactional across their steps; they are idempotent
//! instead. Re-running `pull` repairs a stale digest sidecar, re-running
//! `apply` reproduces the same managed region, and every rewrite of the live
//! file is preceded by a timestamped backup beside it.
//!
//! ## Permissions
//!
//! Rewriting the hosts file requires elevation (root on Unix, an admin token
//! on Windows). The binary checks up front ([`Platform::is_elevated`]) and
//! refuses with an instructive message; it does not self-elevate.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod platform;
pub mod registry;
pub mod updator;

pub use error::{HostsError, Result};
pub use platform::Platform;
pub use registry::{AddOutcome, OrderSpec, Registry, Source};
pub use updator::{HostsUpdator, PullOutcome, SEPARATOR, purge_working_dir};

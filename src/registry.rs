//! Named source registry.
//!
//! An ordered collection of hosts sources with a single "current" selection,
//! loaded once per session and written back in full on save. All mutations
//! are in-memory; persistence is an explicit step owned by the caller.

use crate::error::{HostsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// A named, URL-addressable provider of hosts-file content.
///
/// Identity is `name`; the registry enforces uniqueness on add and rename.
/// Fields are declared in key order so the persisted form is sorted-key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique key within the registry.
    pub name: String,
    /// Free-text annotation, empty by default.
    #[serde(default)]
    pub note: String,
    /// Where `pull` downloads from.
    pub url: String,
}

impl Source {
    /// Creates a new source.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            note: note.into(),
        }
    }
}

/// Result of [`Registry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new source was appended at the end.
    Added,
    /// An existing source's url/note were overwritten in place.
    Updated,
}

/// Position token accepted by [`Registry::reorder`].
///
/// A bare unsigned integer is an absolute 1-based position; a leading `+` or
/// `-` makes it a delta from the entry's current index. Both forms clamp to
/// the valid range instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSpec {
    /// Absolute 1-based position, clamped to `[1, count]`.
    Absolute(usize),
    /// Signed delta from the current 0-based index, clamped to `[0, count-1]`.
    Relative(isize),
}

impl FromStr for OrderSpec {
    type Err = HostsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HostsError::InvalidOrder {
            token: s.to_string(),
        };
        if s.starts_with('+') || s.starts_with('-') {
            s.parse::<isize>().map(Self::Relative).map_err(|_| invalid())
        } else {
            s.parse::<usize>().map(Self::Absolute).map_err(|_| invalid())
        }
    }
}

/// Ordered source collection with a current-selection pointer.
///
/// # Lifecycle
///
/// 1. [`load`](Self::load) at session start (absent file ⇒ empty registry).
/// 2. Mutate in memory across commands.
/// 3. [`save`](Self::save) rewrites the file in full.
///
/// Order is significant only for display and [`reorder`](Self::reorder).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Name of the selected source; empty when nothing is selected.
    #[serde(default)]
    pub current: String,
    /// Sources in display order.
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Registry {
    /// Loads the registry from `path`, or returns an empty registry if the
    /// file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] on read failure or
    /// [`HostsError::Registry`] on malformed JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No registry file, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the registry back in full as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::Io`] if the parent directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut raw = serde_json::to_string_pretty(self)?;
        raw.push('\n');
        std::fs::write(path, raw)?;
        tracing::debug!(path = %path.display(), count = self.sources.len(), "Saved registry");
        Ok(())
    }

    /// Returns `true` if a source with `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns the selected source, if any.
    #[must_use]
    pub fn current_source(&self) -> Option<&Source> {
        self.index_of(&self.current).map(|i| &self.sources[i])
    }

    /// Adds a source, or overwrites the url/note of an existing one in place.
    ///
    /// The caller is expected to confirm before overwriting (see
    /// [`contains`](Self::contains)); once called, the overwrite is
    /// unconditional.
    pub fn add(&mut self, source: Source) -> AddOutcome {
        if let Some(i) = self.index_of(&source.name) {
            self.sources[i] = source;
            AddOutcome::Updated
        } else {
            self.sources.push(source);
            AddOutcome::Added
        }
    }

    /// Removes every named source, all-or-nothing.
    ///
    /// Returns the removed entries so the caller can purge their working
    /// directories. Removing the current source clears the selection.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownSource`] if any name is absent; the
    /// registry is left untouched in that case.
    pub fn remove(&mut self, names: &[String]) -> Result<Vec<Source>> {
        for name in names {
            if !self.contains(name) {
                return Err(HostsError::UnknownSource { name: name.clone() });
            }
        }
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sources)
            .into_iter()
            .partition(|s| names.contains(&s.name));
        self.sources = kept;
        if names.contains(&self.current) {
            self.current.clear();
        }
        Ok(removed)
    }

    /// Renames a source, retargeting `current` if it pointed at `old`.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownSource`] if `old` is absent, or
    /// [`HostsError::DuplicateName`] if `new` is already taken by a
    /// different entry. The registry is unchanged on error.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let Some(i) = self.index_of(old) else {
            return Err(HostsError::UnknownSource {
                name: old.to_string(),
            });
        };
        if old != new && self.contains(new) {
            return Err(HostsError::DuplicateName {
                name: new.to_string(),
            });
        }
        self.sources[i].name = new.to_string();
        if self.current == old {
            self.current = new.to_string();
        }
        Ok(())
    }

    /// Moves a source to the position named by `order` and returns the new
    /// 0-based index. All other entries shift accordingly.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownSource`] if `name` is absent, or
    /// [`HostsError::InvalidOrder`] if the token parses as neither form.
    pub fn reorder(&mut self, name: &str, order: &str) -> Result<usize> {
        let parsed = order.parse::<OrderSpec>()?;
        let Some(from) = self.index_of(name) else {
            return Err(HostsError::UnknownSource {
                name: name.to_string(),
            });
        };
        let last = self.sources.len() - 1;
        let to = match parsed {
            OrderSpec::Absolute(pos) => pos.clamp(1, self.sources.len()) - 1,
            #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
            OrderSpec::Relative(delta) => {
                (from as isize).saturating_add(delta).clamp(0, last as isize) as usize
            }
        };
        let entry = self.sources.remove(from);
        self.sources.insert(to, entry);
        Ok(to)
    }

    /// Selects `name` as the current source.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownSource`] if `name` is absent.
    pub fn set_current(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(HostsError::UnknownSource {
                name: name.to_string(),
            });
        }
        self.current = name.to_string();
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.sources.iter().position(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> Registry {
        let mut r = Registry::default();
        r.add(Source::new("a", "http://a/hosts", ""));
        r.add(Source::new("b", "http://b/hosts", ""));
        r.add(Source::new("c", "http://c/hosts", ""));
        r.set_current("a").unwrap();
        r
    }

    fn names(r: &Registry) -> Vec<&str> {
        r.sources.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn add_appends_then_updates_in_place() {
        let mut r = Registry::default();
        assert_eq!(r.add(Source::new("a", "http://a", "")), AddOutcome::Added);
        assert_eq!(r.add(Source::new("b", "http://b", "")), AddOutcome::Added);
        assert_eq!(
            r.add(Source::new("a", "http://a2", "mirror")),
            AddOutcome::Updated
        );
        assert_eq!(names(&r), vec!["a", "b"]);
        assert_eq!(r.sources[0].url, "http://a2");
        assert_eq!(r.sources[0].note, "mirror");
    }

    #[test]
    fn remove_is_all_or_nothing() {
        let mut r = three();
        let err = r
            .remove(&["a".to_string(), "nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, HostsError::UnknownSource { name } if name == "nope"));
        assert_eq!(names(&r), vec!["a", "b", "c"]);

        let removed = r.remove(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(names(&r), vec!["c"]);
    }

    #[test]
    fn remove_clears_dangling_current() {
        let mut r = three();
        r.remove(&["a".to_string()]).unwrap();
        assert!(r.current.is_empty());
        assert!(r.current_source().is_none());
    }

    #[test]
    fn remove_keeps_unrelated_current() {
        let mut r = three();
        r.remove(&["b".to_string()]).unwrap();
        assert_eq!(r.current, "a");
    }

    #[test]
    fn rename_retargets_current() {
        let mut r = three();
        r.rename("a", "z").unwrap();
        assert_eq!(r.current, "z");
        assert_eq!(names(&r), vec!["z", "b", "c"]);
    }

    #[test]
    fn rename_collision_leaves_registry_unchanged() {
        let mut r = three();
        let err = r.rename("a", "b").unwrap_err();
        assert!(matches!(err, HostsError::DuplicateName { name } if name == "b"));
        assert_eq!(names(&r), vec!["a", "b", "c"]);
        assert_eq!(r.current, "a");
    }

    #[test]
    fn rename_unknown_fails() {
        let mut r = three();
        assert!(matches!(
            r.rename("nope", "x").unwrap_err(),
            HostsError::UnknownSource { .. }
        ));
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut r = three();
        r.rename("b", "b").unwrap();
        assert_eq!(names(&r), vec!["a", "b", "c"]);
    }

    #[test]
    fn reorder_absolute_moves_to_front() {
        for start in ["a", "b", "c"] {
            let mut r = three();
            r.reorder(start, "1").unwrap();
            assert_eq!(names(&r)[0], start);
        }
    }

    #[test]
    fn reorder_absolute_clamps_past_end() {
        let mut r = three();
        assert_eq!(r.reorder("a", "99").unwrap(), 2);
        assert_eq!(names(&r), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_relative_clamps_at_last_index() {
        let mut r = three();
        assert_eq!(r.reorder("b", "+1").unwrap(), 2);
        assert_eq!(names(&r), vec!["a", "c", "b"]);
        // Already last, +1 stays put.
        assert_eq!(r.reorder("b", "+1").unwrap(), 2);
        assert_eq!(names(&r), vec!["a", "c", "b"]);
    }

    #[test]
    fn reorder_relative_negative() {
        let mut r = three();
        assert_eq!(r.reorder("c", "-2").unwrap(), 0);
        assert_eq!(names(&r), vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_rejects_malformed_token() {
        let mut r = three();
        for token in ["", "x", "1.5", "+-1", "- 2"] {
            assert!(matches!(
                r.reorder("a", token).unwrap_err(),
                HostsError::InvalidOrder { .. }
            ));
        }
        assert_eq!(names(&r), vec!["a", "b", "c"]);
    }

    #[test]
    fn set_current_requires_existing_name() {
        let mut r = three();
        assert!(matches!(
            r.set_current("nope").unwrap_err(),
            HostsError::UnknownSource { .. }
        ));
        r.set_current("c").unwrap();
        assert_eq!(r.current_source().unwrap().name, "c");
    }

    #[test]
    fn empty_current_selects_nothing() {
        let mut r = three();
        r.current.clear();
        assert!(r.current_source().is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let mut r = three();
        r.sources[1].note = "backup mirror".to_string();
        r.save(&path).unwrap();

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.current, "a");
        assert_eq!(loaded.sources, r.sources);
    }

    #[test]
    fn save_emits_sorted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        three().save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.find("\"current\"").unwrap() < raw.find("\"sources\"").unwrap());
        let entry = &raw[raw.find('[').unwrap()..];
        let name = entry.find("\"name\"").unwrap();
        let note = entry.find("\"note\"").unwrap();
        let url = entry.find("\"url\"").unwrap();
        assert!(name < note && note < url);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let r = Registry::load(&dir.path().join("nope.json")).unwrap();
        assert!(r.sources.is_empty());
        assert!(r.current.is_empty());
    }

    #[test]
    fn load_tolerates_missing_note_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(
            &path,
            r#"{"current":"a","sources":[{"name":"a","url":"http://a/hosts"}]}"#,
        )
        .unwrap();
        let r = Registry::load(&path).unwrap();
        assert_eq!(r.sources[0].note, "");
    }

    #[test]
    fn order_spec_parsing() {
        assert_eq!("3".parse::<OrderSpec>().unwrap(), OrderSpec::Absolute(3));
        assert_eq!("+2".parse::<OrderSpec>().unwrap(), OrderSpec::Relative(2));
        assert_eq!("-1".parse::<OrderSpec>().unwrap(), OrderSpec::Relative(-1));
        assert!("abc".parse::<OrderSpec>().is_err());
    }
}

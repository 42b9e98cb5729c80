//! Session store
//!
//! One directory per session:
//!
//! ```text
//! <dir>/log.json                   JSON array of events, 4-space indent
//! <dir>/images/screenshot_<id>.png
//! ```
//!
//! The log is always replaced as a whole (temp file + rename in the same
//! directory) so a reader never sees a torn prefix.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;

use crate::error::{Result, StepdocError};
use crate::event_log::Event;

pub const LOG_FILE: &str = "log.json";
pub const IMAGES_DIR: &str = "images";

/// Paths and persistence for one session directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    log_path: PathBuf,
    images_dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            log_path: dir.join(LOG_FILE),
            images_dir: dir.join(IMAGES_DIR),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Create the session and image directories
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.images_dir)?;
        Ok(())
    }

    /// Where the screenshot for event `id` goes
    pub fn screenshot_path(&self, id: u64) -> PathBuf {
        self.images_dir.join(format!("screenshot_{}.png", id))
    }

    pub fn exists(&self) -> bool {
        self.log_path.is_file()
    }

    /// Replace the log with the full event sequence
    pub fn save(&self, events: &[Event]) -> Result<()> {
        let mut buf = Vec::with_capacity(256 * events.len().max(1));
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        events.serialize(&mut ser)?;

        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&buf)?;
        tmp.flush()?;
        tmp.persist(&self.log_path)
            .map_err(|e| StepdocError::Persist {
                path: self.log_path.clone(),
                reason: e.error.to_string(),
            })?;

        tracing::trace!(path = %self.log_path.display(), events = events.len(), "Session log written");
        Ok(())
    }

    /// Read the persisted sequence in stored order
    pub fn load(&self) -> Result<Vec<Event>> {
        let content = match fs::read(&self.log_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StepdocError::MissingSession {
                    path: self.log_path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&content).map_err(|source| StepdocError::SessionParse {
            path: self.log_path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::Action;
    use tempfile::TempDir;

    fn event(id: u64, action: Action) -> Event {
        Event {
            id,
            timestamp: format!("2024-05-01T10:00:{:02}.000000", id % 60),
            action,
            screenshot: None,
        }
    }

    #[test]
    fn paths_follow_layout() {
        let store = SessionStore::new("session_data");
        assert_eq!(store.log_path(), Path::new("session_data/log.json"));
        assert_eq!(store.images_dir(), Path::new("session_data/images"));
        assert_eq!(
            store.screenshot_path(1234),
            PathBuf::from("session_data/images/screenshot_1234.png")
        );
    }

    #[test]
    fn load_missing_log_is_missing_session() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path().join("nope"));

        let err = store.load().unwrap_err();
        assert!(matches!(err, StepdocError::MissingSession { .. }));
        assert!(!store.exists());
    }

    #[test]
    fn load_malformed_log_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        fs::write(store.log_path(), "{not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StepdocError::SessionParse { .. }));
    }

    #[test]
    fn incremental_saves_read_back_in_append_order() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        store.ensure_dirs().unwrap();

        let appended = vec![
            event(30, Action::click(1, 2, "left")),
            event(10, Action::Press { key: 'h' }),
            event(20, Action::PressSpecial { key: "enter".into() }),
            event(20, Action::Press { key: 'i' }),
        ];

        let mut events = Vec::new();
        for e in &appended {
            events.push(e.clone());
            store.save(&events).unwrap();
            assert_eq!(store.load().unwrap().len(), events.len());
        }

        // Insertion order wins over ids
        assert_eq!(store.load().unwrap(), appended);
    }

    #[test]
    fn log_uses_four_space_indent() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        store.save(&[event(1, Action::Press { key: 'a' })]).unwrap();

        let text = fs::read_to_string(store.log_path()).unwrap();
        assert!(text.starts_with("[\n    {\n        \"id\": 1,"));
    }

    #[test]
    fn empty_session_saves_empty_array() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        store.save(&[]).unwrap();

        assert_eq!(fs::read_to_string(store.log_path()).unwrap(), "[]");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path());
        store.ensure_dirs().unwrap();
        store.save(&[event(1, Action::Press { key: 'a' })]).unwrap();
        store.save(&[event(1, Action::Press { key: 'a' })]).unwrap();

        let mut names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["images", "log.json"]);
    }
}

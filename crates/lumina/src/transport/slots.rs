//! Durable key-value slots used as the fallback channel.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify_debouncer_mini::notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tracing::{debug, trace, warn};

use super::{ChangeHandler, Listener};

/// Live `{slide, style}` snapshot written by the operator on every change.
pub const LIVE_STATE_KEY: &str = "lumina_live_state";
/// Style alone, so preferences survive independently of a live session.
pub const SETTINGS_KEY: &str = "lumina_settings";
/// Operator history. Never read by displays.
pub const HISTORY_KEY: &str = "lumina_history";

const WATCH_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("Slot storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Slot watcher error: {0}")]
    Watch(#[from] notify_debouncer_mini::notify::Error),

    #[error("Slot storage unavailable")]
    Unavailable,
}

pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError>;

    /// Replace the whole value of `key` in one step; readers see either the
    /// old or the new value, never a mix.
    fn set(&self, key: &str, value: &str) -> Result<(), SlotError>;

    fn remove(&self, key: &str) -> Result<(), SlotError>;

    /// Invoke `on_change` whenever `key` is written from elsewhere. Writes
    /// made through this same handle are not reported.
    fn watch(&self, key: &str, on_change: ChangeHandler) -> Result<Listener, SlotError>;
}

/// One JSON file per key inside a directory.
pub struct FileSlots {
    dir: PathBuf,
    /// Last value this handle wrote per key, so its watchers skip our own writes.
    written: Arc<Mutex<HashMap<String, String>>>,
}

impl FileSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Arc::default(),
        }
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("lumina").join("slots"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(key: &str) -> String {
        format!("{key}.json")
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(Self::file_name(key))
    }
}

impl SlotStore for FileSlots {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        if let Ok(mut written) = self.written.lock() {
            written.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        if let Ok(mut written) = self.written.lock() {
            written.remove(key);
        }
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn watch(&self, key: &str, on_change: ChangeHandler) -> Result<Listener, SlotError> {
        std::fs::create_dir_all(&self.dir)?;
        let target = OsString::from(Self::file_name(key));
        let path = self.path(key);
        let written = self.written.clone();
        let watched_key = key.to_string();
        let own_key = key.to_string();

        let mut debouncer = new_debouncer(WATCH_DEBOUNCE, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    if !events
                        .iter()
                        .any(|event| event.path.file_name() == Some(target.as_os_str()))
                    {
                        return;
                    }
                    let current = std::fs::read_to_string(&path).ok();
                    let own = written
                        .lock()
                        .map(|w| current.is_some() && w.get(&own_key) == current.as_ref())
                        .unwrap_or(false);
                    if own {
                        trace!(key = %own_key, "Skipping own slot write");
                    } else {
                        on_change();
                    }
                }
                Err(e) => warn!(error = %e, "Slot watch error"),
            }
        })?;
        debouncer
            .watcher()
            .watch(&self.dir, RecursiveMode::NonRecursive)?;
        debug!(key, dir = %self.dir.display(), "Watching slot");

        Ok(Listener::new(move || {
            drop(debouncer);
            debug!(key = %watched_key, "Stopped watching slot");
        }))
    }
}

/// Stand-in used when no storage directory can be created. Every call fails
/// with [`SlotError::Unavailable`], so the session runs on fan-out alone.
pub struct UnavailableSlots;

impl SlotStore for UnavailableSlots {
    fn get(&self, _key: &str) -> Result<Option<String>, SlotError> {
        Err(SlotError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), SlotError> {
        Err(SlotError::Unavailable)
    }

    fn remove(&self, _key: &str) -> Result<(), SlotError> {
        Err(SlotError::Unavailable)
    }

    fn watch(&self, _key: &str, _on_change: ChangeHandler) -> Result<Listener, SlotError> {
        Err(SlotError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_get_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::new(dir.path());
        assert!(slots.get(LIVE_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::new(dir.path().join("nested"));
        slots.set(SETTINGS_KEY, r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(
            slots.get(SETTINGS_KEY).unwrap().as_deref(),
            Some(r#"{"theme":"dark"}"#)
        );
    }

    #[test]
    fn test_set_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::new(dir.path());
        slots.set(LIVE_STATE_KEY, "{}").unwrap();
        slots.set(LIVE_STATE_KEY, "{\"slide\":null}").unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["lumina_live_state.json".to_string()]);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::new(dir.path());
        assert!(slots.remove(HISTORY_KEY).is_ok());
    }

    #[test]
    fn test_watch_fires_for_watched_key_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FileSlots::new(dir.path());
        let reader = FileSlots::new(dir.path());

        let (tx, rx) = mpsc::channel();
        let _watch = reader
            .watch(
                LIVE_STATE_KEY,
                Box::new(move || {
                    let _ = tx.send(());
                }),
            )
            .unwrap();

        writer.set(HISTORY_KEY, "[]").unwrap();
        writer.set(LIVE_STATE_KEY, "{}").unwrap();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("live state write should be reported");

        while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}
        writer.set(HISTORY_KEY, "[1]").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn test_watch_skips_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::new(dir.path());
        let other = FileSlots::new(dir.path());

        let (tx, rx) = mpsc::channel();
        let _watch = slots
            .watch(
                LIVE_STATE_KEY,
                Box::new(move || {
                    let _ = tx.send(());
                }),
            )
            .unwrap();

        slots.set(LIVE_STATE_KEY, r#"{"slide":null}"#).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());

        other.set(LIVE_STATE_KEY, r#"{"slide":null,"style":{}}"#).unwrap();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("write from another handle should be reported");
    }

    #[test]
    fn test_unavailable_slots_fail_every_call() {
        let slots = UnavailableSlots;
        assert!(matches!(slots.get(LIVE_STATE_KEY), Err(SlotError::Unavailable)));
        assert!(matches!(slots.set(LIVE_STATE_KEY, "{}"), Err(SlotError::Unavailable)));
        assert!(matches!(
            slots.watch(LIVE_STATE_KEY, Box::new(|| {})),
            Err(SlotError::Unavailable)
        ));
    }
}

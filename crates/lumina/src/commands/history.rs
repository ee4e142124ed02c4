use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::model::HistoryEntry;
use crate::store::{now_millis, read_json};
use crate::transport::slots::HISTORY_KEY;
use crate::transport::{FileSlots, SlotStore};

pub fn run(clear: bool) -> Result<()> {
    let config = Config::load_or_default();
    let slots = FileSlots::new(config.slots_dir()?);

    if clear {
        clear_history(&slots)?;
        println!("{} History cleared", "\u{2713}".green());
        println!(
            "{}",
            "A console that is already open keeps its list until it restarts.".dimmed()
        );
        return Ok(());
    }

    let history = load(&slots);
    if history.is_empty() {
        println!(
            "{}",
            format!("No recent verses in {}", slots.dir().display()).dimmed()
        );
        return Ok(());
    }
    let now = now_millis();
    for entry in &history {
        println!(
            "{:<24} {}",
            entry.slide.reference.bold(),
            age(now, entry.captured_at).dimmed()
        );
    }
    Ok(())
}

fn load(slots: &dyn SlotStore) -> Vec<HistoryEntry> {
    read_json(slots, HISTORY_KEY).unwrap_or_default()
}

fn clear_history(slots: &dyn SlotStore) -> Result<()> {
    slots
        .remove(HISTORY_KEY)
        .context("Failed to clear history")
}

/// Coarse "how long ago" label.
fn age(now: u64, then: u64) -> String {
    let secs = now.saturating_sub(then) / 1000;
    match secs {
        0..60 => "just now".to_string(),
        60..3_600 => format!("{} min ago", secs / 60),
        3_600..86_400 => format!("{} h ago", secs / 3_600),
        _ => format!("{} d ago", secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::SlideContent;
    use crate::store::StateStore;
    use crate::transport::memory::MemorySlots;

    #[test]
    fn test_reads_history_written_by_console() {
        let slots = MemorySlots::new();
        let mut store = StateStore::operator(Arc::new(slots.window()));
        store.present(SlideContent::manual("Hymn 301", "I am a child of God"));
        store.present(SlideContent::manual("Hymn 2", "The Spirit of God"));

        let history = load(&slots);
        let references: Vec<_> = history.iter().map(|e| e.slide.reference.as_str()).collect();
        assert_eq!(references, ["Hymn 2", "Hymn 301"]);
    }

    #[test]
    fn test_clear_removes_slot() {
        let slots = MemorySlots::new();
        slots.seed(HISTORY_KEY, "[]");
        clear_history(&slots).unwrap();
        assert!(slots.get(HISTORY_KEY).unwrap().is_none());
    }

    #[test]
    fn test_malformed_history_reads_empty() {
        let slots = MemorySlots::new();
        slots.seed(HISTORY_KEY, "{not json");
        assert!(load(&slots).is_empty());
    }

    #[test]
    fn test_age_labels() {
        assert_eq!(age(10_000, 9_000), "just now");
        assert_eq!(age(600_000, 0), "10 min ago");
        assert_eq!(age(7_200_000, 0), "2 h ago");
        assert_eq!(age(0, 5_000), "just now");
    }
}

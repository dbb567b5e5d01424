use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

use crate::config::AutoSaveConfig;
use crate::model::{EntrySet, DRAFT_ENTRIES_KEY};
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Inactive,
    Idle { last_saved_at: Option<OffsetDateTime> },
    Pending { since: OffsetDateTime },
}

/// Holds at most one deferred draft write. Arming a new write aborts the old one.
#[derive(Debug, Default)]
struct DebounceSlot {
    pending: Option<PendingWrite>,
}

#[derive(Debug)]
struct PendingWrite {
    handle: JoinHandle<()>,
    since: OffsetDateTime,
}

impl DebounceSlot {
    fn arm(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.pending = Some(PendingWrite {
            handle,
            since: OffsetDateTime::now_utc(),
        });
    }

    fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(write) if !write.handle.is_finished() => {
                write.handle.abort();
                true
            }
            _ => false,
        }
    }

    fn pending_since(&self) -> Option<OffsetDateTime> {
        self.pending
            .as_ref()
            .filter(|write| !write.handle.is_finished())
            .map(|write| write.since)
    }

    fn take(&mut self) -> Option<JoinHandle<()>> {
        self.pending.take().map(|write| write.handle)
    }
}

/// Debounced persistence of the entry draft.
///
/// Every [`update`](Self::update) replaces the in-memory entries and reschedules
/// a single write after the debounce window, so only the latest value is ever
/// stored and only once edits pause. Must be used inside a tokio runtime.
pub struct DraftAutosave {
    store: Arc<dyn KeyValueStore>,
    debounce: Duration,
    entries: EntrySet,
    slot: DebounceSlot,
    last_saved_at: Arc<Mutex<Option<OffsetDateTime>>>,
    active: bool,
}

impl DraftAutosave {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &AutoSaveConfig) -> Self {
        Self {
            store,
            debounce: config.debounce(),
            entries: EntrySet::default(),
            slot: DebounceSlot::default(),
            last_saved_at: Arc::new(Mutex::new(None)),
            active: true,
        }
    }

    /// Loads a stored draft over the current entries. Returns whether one was used.
    ///
    /// A draft that fails to parse is logged and ignored; the defaults stay.
    pub fn restore(&mut self) -> bool {
        let Some(raw) = self.store.get(DRAFT_ENTRIES_KEY) else {
            return false;
        };
        match serde_json::from_str::<EntrySet>(&raw) {
            Ok(draft) => {
                tracing::info!("restored saved draft entries");
                self.entries = draft;
                true
            }
            Err(err) => {
                tracing::error!(?err, "error parsing saved entries");
                false
            }
        }
    }

    pub fn entries(&self) -> &EntrySet {
        &self.entries
    }

    pub fn update(&mut self, entries: EntrySet) {
        if !self.active {
            return;
        }
        self.entries = entries;
        self.schedule();
    }

    /// Replaces one entry by 1-based number. Unknown numbers are ignored.
    pub fn set_entry(&mut self, number: usize, text: &str) -> bool {
        let mut next = self.entries.clone();
        match next.entry_mut(number) {
            Some(slot) => *slot = text.to_string(),
            None => return false,
        }
        self.update(next);
        true
    }

    pub fn status(&self) -> AutoSaveStatus {
        if !self.active {
            return AutoSaveStatus::Inactive;
        }
        if let Some(since) = self.slot.pending_since() {
            return AutoSaveStatus::Pending { since };
        }
        AutoSaveStatus::Idle {
            last_saved_at: *self.last_saved_at.lock(),
        }
    }

    /// Cancels any pending write and stores the current entries right away.
    pub fn flush_now(&mut self) {
        self.slot.cancel();
        if let Some(json) = self.serialise() {
            self.store.set(DRAFT_ENTRIES_KEY, &json);
            *self.last_saved_at.lock() = Some(OffsetDateTime::now_utc());
        }
    }

    /// Waits for the pending write, if any, to land.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.slot.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    tracing::error!(?err, "draft autosave task failed");
                }
            }
        }
    }

    /// Teardown: the pending write is dropped and later updates are ignored.
    pub fn shutdown(&mut self) {
        if self.slot.cancel() {
            tracing::debug!("discarded pending draft write on teardown");
        }
        self.active = false;
    }

    fn schedule(&mut self) {
        let Some(json) = self.serialise() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let last_saved_at = Arc::clone(&self.last_saved_at);
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            store.set(DRAFT_ENTRIES_KEY, &json);
            *last_saved_at.lock() = Some(OffsetDateTime::now_utc());
            tracing::debug!("draft entries autosaved");
        });
        self.slot.arm(handle);
    }

    fn serialise(&self) -> Option<String> {
        match serde_json::to_string(&self.entries) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::error!(?err, "serialising draft entries");
                None
            }
        }
    }
}

impl Drop for DraftAutosave {
    fn drop(&mut self) {
        self.slot.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;
    use tokio::time::sleep;

    fn autosave(store: &Arc<MemoryStore>) -> DraftAutosave {
        DraftAutosave::new(store.clone(), &AutoSaveConfig { debounce_ms: 1000 })
    }

    fn draft_json(entries: &EntrySet) -> String {
        serde_json::to_string(entries).expect("serialisable entries")
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_write_once_with_the_last_value() {
        let store = Arc::new(MemoryStore::new());
        let mut autosave = autosave(&store);

        for text in ["I", "I h", "I ha", "I hav", "I have to pay rent in cash"] {
            autosave.set_entry(1, text);
            sleep(Duration::from_millis(150)).await;
        }
        assert!(store.writes_for(DRAFT_ENTRIES_KEY).is_empty());
        assert_matches!(autosave.status(), AutoSaveStatus::Pending { .. });

        sleep(Duration::from_millis(1000)).await;

        let expected = draft_json(&EntrySet::default().with_entry(1, "I have to pay rent in cash"));
        assert_eq!(store.writes_for(DRAFT_ENTRIES_KEY), vec![expected]);
        assert_matches!(
            autosave.status(),
            AutoSaveStatus::Idle {
                last_saved_at: Some(_)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_waits_for_a_full_quiet_period() {
        let store = Arc::new(MemoryStore::new());
        let mut autosave = autosave(&store);

        autosave.set_entry(2, "first");
        sleep(Duration::from_millis(900)).await;
        autosave.set_entry(2, "second");
        sleep(Duration::from_millis(900)).await;
        assert!(store.writes_for(DRAFT_ENTRIES_KEY).is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(store.writes_for(DRAFT_ENTRIES_KEY).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let mut autosave = autosave(&store);

        autosave.set_entry(1, "never stored");
        autosave.shutdown();
        sleep(Duration::from_millis(2000)).await;

        assert!(store.writes_for(DRAFT_ENTRIES_KEY).is_empty());
        assert_eq!(autosave.status(), AutoSaveStatus::Inactive);
        autosave.set_entry(1, "ignored after teardown");
        sleep(Duration::from_millis(2000)).await;
        assert!(store.writes_for(DRAFT_ENTRIES_KEY).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_cancels_pending_write() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut autosave = autosave(&store);
            autosave.set_entry(1, "dropped");
        }
        sleep(Duration::from_millis(2000)).await;
        assert!(store.writes_for(DRAFT_ENTRIES_KEY).is_empty());
    }

    #[tokio::test]
    async fn restore_replaces_defaults_entirely() {
        let store = Arc::new(MemoryStore::new());
        let saved = EntrySet::default()
            .with_entry(1, "saved one")
            .with_entry(5, "saved five");
        store.set(DRAFT_ENTRIES_KEY, &draft_json(&saved));

        let mut autosave = autosave(&store);
        assert!(autosave.restore());
        assert_eq!(autosave.entries(), &saved);
    }

    #[tokio::test]
    async fn unreadable_draft_keeps_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set(DRAFT_ENTRIES_KEY, r#"{"entry1":"partial"}"#);

        let mut autosave = autosave(&store);
        assert!(!autosave.restore());
        assert_eq!(autosave.entries(), &EntrySet::default());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_writes_immediately_and_cancels_timer() {
        let store = Arc::new(MemoryStore::new());
        let mut autosave = autosave(&store);

        autosave.set_entry(3, "flushed");
        autosave.flush_now();
        assert_eq!(store.writes_for(DRAFT_ENTRIES_KEY).len(), 1);

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(store.writes_for(DRAFT_ENTRIES_KEY).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_the_debounced_write() {
        let store = Arc::new(MemoryStore::new());
        let mut autosave = autosave(&store);

        autosave.set_entry(4, "settled");
        autosave.settle().await;
        let expected = draft_json(&EntrySet::default().with_entry(4, "settled"));
        assert_eq!(store.get(DRAFT_ENTRIES_KEY), Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_store_does_not_break_autosave() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let mut autosave = autosave(&store);

        autosave.set_entry(1, "lost");
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.writes_for(DRAFT_ENTRIES_KEY).len(), 1);
        store.set_unavailable(false);
        assert_eq!(store.get(DRAFT_ENTRIES_KEY), None);
    }
}

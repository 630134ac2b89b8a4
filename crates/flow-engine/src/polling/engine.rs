//! Deduplication of sampled items for one polling trigger instance
//!
//! A polling trigger only sees snapshots of "what is there now". The engine
//! keeps a durable cursor per trigger key and turns those snapshots into a
//! stream of new items:
//!
//! - `on_enable` records a baseline so history is never replayed
//! - `poll` returns items past the cursor (oldest first) and advances it
//! - `test` computes the same result without touching the cursor
//! - `on_disable` drops the cursor

use serde::{Deserialize, Serialize};

use crate::config::PollingConfig;
use crate::constants::defaults;
use crate::error::{FlowError, Result};
use crate::polling::source::{PollItem, PollingSource};
use crate::polling::store::{CursorStore, PollCursor};

/// How new items are told apart from seen ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DedupStrategy {
    /// Items are listed newest first; everything before the last seen id is new
    LastItem,
    /// Items carry a timestamp; everything newer than the last seen one is new
    Timebased,
}

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Polling state machine for one trigger instance
pub struct PollingDedupEngine<S, C> {
    trigger_key: String,
    strategy: DedupStrategy,
    source: S,
    store: C,
    clock: Box<dyn Clock>,
    sample_limit: usize,
}

impl<S: PollingSource, C: CursorStore> PollingDedupEngine<S, C> {
    pub fn new(trigger_key: impl Into<String>, strategy: DedupStrategy, source: S, store: C) -> Self {
        Self {
            trigger_key: trigger_key.into(),
            strategy,
            source,
            store,
            clock: Box::new(SystemClock),
            sample_limit: defaults::POLLING_SAMPLE_LIMIT,
        }
    }

    /// Replace the wall clock used for time-based baselines
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_config(mut self, config: &PollingConfig) -> Self {
        self.sample_limit = config.sample_limit;
        self
    }

    pub fn trigger_key(&self) -> &str {
        &self.trigger_key
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// The stored cursor, if the trigger is enabled
    pub async fn cursor(&self) -> Result<Option<PollCursor>> {
        self.store.get(&self.trigger_key).await
    }

    /// Record the baseline cursor. The baseline items themselves are discarded.
    pub async fn on_enable(&self) -> Result<()> {
        let items = self.list_items().await?;
        let cursor = match self.strategy {
            DedupStrategy::LastItem => PollCursor::LastItem {
                last_item_id: items.first().and_then(|item| item.id.clone()),
            },
            DedupStrategy::Timebased => PollCursor::Timebased {
                last_seen_epoch_ms: self.clock.now_ms(),
            },
        };
        log::info!(
            "Enabled polling trigger '{}' with baseline {:?} ({} items skipped)",
            self.trigger_key,
            cursor,
            items.len()
        );
        self.store.put(&self.trigger_key, cursor).await
    }

    pub async fn on_disable(&self) -> Result<()> {
        log::info!("Disabled polling trigger '{}'", self.trigger_key);
        self.store.delete(&self.trigger_key).await
    }

    /// Return the items that are new since the last poll, oldest first, and
    /// advance the cursor. A failing source leaves the cursor untouched.
    pub async fn poll(&self) -> Result<Vec<PollItem>> {
        let items = self.list_items().await?;
        let cursor = self.store.get(&self.trigger_key).await?;
        let (new_items, next) = self.compute(items, cursor);
        log::debug!(
            "Polled '{}': {} new items, cursor {:?}",
            self.trigger_key,
            new_items.len(),
            next
        );
        if let Some(next) = next {
            self.store.put(&self.trigger_key, next).await?;
        }
        Ok(new_items)
    }

    /// Sample what `poll` would return right now without advancing the cursor.
    ///
    /// At most `sample_limit` items are returned, keeping the newest.
    pub async fn test(&self) -> Result<Vec<PollItem>> {
        let items = self.list_items().await?;
        let cursor = self.store.get(&self.trigger_key).await?;
        let (mut new_items, _) = self.compute(items, cursor);
        let excess = new_items.len().saturating_sub(self.sample_limit);
        Ok(new_items.split_off(excess))
    }

    async fn list_items(&self) -> Result<Vec<PollItem>> {
        self.source.list_items().await.map_err(|e| {
            log::warn!("Polling source for '{}' failed: {}", self.trigger_key, e);
            match e {
                unavailable @ FlowError::SourceUnavailable(_) => unavailable,
                other => FlowError::source_unavailable(other),
            }
        })
    }

    /// New items and the cursor to store; `None` leaves the trigger without a cursor
    fn compute(
        &self,
        items: Vec<PollItem>,
        cursor: Option<PollCursor>,
    ) -> (Vec<PollItem>, Option<PollCursor>) {
        match self.strategy {
            DedupStrategy::LastItem => {
                let last_item_id = match cursor {
                    Some(PollCursor::LastItem { last_item_id }) => last_item_id,
                    other => self.mismatched(other),
                };
                let (new_items, next) = new_since_last_item(&self.trigger_key, items, last_item_id);
                (new_items, Some(next))
            }
            DedupStrategy::Timebased => {
                let last_seen = match cursor {
                    Some(PollCursor::Timebased { last_seen_epoch_ms }) => Some(last_seen_epoch_ms),
                    other => self.mismatched(other),
                };
                new_since_timestamp(&self.trigger_key, items, last_seen)
            }
        }
    }

    fn mismatched<T>(&self, cursor: Option<PollCursor>) -> Option<T> {
        if let Some(cursor) = cursor {
            log::warn!(
                "Ignoring {:?} cursor for {:?} trigger '{}'",
                cursor,
                self.strategy,
                self.trigger_key
            );
        }
        None
    }
}

/// Items are newest first. Without a usable cursor only the newest item is new.
fn new_since_last_item(
    trigger_key: &str,
    items: Vec<PollItem>,
    last_item_id: Option<String>,
) -> (Vec<PollItem>, PollCursor) {
    let position = last_item_id
        .as_deref()
        .and_then(|last| items.iter().position(|item| item.id.as_deref() == Some(last)));
    let next_id = items
        .first()
        .and_then(|item| item.id.clone())
        .or_else(|| last_item_id.clone());

    let candidates: Vec<PollItem> = match position {
        Some(end) => items.into_iter().take(end).collect(),
        None => items.into_iter().take(1).collect(),
    };

    let mut new_items: Vec<PollItem> = candidates
        .into_iter()
        .filter(|item| {
            if item.id.is_none() {
                log::warn!("Item without id skipped by '{}'", trigger_key);
            }
            item.id.is_some()
        })
        .collect();
    new_items.reverse();

    (new_items, PollCursor::LastItem { last_item_id: next_id })
}

/// Items newer than the cursor, oldest first. Without a cursor only the newest item is new.
fn new_since_timestamp(
    trigger_key: &str,
    items: Vec<PollItem>,
    last_seen: Option<i64>,
) -> (Vec<PollItem>, Option<PollCursor>) {
    let mut stamped: Vec<(i64, PollItem)> = items
        .into_iter()
        .filter_map(|item| match item.epoch_ms {
            Some(epoch_ms) => Some((epoch_ms, item)),
            None => {
                log::warn!("Item without timestamp skipped by '{}'", trigger_key);
                None
            }
        })
        .collect();
    stamped.sort_by_key(|(epoch_ms, _)| *epoch_ms);

    let Some(newest) = stamped.last().map(|(epoch_ms, _)| *epoch_ms) else {
        // Nothing stamped: keep whatever cursor there is, never invent one
        let cursor = last_seen.map(|last_seen_epoch_ms| PollCursor::Timebased { last_seen_epoch_ms });
        return (Vec::new(), cursor);
    };
    let threshold = last_seen.unwrap_or_else(|| newest.saturating_sub(1));

    let new_items = stamped
        .into_iter()
        .filter(|(epoch_ms, _)| *epoch_ms > threshold)
        .map(|(_, item)| item)
        .collect();
    let next = last_seen.map_or(newest, |last_seen| last_seen.max(newest));

    (new_items, Some(PollCursor::Timebased { last_seen_epoch_ms: next }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::store::InMemoryCursorStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    const KEY: &str = "flow-1:trigger";

    /// Source returning a scripted list, or failing on demand
    #[derive(Default)]
    struct ScriptedSource {
        items: Mutex<Vec<PollItem>>,
        failing: AtomicBool,
    }

    impl ScriptedSource {
        fn set(&self, items: Vec<PollItem>) {
            *self.items.lock().unwrap() = items;
        }

        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl PollingSource for ScriptedSource {
        async fn list_items(&self) -> Result<Vec<PollItem>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into());
            }
            Ok(self.items.lock().unwrap().clone())
        }
    }

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            self.0
        }
    }

    fn ids(ids: &[u32]) -> Vec<PollItem> {
        ids.iter()
            .map(|id| PollItem::with_id(id.to_string(), json!({ "id": id })))
            .collect()
    }

    fn epochs(epochs: &[i64]) -> Vec<PollItem> {
        epochs
            .iter()
            .map(|epoch| PollItem::with_epoch(*epoch, json!({ "at": epoch })))
            .collect()
    }

    fn item_ids(items: &[PollItem]) -> Vec<String> {
        items.iter().filter_map(|item| item.id.clone()).collect()
    }

    fn setup(
        strategy: DedupStrategy,
    ) -> (
        Arc<ScriptedSource>,
        PollingDedupEngine<Arc<ScriptedSource>, InMemoryCursorStore>,
    ) {
        let source = Arc::new(ScriptedSource::default());
        let engine = PollingDedupEngine::new(KEY, strategy, source.clone(), InMemoryCursorStore::new())
            .with_clock(FixedClock(50));
        (source, engine)
    }

    #[tokio::test]
    async fn test_last_item_sequence() {
        let (source, engine) = setup(DedupStrategy::LastItem);

        source.set(ids(&[3, 2, 1]));
        engine.on_enable().await.unwrap();
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::LastItem {
                last_item_id: Some("3".to_string())
            })
        );

        source.set(ids(&[5, 4, 3]));
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["4", "5"]);

        source.set(ids(&[5]));
        assert!(engine.poll().await.unwrap().is_empty());
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::LastItem {
                last_item_id: Some("5".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_last_item_stale_cursor_yields_newest_only() {
        let (source, engine) = setup(DedupStrategy::LastItem);
        source.set(ids(&[1]));
        engine.on_enable().await.unwrap();

        // The cursor item is gone from the listing
        source.set(ids(&[9, 8, 7]));
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["9"]);

        // An empty listing keeps the cursor
        source.set(Vec::new());
        assert!(engine.poll().await.unwrap().is_empty());
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::LastItem {
                last_item_id: Some("9".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_empty_baseline() {
        let (source, engine) = setup(DedupStrategy::LastItem);
        engine.on_enable().await.unwrap();
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::LastItem { last_item_id: None })
        );

        source.set(ids(&[2, 1]));
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["2"]);
    }

    #[tokio::test]
    async fn test_timebased_ratchet() {
        let (source, engine) = setup(DedupStrategy::Timebased);
        source.set(epochs(&[10, 20]));
        engine.on_enable().await.unwrap();
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::Timebased {
                last_seen_epoch_ms: 50
            })
        );

        source.set(epochs(&[200, 40, 100]));
        let new_items = engine.poll().await.unwrap();
        let stamps: Vec<i64> = new_items.iter().filter_map(|item| item.epoch_ms).collect();
        assert_eq!(stamps, vec![100, 200]);

        source.set(epochs(&[150]));
        assert!(engine.poll().await.unwrap().is_empty());
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::Timebased {
                last_seen_epoch_ms: 200
            })
        );
    }

    #[tokio::test]
    async fn test_items_without_key_are_never_new() {
        let (source, engine) = setup(DedupStrategy::Timebased);
        engine.on_enable().await.unwrap();

        source.set(vec![
            PollItem::with_id("no-stamp", json!({})),
            PollItem::with_epoch(60, json!({})),
        ]);
        let new_items = engine.poll().await.unwrap();
        assert_eq!(new_items.len(), 1);
        assert_eq!(new_items[0].epoch_ms, Some(60));
    }

    #[tokio::test]
    async fn test_is_idempotent_and_limited() {
        let (source, engine) = setup(DedupStrategy::LastItem);
        let engine = engine.with_config(&PollingConfig {
            sample_limit: 2,
            cursor_dir: None,
        });
        source.set(ids(&[1]));
        engine.on_enable().await.unwrap();

        source.set(ids(&[5, 4, 3, 2, 1]));
        let first = engine.test().await.unwrap();
        let second = engine.test().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(item_ids(&first), vec!["4", "5"]);

        // The cursor did not move, so poll still sees everything
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_source_failure_keeps_cursor() {
        let (source, engine) = setup(DedupStrategy::LastItem);
        source.set(ids(&[3, 2, 1]));
        engine.on_enable().await.unwrap();

        source.fail(true);
        let err = engine.poll().await.unwrap_err();
        assert!(matches!(err, FlowError::SourceUnavailable(_)));
        assert!(err.is_retryable());

        source.fail(false);
        source.set(ids(&[4, 3]));
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["4"]);
    }

    #[tokio::test]
    async fn test_disable_deletes_cursor() {
        let (_source, engine) = setup(DedupStrategy::Timebased);
        engine.on_enable().await.unwrap();
        assert!(engine.cursor().await.unwrap().is_some());

        engine.on_disable().await.unwrap();
        assert!(engine.cursor().await.unwrap().is_none());
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_mismatched_cursor_is_treated_as_missing() {
        let (source, engine) = setup(DedupStrategy::LastItem);
        engine
            .store()
            .put(KEY, PollCursor::Timebased { last_seen_epoch_ms: 1 })
            .await
            .unwrap();

        source.set(ids(&[3, 2]));
        assert_eq!(item_ids(&engine.poll().await.unwrap()), vec!["3"]);
    }

    #[tokio::test]
    async fn test_empty_poll_without_cursor_stores_nothing() {
        let (source, engine) = setup(DedupStrategy::Timebased);

        // Polled before enable: nothing listed, nothing stored
        assert!(engine.poll().await.unwrap().is_empty());
        assert!(engine.cursor().await.unwrap().is_none());

        source.set(epochs(&[100, 200, 300, 400, 500]));
        let new_items = engine.poll().await.unwrap();
        assert_eq!(new_items.len(), 1);
        assert_eq!(new_items[0].epoch_ms, Some(500));
        assert_eq!(
            engine.cursor().await.unwrap(),
            Some(PollCursor::Timebased {
                last_seen_epoch_ms: 500
            })
        );
    }
}

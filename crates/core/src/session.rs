//! Debounced write-behind session over a [`DrawingStore`].
//!
//! Mutations apply to the in-memory store immediately and mark the touched
//! ids dirty. A background task waits for a quiet period (500 ms by default)
//! and then pushes the dirty drawings to a [`DrawingPersistence`] in one
//! batch, so a burst of edits to one drawing produces a single write.
//!
//! Persistence failures are logged; the local state is not rolled back and the
//! failed change is not retried. Cancelling the session's token runs one last
//! flush before the task exits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::approval::ApprovalStatus;
use crate::dates;
use crate::drawing::{Drawing, DrawingPatch, Issue};
use crate::error::CoreError;
use crate::store::DrawingStore;
use crate::types::RecordId;

/// Quiet period before dirty drawings are flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Durable side of a session.
#[async_trait]
pub trait DrawingPersistence: Send + Sync + 'static {
    /// Upsert a batch of drawings.
    async fn save_drawings(&self, drawings: &[Drawing]) -> Result<(), CoreError>;

    /// Delete one drawing. Returns whether it existed.
    async fn delete_drawing(&self, id: &str) -> Result<bool, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Save,
    Delete,
}

#[derive(Default)]
struct State {
    store: DrawingStore,
    dirty: IndexMap<RecordId, Change>,
}

struct Inner {
    state: Mutex<State>,
    changed: Notify,
    persistence: Arc<dyn DrawingPersistence>,
    debounce: Duration,
}

/// Counts from one flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl Inner {
    /// Run `mutate` against the store and, when it touched a drawing, mark `id`
    /// dirty while the same lock is held. The flush task is woken only after
    /// the lock is released.
    async fn apply<T>(
        &self,
        id: &str,
        change: Change,
        mutate: impl FnOnce(&mut DrawingStore) -> Result<Option<T>, CoreError>,
    ) -> Result<Option<T>, CoreError> {
        let touched = {
            let mut state = self.state.lock().await;
            let touched = mutate(&mut state.store)?;
            if touched.is_some() {
                state.dirty.insert(RecordId::from(id), change);
            }
            touched
        };
        if touched.is_some() {
            self.changed.notify_one();
        }
        Ok(touched)
    }

    /// Push every dirty change. The state lock is released before any
    /// persistence call so local edits are never blocked on storage.
    async fn flush(&self) -> FlushReport {
        let (saves, deletes) = {
            let mut state = self.state.lock().await;
            let dirty = std::mem::take(&mut state.dirty);
            let mut saves = Vec::new();
            let mut deletes = Vec::new();
            for (id, change) in dirty {
                match change {
                    Change::Save => {
                        if let Some(d) = state.store.get(&id) {
                            saves.push(d.clone());
                        }
                    }
                    Change::Delete => deletes.push(id),
                }
            }
            (saves, deletes)
        };

        let mut report = FlushReport::default();

        if !saves.is_empty() {
            match self.persistence.save_drawings(&saves).await {
                Ok(()) => report.saved = saves.len(),
                Err(e) => {
                    report.failed += saves.len();
                    tracing::error!(error = %e, count = saves.len(), "Failed to save drawings");
                }
            }
        }

        for id in deletes {
            match self.persistence.delete_drawing(&id).await {
                Ok(_) => report.deleted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(error = %e, id = %id, "Failed to delete drawing");
                }
            }
        }

        if report != FlushReport::default() {
            tracing::debug!(
                saved = report.saved,
                deleted = report.deleted,
                failed = report.failed,
                "Drawing session flushed"
            );
        }
        report
    }

    /// Background loop: wait for a change, wait out the quiet period, flush.
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.changed.notified() => {
                    // Each further change restarts the quiet period.
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(self.debounce) => break,
                            _ = self.changed.notified() => continue,
                        }
                    }
                    self.flush().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                }
            }
        }

        self.flush().await;
        tracing::info!("Drawing session stopped");
    }
}

/// Optimistic local drawing state with debounced persistence.
pub struct DrawingSession {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DrawingSession {
    /// Start a session seeded with `initial` (usually the drawings loaded
    /// from storage). Must be called inside a Tokio runtime.
    pub fn start(
        persistence: Arc<dyn DrawingPersistence>,
        initial: Vec<Drawing>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                store: DrawingStore::from_drawings(initial),
                dirty: IndexMap::new(),
            }),
            changed: Notify::new(),
            persistence,
            debounce,
        });
        let task = tokio::spawn(Arc::clone(&inner).run(cancel.clone()));
        Self {
            inner,
            cancel,
            task,
        }
    }

    pub async fn get(&self, id: &str) -> Option<Drawing> {
        self.inner.state.lock().await.store.get(id).cloned()
    }

    /// Snapshot of all drawings in insertion order.
    pub async fn drawings(&self) -> Vec<Drawing> {
        self.inner.state.lock().await.store.iter().cloned().collect()
    }

    pub async fn count(&self, status: Option<ApprovalStatus>) -> usize {
        self.inner.state.lock().await.store.count(status)
    }

    pub async fn create(&self, drawing: Drawing) -> Result<Drawing, CoreError> {
        let id = drawing.id.clone();
        let created = self
            .inner
            .apply(&id, Change::Save, |store| store.create(drawing).map(|d| Some(d.clone())))
            .await?;
        created.ok_or_else(|| CoreError::drawing_not_found(id))
    }

    pub async fn update(&self, id: &str, patch: DrawingPatch) -> Result<Option<Drawing>, CoreError> {
        self.inner
            .apply(id, Change::Save, |store| {
                Ok(store.update(id, patch, dates::now())?.cloned())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.inner
            .apply(id, Change::Delete, |store| Ok(store.delete(id)))
            .await
            .is_ok_and(|removed| removed.is_some())
    }

    pub async fn set_approval(
        &self,
        id: &str,
        status: ApprovalStatus,
        reviewer: &str,
        notes: Option<String>,
    ) -> Option<Drawing> {
        self.inner
            .apply(id, Change::Save, |store| {
                Ok(store
                    .set_approval(id, status, reviewer, notes, dates::now())
                    .cloned())
            })
            .await
            .ok()
            .flatten()
    }

    pub async fn report_issue(&self, id: &str, issue: Issue) -> Option<Drawing> {
        self.inner
            .apply(id, Change::Save, |store| {
                Ok(store.report_issue(id, issue, dates::now()).cloned())
            })
            .await
            .ok()
            .flatten()
    }

    pub async fn resolve_issue(&self, id: &str) -> Option<Drawing> {
        self.inner
            .apply(id, Change::Save, |store| {
                Ok(store.resolve_issue(id, dates::now()).cloned())
            })
            .await
            .ok()
            .flatten()
    }

    /// Flush immediately without waiting for the quiet period.
    pub async fn flush_now(&self) -> FlushReport {
        self.inner.flush().await
    }

    /// Stop the background task after a final flush.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Drawing session task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::test_support::drawing_with;
    use crate::geometry::{Coordinates, GeometryKind};

    #[derive(Default)]
    struct Recorder {
        saves: std::sync::Mutex<Vec<Vec<Drawing>>>,
        deletes: std::sync::Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn save_batches(&self) -> Vec<Vec<Drawing>> {
            self.saves.lock().unwrap().clone()
        }

        fn deleted(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DrawingPersistence for Recorder {
        async fn save_drawings(&self, drawings: &[Drawing]) -> Result<(), CoreError> {
            self.saves.lock().unwrap().push(drawings.to_vec());
            if self.fail {
                return Err(CoreError::Internal("storage offline".into()));
            }
            Ok(())
        }

        async fn delete_drawing(&self, id: &str) -> Result<bool, CoreError> {
            self.deletes.lock().unwrap().push(id.to_string());
            Ok(true)
        }
    }

    fn point(id: &str) -> Drawing {
        drawing_with(id, GeometryKind::Point, Coordinates::Point([1.0, 2.0]))
    }

    fn rename(name: &str) -> DrawingPatch {
        DrawingPatch {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn start(recorder: &Arc<Recorder>, initial: Vec<Drawing>) -> DrawingSession {
        let persistence: Arc<dyn DrawingPersistence> = recorder.clone();
        DrawingSession::start(persistence, initial, DEFAULT_DEBOUNCE, CancellationToken::new())
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn edits_within_window_coalesce_into_one_write() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![point("a")]);

        session.update("a", rename("one")).await.unwrap();
        advance(100).await;
        session.update("a", rename("two")).await.unwrap();
        advance(100).await;
        session.update("a", rename("three")).await.unwrap();

        advance(300).await;
        assert!(recorder.save_batches().is_empty(), "flushed before quiet period");

        advance(400).await;
        let batches = recorder.save_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].name, "three");

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn local_state_is_immediate() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![]);

        session.create(point("a")).await.unwrap();

        assert_eq!(session.count(None).await, 1);
        assert!(session.get("a").await.is_some());
        assert!(recorder.save_batches().is_empty());

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn create_then_delete_in_window_sends_delete_only() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![]);

        session.create(point("a")).await.unwrap();
        assert!(session.delete("a").await);
        advance(600).await;

        assert!(recorder.save_batches().is_empty());
        assert_eq!(recorder.deleted(), vec!["a".to_string()]);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_changes() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![point("a")]);

        session
            .set_approval("a", ApprovalStatus::Approved, "admin", None)
            .await
            .unwrap();
        session.shutdown().await;

        let batches = recorder.save_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].approval_status, ApprovalStatus::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_local_state_and_is_not_retried() {
        let recorder = Arc::new(Recorder::failing());
        let session = start(&recorder, vec![]);

        session.create(point("a")).await.unwrap();
        advance(600).await;
        advance(2_000).await;

        assert_eq!(recorder.save_batches().len(), 1);
        assert!(session.get("a").await.is_some());

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ids_are_not_marked_dirty() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![]);

        assert!(session.update("nope", rename("x")).await.unwrap().is_none());
        assert!(!session.delete("nope").await);
        assert!(session.resolve_issue("nope").await.is_none());

        let report = session.flush_now().await;
        assert_eq!(report, FlushReport::default());

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn flush_now_reports_counts() {
        let recorder = Arc::new(Recorder::default());
        let session = start(&recorder, vec![point("a"), point("b")]);

        session.update("a", rename("A")).await.unwrap();
        session.delete("b").await;

        let report = session.flush_now().await;
        assert_eq!(
            report,
            FlushReport {
                saved: 1,
                deleted: 1,
                failed: 0
            }
        );

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_update_and_delete_still_deletes() {
        let recorder = Arc::new(Recorder::default());
        let session = Arc::new(start(&recorder, vec![point("a")]));

        let updater = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.update("a", rename("late")).await })
        };
        let deleter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.delete("a").await })
        };
        updater.await.unwrap().unwrap();
        assert!(deleter.await.unwrap());

        let report = session.flush_now().await;
        assert_eq!(report.deleted, 1);
        assert_eq!(recorder.deleted(), vec!["a".to_string()]);
        assert!(recorder.save_batches().is_empty());

        let Ok(session) = Arc::try_unwrap(session) else {
            panic!("session still shared");
        };
        session.shutdown().await;
    }
}

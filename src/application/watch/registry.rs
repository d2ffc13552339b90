use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, mapref::entry::Entry};
use metrics::{counter, gauge};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::render::RenderPipeline;
use crate::application::watch::detector::ChangeDetector;
use crate::application::watch::source::{TextBinding, TextSource};
use crate::domain::mount::MountId;

pub(crate) const METRIC_WATCH_TICKS_TOTAL: &str = "markpane_watch_ticks_total";
pub(crate) const METRIC_WATCHERS_ACTIVE: &str = "markpane_watchers_active";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("invalid poll interval: {reason}")]
    InvalidInterval { reason: String },
    #[error("watchers must be started from within a tokio runtime")]
    NoRuntime,
}

/// How a watcher learns about new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Poll(Duration),
    Binding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Started,
    /// A live watcher already exists for the mount; nothing was started.
    AlreadyWatching,
}

struct WatchHandle {
    task: JoinHandle<()>,
    mode: WatchMode,
}

type WatchTable = DashMap<MountId, WatchHandle>;

/// Keeps mount points in sync with changing text.
///
/// At most one watcher runs per mount. Each watcher renders the first text it
/// sees and then only text that differs from what it rendered last. Watchers
/// stop on [`unwatch`](Self::unwatch), on [`shutdown`](Self::shutdown), and
/// when the `ChangeWatcher` is dropped. A render already started when its
/// watcher stops still runs to completion.
pub struct ChangeWatcher {
    pipeline: Arc<RenderPipeline>,
    watchers: Arc<WatchTable>,
}

impl ChangeWatcher {
    pub fn new(pipeline: Arc<RenderPipeline>) -> Self {
        Self {
            pipeline,
            watchers: Arc::new(DashMap::new()),
        }
    }

    pub fn pipeline(&self) -> &Arc<RenderPipeline> {
        &self.pipeline
    }

    /// Poll `source` every `poll_interval` and re-render `mount_id` on change.
    pub fn watch<S>(
        &self,
        mount_id: MountId,
        source: S,
        poll_interval: Duration,
    ) -> Result<WatchStatus, WatchError>
    where
        S: TextSource,
    {
        if poll_interval.is_zero() {
            return Err(WatchError::InvalidInterval {
                reason: "must be greater than zero".to_string(),
            });
        }

        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let pipeline = Arc::clone(&self.pipeline);
        let watched = WatchedValue::new(mount_id.clone());

        Ok(self.register(mount_id, WatchMode::Poll(poll_interval), || {
            runtime.spawn(poll_loop(pipeline, watched, source, poll_interval))
        }))
    }

    /// Re-render `mount_id` whenever `binding` is set to a new value.
    pub fn watch_binding(
        &self,
        mount_id: MountId,
        binding: &TextBinding,
    ) -> Result<WatchStatus, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let pipeline = Arc::clone(&self.pipeline);
        let watched = WatchedValue::new(mount_id.clone());
        let receiver = binding.subscribe();

        Ok(self.register(mount_id, WatchMode::Binding, || {
            runtime.spawn(binding_loop(pipeline, watched, receiver))
        }))
    }

    /// Stop the watcher for `mount_id`. Returns false when none was running.
    pub fn unwatch(&self, mount_id: &MountId) -> bool {
        let stopped = stop(&self.watchers, mount_id);
        if stopped {
            info!(
                target = "markpane::watch",
                mount_id = %mount_id,
                "Watcher stopped"
            );
        }
        stopped
    }

    /// Stop every watcher.
    pub fn shutdown(&self) {
        let mount_ids: Vec<MountId> = self
            .watchers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for mount_id in &mount_ids {
            stop(&self.watchers, mount_id);
        }
        if !mount_ids.is_empty() {
            info!(
                target = "markpane::watch",
                stopped = mount_ids.len(),
                "Watchers shut down"
            );
        }
    }

    pub fn is_watching(&self, mount_id: &MountId) -> bool {
        self.watchers
            .get(mount_id)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    pub fn mode(&self, mount_id: &MountId) -> Option<WatchMode> {
        self.watchers.get(mount_id).map(|handle| handle.mode)
    }

    pub fn active_count(&self) -> usize {
        self.watchers
            .iter()
            .filter(|entry| !entry.task.is_finished())
            .count()
    }

    /// Handle that stops the watcher for `mount_id` when dropped.
    pub fn guard(&self, mount_id: MountId) -> WatchGuard {
        WatchGuard {
            mount_id,
            watchers: Arc::clone(&self.watchers),
        }
    }

    fn register<F>(&self, mount_id: MountId, mode: WatchMode, spawn: F) -> WatchStatus
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let status = match self.watchers.entry(mount_id.clone()) {
            Entry::Occupied(occupied) if !occupied.get().task.is_finished() => {
                debug!(
                    target = "markpane::watch",
                    mount_id = %mount_id,
                    "Watcher already running"
                );
                WatchStatus::AlreadyWatching
            }
            Entry::Occupied(mut finished) => {
                finished.insert(WatchHandle {
                    task: spawn(),
                    mode,
                });
                WatchStatus::Started
            }
            Entry::Vacant(vacant) => {
                vacant.insert(WatchHandle {
                    task: spawn(),
                    mode,
                });
                WatchStatus::Started
            }
        };

        if status == WatchStatus::Started {
            info!(
                target = "markpane::watch",
                mount_id = %mount_id,
                mode = ?mode,
                "Watcher started"
            );
        }
        record_active(&self.watchers);
        status
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Stops one watcher on drop, for hosts that tie a watcher to a UI lifetime.
pub struct WatchGuard {
    mount_id: MountId,
    watchers: Arc<WatchTable>,
}

impl WatchGuard {
    pub fn mount_id(&self) -> &MountId {
        &self.mount_id
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        stop(&self.watchers, &self.mount_id);
    }
}

fn stop(watchers: &WatchTable, mount_id: &MountId) -> bool {
    let removed = watchers.remove(mount_id);
    let stopped = match removed {
        Some((_, handle)) => {
            handle.task.abort();
            true
        }
        None => false,
    };
    record_active(watchers);
    stopped
}

fn record_active(watchers: &WatchTable) {
    gauge!(METRIC_WATCHERS_ACTIVE).set(watchers.len() as f64);
}

/// Per-watcher state: which mount it feeds and what it rendered last.
struct WatchedValue {
    mount_id: MountId,
    detector: ChangeDetector,
}

impl WatchedValue {
    fn new(mount_id: MountId) -> Self {
        Self {
            mount_id,
            detector: ChangeDetector::new(),
        }
    }

    /// Each render runs in its own task; stopping the watcher lets it finish.
    async fn observe(&mut self, pipeline: &Arc<RenderPipeline>, text: &str) {
        if !self.detector.observe(text) {
            counter!(METRIC_WATCH_TICKS_TOTAL, "result" => "unchanged").increment(1);
            return;
        }

        counter!(METRIC_WATCH_TICKS_TOTAL, "result" => "changed").increment(1);
        let pipeline = Arc::clone(pipeline);
        let mount_id = self.mount_id.clone();
        let text = text.to_string();
        let render = tokio::spawn(async move { pipeline.render(&mount_id, &text).await });

        match render.await {
            Ok(outcome) => debug!(
                target = "markpane::watch",
                mount_id = %self.mount_id,
                outcome = outcome.as_str(),
                "Change rendered"
            ),
            Err(err) => warn!(
                target = "markpane::watch",
                mount_id = %self.mount_id,
                error = %err,
                "Render task failed"
            ),
        }
    }
}

async fn poll_loop<S>(
    pipeline: Arc<RenderPipeline>,
    mut watched: WatchedValue,
    source: S,
    poll_interval: Duration,
) where
    S: TextSource,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match source.read() {
            Some(text) => watched.observe(&pipeline, &text).await,
            None => {
                counter!(METRIC_WATCH_TICKS_TOTAL, "result" => "unavailable").increment(1);
            }
        }
    }
}

async fn binding_loop(
    pipeline: Arc<RenderPipeline>,
    mut watched: WatchedValue,
    mut receiver: watch::Receiver<String>,
) {
    loop {
        let text = receiver.borrow_and_update().clone();
        watched.observe(&pipeline, &text).await;

        if receiver.changed().await.is_err() {
            debug!(
                target = "markpane::watch",
                mount_id = %watched.mount_id,
                "Binding dropped; watcher exiting"
            );
            break;
        }
    }
}

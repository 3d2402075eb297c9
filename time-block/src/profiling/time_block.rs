//! `TimeBlock`: one measurement session
//!
//! Owns the per-context stacks and the stats table, plus the collaborators a
//! scope talks to (memory reader, notice sink, release hook). Instances are
//! independent; the crate root also exposes a lazily-built global one.

use serde::{Deserialize, Serialize};
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, warn};

use super::{
    call_wrapper::Decor,
    context_stack::{ContextStacks, StackEntry, within},
    memory::{MemoryReader, ProcessMemory, ReleaseHook, release_free_memory},
    notice::{NoticeSink, TracingSink},
    report,
    scope::ScopeGuard,
    stats_store::{StatsSnapshot, StatsStore},
};
use crate::{
    config::{ScopeOptions, TimeBlockConfig},
    error::TimeBlockError,
};

/// Root label used when none is configured: empty on the main thread,
/// `Thread <name>` anywhere else.
pub fn default_root_label() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some("main") => String::new(),
        Some(name) => format!("Thread {name}"),
        None => format!("Thread {:?}", thread.id()),
    }
}

/// Transferable copy of a `TimeBlock`'s state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlockState {
    pub config: TimeBlockConfig,
    /// Root label as resolved by the source instance
    pub root_label: String,
    pub stats: StatsSnapshot,
    /// Stacks of contexts that had open scopes when the state was taken
    pub stacks: Vec<StackEntry>,
}

impl TimeBlockState {
    pub fn to_json(&self) -> Result<String, TimeBlockError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, TimeBlockError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, TimeBlockError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, TimeBlockError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Builder for a `TimeBlock` with non-default collaborators.
pub struct TimeBlockBuilder {
    config: TimeBlockConfig,
    memory: Option<Arc<dyn MemoryReader>>,
    sink: Option<Arc<dyn NoticeSink>>,
    release: Option<Arc<ReleaseHook>>,
}

impl TimeBlockBuilder {
    #[must_use]
    pub fn config(mut self, config: TimeBlockConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn memory_reader<M: MemoryReader + 'static>(mut self, reader: M) -> Self {
        self.memory = Some(Arc::new(reader));
        self
    }

    #[must_use]
    pub fn notice_sink<S: NoticeSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn release_hook<F: Fn() + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.release = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> TimeBlock {
        let root_label = self
            .config
            .root_label
            .clone()
            .unwrap_or_else(default_root_label);
        debug!(
            "Creating TimeBlock (root label {:?}, task roots: {})",
            root_label, self.config.root_from_task
        );

        TimeBlock {
            stacks: ContextStacks::new(root_label, self.config.root_from_task),
            stats: StatsStore::new(),
            memory: self
                .memory
                .unwrap_or_else(|| Arc::new(ProcessMemory::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink::default())),
            release: self
                .release
                .unwrap_or_else(|| Arc::new(release_free_memory)),
            notices: AtomicBool::new(self.config.notices),
            config: self.config,
        }
    }
}

/// A measurement session: context stacks plus the path-keyed stats table.
pub struct TimeBlock {
    config: TimeBlockConfig,
    stacks: ContextStacks,
    stats: StatsStore,
    memory: Arc<dyn MemoryReader>,
    sink: Arc<dyn NoticeSink>,
    release: Arc<ReleaseHook>,
    notices: AtomicBool,
}

impl Default for TimeBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeBlock {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: TimeBlockConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> TimeBlockBuilder {
        TimeBlockBuilder {
            config: TimeBlockConfig::default(),
            memory: None,
            sink: None,
            release: None,
        }
    }

    pub fn config(&self) -> &TimeBlockConfig {
        &self.config
    }

    pub fn stacks(&self) -> &ContextStacks {
        &self.stacks
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    // ---- scopes -------------------------------------------------------------

    /// Open a scope with the instance's default options.
    pub fn enter<S: Into<String>>(&self, label: S) -> ScopeGuard<'_> {
        self.enter_with(label, self.config.scope)
    }

    pub fn enter_with<S: Into<String>>(&self, label: S, options: ScopeOptions) -> ScopeGuard<'_> {
        ScopeGuard::open(self, label.into(), options)
    }

    /// Measure `f` under `label` and return its value.
    ///
    /// A panic inside `f` is recorded as a failed sample and keeps unwinding.
    pub fn ctx<S, R, F>(&self, label: S, f: F) -> R
    where
        S: Into<String>,
        F: FnOnce() -> R,
    {
        self.ctx_with(label, self.config.scope, f)
    }

    pub fn ctx_with<S, R, F>(&self, label: S, options: ScopeOptions, f: F) -> R
    where
        S: Into<String>,
        F: FnOnce() -> R,
    {
        let _guard = self.enter_with(label, options);
        f()
    }

    /// Like [`ctx`](Self::ctx), and an `Err` from `f` is marked `(err)`.
    pub fn try_ctx<S, T, E, F>(&self, label: S, f: F) -> Result<T, E>
    where
        S: Into<String>,
        F: FnOnce() -> Result<T, E>,
    {
        self.try_ctx_with(label, self.config.scope, f)
    }

    pub fn try_ctx_with<S, T, E, F>(&self, label: S, options: ScopeOptions, f: F) -> Result<T, E>
    where
        S: Into<String>,
        F: FnOnce() -> Result<T, E>,
    {
        let mut guard = self.enter_with(label, options);
        let out = f();
        if out.is_err() {
            guard.mark_failed();
        }
        out
    }

    /// Measure a future under `label`, wall-clock, across every suspension.
    ///
    /// The scope opens on first poll, nested under whatever scope is open
    /// there, and runs in a context of its own. Futures measured side by side
    /// (`join!`, `select!`, separate tasks) never see each other's labels.
    pub async fn actx<S, F>(&self, label: S, fut: F) -> F::Output
    where
        S: Into<String>,
        F: Future,
    {
        self.actx_with(label, self.config.scope, fut).await
    }

    pub async fn actx_with<S, F>(&self, label: S, options: ScopeOptions, fut: F) -> F::Output
    where
        S: Into<String>,
        F: Future,
    {
        let context = self.stacks.fork();
        within(context, async move {
            let _guard = ScopeGuard::open_forked(self, context, label.into(), options);
            fut.await
        })
        .await
    }

    pub async fn try_actx<S, F, T, E>(&self, label: S, fut: F) -> Result<T, E>
    where
        S: Into<String>,
        F: Future<Output = Result<T, E>>,
    {
        self.try_actx_with(label, self.config.scope, fut).await
    }

    pub async fn try_actx_with<S, F, T, E>(
        &self,
        label: S,
        options: ScopeOptions,
        fut: F,
    ) -> Result<T, E>
    where
        S: Into<String>,
        F: Future<Output = Result<T, E>>,
    {
        let context = self.stacks.fork();
        within(context, async move {
            let mut guard = ScopeGuard::open_forked(self, context, label.into(), options);
            let out = fut.await;
            if out.is_err() {
                guard.mark_failed();
            }
            out
        })
        .await
    }

    /// Function-call wrapper using `options`.
    pub fn decor(&self, options: ScopeOptions) -> Decor<'_> {
        Decor::new(self, options)
    }

    // ---- stats --------------------------------------------------------------

    /// Consistent deep copy of all samples.
    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Aggregate samples taken by another instance.
    pub fn add_stats(&self, other: &StatsSnapshot) {
        self.stats.merge(other);
    }

    pub fn clear(&self) {
        self.stats.clear();
    }

    pub fn format_stats(&self) -> String {
        report::format_stats(&self.get_stats())
    }

    pub fn print_stats(&self) {
        println!("{}", self.format_stats());
    }

    // ---- notices ------------------------------------------------------------

    pub fn enable_notices(&self) {
        self.notices.store(true, Ordering::Relaxed);
    }

    pub fn disable_notices(&self) {
        self.notices.store(false, Ordering::Relaxed);
    }

    pub fn notices_enabled(&self) -> bool {
        self.notices.load(Ordering::Relaxed)
    }

    // ---- state transfer -----------------------------------------------------

    pub fn state(&self) -> TimeBlockState {
        TimeBlockState {
            config: self.config.clone(),
            root_label: self.stacks.root_label().to_string(),
            stats: self.stats.snapshot(),
            stacks: self.stacks.snapshot(),
        }
    }

    /// Replace this instance's stats and stacks with `state`'s.
    pub fn load_state(&self, state: TimeBlockState) {
        self.stats.restore(state.stats);
        self.stacks.restore(state.stacks);
    }

    /// Rebuild an instance from `state` with default collaborators.
    pub fn restore(state: TimeBlockState) -> Self {
        let mut config = state.config.clone();
        config.root_label = Some(state.root_label.clone());
        let tb = Self::with_config(config);
        tb.load_state(state);
        tb
    }

    // ---- collaborators ------------------------------------------------------

    pub(crate) fn emit(&self, line: &str) {
        if self.notices_enabled() {
            self.sink.notice(line);
        }
    }

    pub(crate) fn read_memory(&self) -> Option<u64> {
        match self.memory.resident_bytes() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Memory reading failed: {}", e);
                None
            }
        }
    }

    pub(crate) fn release_memory(&self) {
        (self.release)();
    }
}

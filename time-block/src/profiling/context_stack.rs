//! Per-execution-context label stacks
//!
//! A context is, in order of preference: the measured future currently being
//! polled (set up by `fork` and `within`), the running tokio task, or the OS
//! thread. Each context owns one stack, created lazily as `[root_label]` and
//! dropped again once its last scope has exited. Stacks live in a sharded map
//! keyed by context, so contexts never see each other's labels. Futures that
//! are joined or selected inside one task still get a stack each, and a task
//! keeps its stack when the runtime moves it to another worker thread.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::{
    cell::Cell,
    future::Future,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::error;

use super::stats_store::{CallPath, PATH_SEPARATOR};

static NEXT_THREAD_SLOT: AtomicU64 = AtomicU64::new(1);
static NEXT_FORK: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_SLOT: Cell<u64> = const { Cell::new(0) };
}

tokio::task_local! {
    static FORKED_CONTEXT: u64;
}

/// Identity of a logical line of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKey {
    /// A plain OS thread, numbered in order of first use
    Thread(u64),
    /// A tokio task, by a hash of its runtime-wide id
    Task(u64),
    /// One measured future, forked from whichever context first polled it
    Fork(u64),
}

impl ContextKey {
    /// Resolve the calling context. Outside a measured future or a tokio
    /// task this falls back to the thread bucket.
    pub fn current() -> Self {
        if let Ok(id) = FORKED_CONTEXT.try_with(|id| *id) {
            return Self::Fork(id);
        }
        match tokio::task::try_id() {
            Some(id) => Self::Task(task_slot(id)),
            None => Self::Thread(thread_slot()),
        }
    }
}

fn thread_slot() -> u64 {
    THREAD_SLOT.with(|slot| {
        if slot.get() == 0 {
            slot.set(NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed));
        }
        slot.get()
    })
}

fn task_slot(id: tokio::task::Id) -> u64 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Poll `fut` with `key` as its context. Non-fork keys run `fut` unchanged.
pub fn within<F: Future>(key: ContextKey, fut: F) -> impl Future<Output = F::Output> {
    let id = match key {
        ContextKey::Fork(id) => Some(id),
        ContextKey::Thread(_) | ContextKey::Task(_) => None,
    };
    async move {
        match id {
            Some(id) => FORKED_CONTEXT.scope(id, fut).await,
            None => fut.await,
        }
    }
}

/// Name of the running tokio task, if any.
pub fn current_task_name() -> Option<String> {
    tokio::task::try_id().map(|id| format!("Task-{id}"))
}

/// Serializable copy of one live stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry {
    pub context: ContextKey,
    pub labels: Vec<String>,
}

/// Map from context to its label stack.
#[derive(Debug)]
pub struct ContextStacks {
    stacks: DashMap<ContextKey, Vec<String>>,
    root_label: String,
    root_from_task: bool,
}

impl ContextStacks {
    pub fn new<S: Into<String>>(root_label: S, root_from_task: bool) -> Self {
        Self {
            stacks: DashMap::new(),
            root_label: root_label.into(),
            root_from_task,
        }
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    fn initial_stack(&self) -> Vec<String> {
        let root = if self.root_from_task {
            current_task_name().unwrap_or_else(|| self.root_label.clone())
        } else {
            self.root_label.clone()
        };
        vec![root]
    }

    /// Push `label` onto the calling context's stack.
    ///
    /// Returns the resolved context, which the matching `pop` must use, and
    /// the whole stack joined for display (root included).
    pub fn push(&self, label: &str) -> (ContextKey, String) {
        let key = ContextKey::current();
        (key, self.push_to(key, label))
    }

    /// Push `label` onto `key`'s stack and return the joined stack.
    pub fn push_to(&self, key: ContextKey, label: &str) -> String {
        let mut stack = self
            .stacks
            .entry(key)
            .or_insert_with(|| self.initial_stack());
        stack.push(label.to_string());
        stack.join(PATH_SEPARATOR)
    }

    /// Open a new context whose stack starts as a copy of the caller's.
    ///
    /// Run the forked work through [`within`] and drop the context with
    /// [`release`](Self::release) once it is done.
    pub fn fork(&self) -> ContextKey {
        let base = self.current();
        let key = ContextKey::Fork(NEXT_FORK.fetch_add(1, Ordering::Relaxed));
        self.stacks.insert(key, base);
        key
    }

    pub fn release(&self, key: ContextKey) {
        self.stacks.remove(&key);
    }

    /// The recorded path of `key`'s stack: every label but the root.
    pub fn path(&self, key: ContextKey) -> CallPath {
        self.stacks
            .get(&key)
            .map(|stack| CallPath::new(stack.iter().skip(1).cloned()))
            .unwrap_or_default()
    }

    /// Pop `label` from `key`'s stack.
    ///
    /// # Panics
    /// If `label` is not on top. Scopes closed out of order are a bug in the
    /// caller; while already unwinding the mismatch is only logged.
    pub fn pop(&self, key: ContextKey, label: &str) {
        let top = match self.stacks.get_mut(&key) {
            Some(mut stack) if stack.len() > 1 => stack.pop(),
            _ => None,
        };
        self.stacks.remove_if(&key, |_, stack| stack.len() <= 1);

        if top.as_deref() != Some(label) {
            if std::thread::panicking() {
                error!("scope `{}` exited out of order (top was {:?})", label, top);
            } else {
                panic!("scope `{label}` exited out of order (top was {top:?})");
            }
        }
    }

    /// Labels of the calling context's stack, root included.
    pub fn current(&self) -> Vec<String> {
        self.stacks
            .get(&ContextKey::current())
            .map(|stack| stack.value().clone())
            .unwrap_or_else(|| self.initial_stack())
    }

    /// Copy of every live stack.
    pub fn snapshot(&self) -> Vec<StackEntry> {
        self.stacks
            .iter()
            .map(|entry| StackEntry {
                context: *entry.key(),
                labels: entry.value().clone(),
            })
            .collect()
    }

    /// Replace all stacks with `entries`.
    pub fn restore(&self, entries: Vec<StackEntry>) {
        self.stacks.clear();
        for entry in entries {
            self.stacks.insert(entry.context, entry.labels);
        }
    }

    /// Number of contexts with an open scope.
    pub fn active_contexts(&self) -> usize {
        self.stacks.len()
    }
}

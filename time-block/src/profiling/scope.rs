//! RAII measurement scope
//!
//! Opening a [`ScopeGuard`] pushes its label and starts the clocks; dropping
//! it, on any exit path including unwinding, records the sample and pops the
//! label. A guard that is dropped while its thread panics, or that was
//! [`mark_failed`](ScopeGuard::mark_failed), is reported with `(err)`.

use std::time::Instant;
use tracing::warn;

use super::{
    context_stack::ContextKey,
    stats_store::{CallPath, Sample},
    time_block::TimeBlock,
};
use crate::{config::ScopeOptions, util::humanize::human_readable_delta};

/// An open measurement scope. Closes when dropped.
#[must_use = "the scope is measured until the guard is dropped"]
pub struct ScopeGuard<'a> {
    tb: &'a TimeBlock,
    context: ContextKey,
    label: String,
    joined: String,
    options: ScopeOptions,
    start: Instant,
    start_mem: Option<u64>,
    failed: bool,
    /// Context was forked for this scope and goes away with it
    owns_context: bool,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn open(tb: &'a TimeBlock, label: String, options: ScopeOptions) -> Self {
        let (context, joined) = tb.stacks().push(&label);
        Self::start(tb, context, label, joined, options, false)
    }

    /// Open on a context forked for this scope alone; closing releases it.
    pub(crate) fn open_forked(
        tb: &'a TimeBlock,
        context: ContextKey,
        label: String,
        options: ScopeOptions,
    ) -> Self {
        let joined = tb.stacks().push_to(context, &label);
        Self::start(tb, context, label, joined, options, true)
    }

    fn start(
        tb: &'a TimeBlock,
        context: ContextKey,
        label: String,
        joined: String,
        options: ScopeOptions,
        owns_context: bool,
    ) -> Self {
        if options.print_start {
            tb.emit(&format!("{joined}: running"));
        }

        let start = Instant::now();
        let start_mem = tb.read_memory();

        Self {
            tb,
            context,
            label,
            joined,
            options,
            start,
            start_mem,
            failed: false,
            owns_context,
        }
    }

    /// Report this scope as failed when it closes.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Path this scope will be recorded under.
    pub fn path(&self) -> CallPath {
        self.tb.stacks().path(self.context)
    }

    fn close(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();

        // Timed on its own so the release pass never inflates `duration`.
        let gc_duration = if self.options.do_gc {
            let gc_start = Instant::now();
            self.tb.release_memory();
            gc_start.elapsed().as_secs_f64()
        } else {
            0.0
        };

        let end_mem = self.tb.read_memory();
        let failed = self.failed || std::thread::panicking();

        let mem_delta = match (self.start_mem, end_mem) {
            (Some(start), Some(end)) => {
                let delta = end as i64 - start as i64;
                let path = self.tb.stacks().path(self.context);
                self.tb.stats().record(path, Sample::new(duration, delta));
                Some(delta)
            }
            _ => {
                warn!(
                    "Skipping sample for `{}`: memory reading unavailable",
                    self.joined
                );
                None
            }
        };

        self.tb.stacks().pop(self.context, &self.label);
        if self.owns_context {
            self.tb.stacks().release(self.context);
        }

        if self.options.print_stop {
            let mem = if self.options.do_gc {
                let delta = mem_delta.map_or_else(|| "?B".to_string(), human_readable_delta);
                format!(" {delta} (gc: {gc_duration:.1}s)")
            } else {
                String::new()
            };
            let err = if failed { " (err)" } else { "" };
            self.tb
                .emit(&format!("{}: {:.1}s{}{}", self.joined, duration, mem, err));
        }
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

//! Call-tree profiler for nested named blocks
//!
//! Every measured region is keyed by the full path of labels that enclose it,
//! so the same label under different callers is aggregated separately. Each
//! thread, tokio task and measured future has its own label stack; samples
//! from all of them land in one table per [`TimeBlock`].
//!
//! ```
//! let tb = time_block::TimeBlock::new();
//! let sum = tb.ctx("load", || tb.ctx("parse", || 40 + 2));
//! assert_eq!(sum, 42);
//! assert_eq!(tb.get_stats().len(), 2);
//! println!("{}", tb.format_stats());
//! ```
//!
//! The free functions below act on a process-wide default instance.

use std::{future::Future, sync::LazyLock};

pub mod config;
pub mod error;
pub mod logging;
pub mod profiling;
pub mod util;

pub use config::{ScopeOptions, TimeBlockConfig};
pub use error::TimeBlockError;
pub use profiling::{
    Call, CallPath, Decor, Sample, ScopeGuard, StatsSnapshot, TimeBlock, TimeBlockBuilder,
    TimeBlockState,
};
pub use util::mem2str;

static GLOBAL: LazyLock<TimeBlock> = LazyLock::new(TimeBlock::new);

/// The process-wide default instance, built on first use.
pub fn global() -> &'static TimeBlock {
    &GLOBAL
}

pub fn enter<S: Into<String>>(label: S) -> ScopeGuard<'static> {
    GLOBAL.enter(label)
}

pub fn ctx<S, R, F>(label: S, f: F) -> R
where
    S: Into<String>,
    F: FnOnce() -> R,
{
    GLOBAL.ctx(label, f)
}

pub fn ctx_with<S, R, F>(label: S, options: ScopeOptions, f: F) -> R
where
    S: Into<String>,
    F: FnOnce() -> R,
{
    GLOBAL.ctx_with(label, options, f)
}

pub fn try_ctx<S, T, E, F>(label: S, f: F) -> Result<T, E>
where
    S: Into<String>,
    F: FnOnce() -> Result<T, E>,
{
    GLOBAL.try_ctx(label, f)
}

pub async fn actx<S, F>(label: S, fut: F) -> F::Output
where
    S: Into<String>,
    F: Future,
{
    GLOBAL.actx(label, fut).await
}

pub async fn try_actx<S, F, T, E>(label: S, fut: F) -> Result<T, E>
where
    S: Into<String>,
    F: Future<Output = Result<T, E>>,
{
    GLOBAL.try_actx(label, fut).await
}

pub fn decor(options: ScopeOptions) -> Decor<'static> {
    GLOBAL.decor(options)
}

pub fn get_stats() -> StatsSnapshot {
    GLOBAL.get_stats()
}

pub fn add_stats(other: &StatsSnapshot) {
    GLOBAL.add_stats(other);
}

pub fn clear() {
    GLOBAL.clear();
}

pub fn format_stats() -> String {
    GLOBAL.format_stats()
}

pub fn print_stats() {
    GLOBAL.print_stats();
}

pub fn enable_notices() {
    GLOBAL.enable_notices();
}

pub fn disable_notices() {
    GLOBAL.disable_notices();
}

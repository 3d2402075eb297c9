//! Nested wall-clock and memory measurement
//!
//! A [`TimeBlock`] keeps one label stack per execution context and a shared
//! table of samples keyed by the full label path. Scopes are RAII guards;
//! closures, futures and function calls are measured through helpers built
//! on them.

pub mod call_wrapper;
pub mod context_stack;
pub mod macros;
pub mod memory;
pub mod notice;
pub mod report;
pub mod scope;
pub mod stats_store;
pub mod time_block;

pub use call_wrapper::{Call, Decor};
pub use context_stack::{ContextKey, ContextStacks, StackEntry};
pub use memory::{MemoryReader, NoMemory, ProcessMemory, release_free_memory};
pub use notice::{CaptureSink, NoticeSink, TracingSink};
pub use report::{ReportRow, format_stats, report_rows};
pub use scope::ScopeGuard;
pub use stats_store::{CallPath, PATH_SEPARATOR, Sample, StatsEntry, StatsSnapshot, StatsStore};
pub use time_block::{TimeBlock, TimeBlockBuilder, TimeBlockState, default_root_label};

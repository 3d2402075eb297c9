//! Process memory sampling using sysinfo, plus the allocator release pass run
//! before the final reading of a `do_gc` scope

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

use crate::error::TimeBlockError;

/// Source of the current resident memory, in bytes.
pub trait MemoryReader: Send + Sync {
    fn resident_bytes(&self) -> Result<u64, TimeBlockError>;
}

impl<F> MemoryReader for F
where
    F: Fn() -> Result<u64, TimeBlockError> + Send + Sync,
{
    fn resident_bytes(&self) -> Result<u64, TimeBlockError> {
        self()
    }
}

/// Resident set size of the current process.
pub struct ProcessMemory {
    system: Mutex<System>,
    process_pid: Option<Pid>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        let process_pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!("Could not resolve current pid for memory sampling: {}", e);
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            process_pid,
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReader for ProcessMemory {
    fn resident_bytes(&self) -> Result<u64, TimeBlockError> {
        let pid = self
            .process_pid
            .ok_or_else(|| TimeBlockError::memory_read("current pid unavailable"))?;

        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        system
            .process(pid)
            .map(|process| process.memory())
            .ok_or_else(|| TimeBlockError::memory_read(format!("process {pid} not found")))
    }
}

/// Reader that always reports zero; for callers who only want timings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemory;

impl MemoryReader for NoMemory {
    fn resident_bytes(&self) -> Result<u64, TimeBlockError> {
        Ok(0)
    }
}

/// Hook run (and timed separately) before the exit reading of a `do_gc` scope.
pub type ReleaseHook = dyn Fn() + Send + Sync;

/// Hand freed heap pages back to the OS so the exit reading reflects live
/// memory rather than allocator caching.
pub fn release_free_memory() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        // SAFETY: malloc_trim only inspects and shrinks the allocator's own
        // free lists; it has no preconditions on the caller.
        unsafe {
            libc::malloc_trim(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_memory_reads_nonzero() {
        let reader = ProcessMemory::new();
        let bytes = reader.resident_bytes().unwrap();
        assert!(bytes > 0);
    }

    #[test]
    fn test_closure_reader() {
        let reader = || -> Result<u64, TimeBlockError> { Ok(4096) };
        assert_eq!(reader.resident_bytes().unwrap(), 4096);
    }

    #[test]
    fn test_release_pass_is_callable() {
        release_free_memory();
        assert_eq!(NoMemory.resident_bytes().unwrap(), 0);
    }
}

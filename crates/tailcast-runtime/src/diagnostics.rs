//! Session-end diagnostics.
//!
//! Mirrors what operators look at when streams misbehave: how many tasks the
//! runtime is still carrying and how much memory the server holds. Memory is
//! only sampled when debug logging is enabled.

use std::sync::Mutex;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tailcast_core::{SessionObserver, SessionReport};
use tracing::{Level, debug};

/// Resident and virtual memory of the current process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub resident: u64,
    pub virtual_bytes: u64,
}

/// Observer logging runtime task counts and memory usage via `tracing`.
pub struct RuntimeDiagnostics {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl RuntimeDiagnostics {
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }

    /// Tasks currently alive on the ambient tokio runtime.
    pub fn alive_tasks() -> Option<usize> {
        tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| handle.metrics().num_alive_tasks())
    }

    /// Sample memory usage of this process.
    pub fn memory(&self) -> Option<MemoryStats> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );

        let process = system.process(pid)?;
        Some(MemoryStats {
            resident: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }
}

impl Default for RuntimeDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for RuntimeDiagnostics {
    fn session_ended(&self, report: &SessionReport) {
        debug!(
            process_id = %report.process_id,
            outcome = ?report.outcome,
            frames = report.frames_sent,
            elapsed = ?report.elapsed,
            "stream session ended"
        );

        if let Some(tasks) = Self::alive_tasks() {
            debug!(tasks, "runtime task stats");
        }

        if tracing::enabled!(Level::DEBUG) {
            if let Some(mem) = self.memory() {
                debug!(
                    resident = %format_bytes(mem.resident),
                    virtual_memory = %format_bytes(mem.virtual_bytes),
                    "runtime mem stats"
                );
            }
        }
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

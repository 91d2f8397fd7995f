use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 單一查詢的統計
#[derive(Debug, Clone)]
pub struct QueryStats {
    pub query_number: usize,
    pub latency: Duration,
    pub tool_calls: usize,
    pub memory_usage_mb: Option<u64>,
    pub peak_memory_mb: Option<u64>,
}

/// 對話期間的統計監控；停用時所有方法皆為 no-op
pub struct SessionMonitor {
    enabled: bool,
    started_at: DateTime<Utc>,
    session_start: Instant,
    queries: usize,
    total_tool_calls: usize,
    query_start: Option<Instant>,
    #[cfg(feature = "cli")]
    system: Option<Arc<Mutex<System>>>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
    peak_memory_mb: u64,
}

impl SessionMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };

        Self {
            enabled,
            started_at: Utc::now(),
            session_start: Instant::now(),
            queries: 0,
            total_tool_calls: 0,
            query_start: None,
            #[cfg(feature = "cli")]
            system: pid.map(|_| Arc::new(Mutex::new(System::new()))),
            #[cfg(feature = "cli")]
            pid,
            peak_memory_mb: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_query(&mut self) {
        if self.enabled {
            self.query_start = Some(Instant::now());
        }
    }

    /// 結束一次查詢並記錄統計
    pub fn finish_query(&mut self, tool_calls: usize) -> Option<QueryStats> {
        if !self.enabled {
            return None;
        }

        let latency = self.query_start.take()?.elapsed();
        self.queries += 1;
        self.total_tool_calls += tool_calls;

        let memory_usage_mb = self.sample_memory_mb();
        if let Some(memory) = memory_usage_mb {
            self.peak_memory_mb = self.peak_memory_mb.max(memory);
        }

        let stats = QueryStats {
            query_number: self.queries,
            latency,
            tool_calls,
            memory_usage_mb,
            peak_memory_mb: memory_usage_mb.map(|_| self.peak_memory_mb),
        };

        tracing::info!(
            "📊 Query #{} - Time: {:?}, Tool calls: {}, Memory: {}MB, Peak: {}MB",
            stats.query_number,
            stats.latency,
            stats.tool_calls,
            stats.memory_usage_mb.unwrap_or(0),
            stats.peak_memory_mb.unwrap_or(0)
        );

        Some(stats)
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        tracing::info!(
            "📊 Session Stats - Started: {}, Duration: {:?}, Queries: {}, Tool calls: {}, Peak Memory: {}MB",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.session_start.elapsed(),
            self.queries,
            self.total_tool_calls,
            self.peak_memory_mb
        );
    }

    #[cfg(feature = "cli")]
    fn sample_memory_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.as_ref()?.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = system.process(pid)?;
        Some(process.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn sample_memory_mb(&self) -> Option<u64> {
        None
    }
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

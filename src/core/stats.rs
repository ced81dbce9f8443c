use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};

/// Per-index figures returned by `get_index_stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_name: String,
    pub document_count: usize,
    /// Distinct terms across the index's documents
    pub term_count: usize,
    pub last_update: Option<DateTime<Utc>>,
}

/// Engine statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    // General info
    pub uptime_secs: u64,

    // Index metrics
    pub total_documents: usize,
    pub total_terms: usize,
    pub documents_indexed: u64,
    pub documents_deleted: u64,
    pub index_failures: u64,
    pub consistency_warnings: u64,

    // Query metrics
    pub queries: u64,
    pub zero_hit_queries: u64,
    pub failed_queries: u64,
    pub timed_out_queries: u64,
    pub avg_query_latency_ms: f64,

    // Persistence metrics
    pub snapshot_failures: u64,
    pub last_save_time: Option<DateTime<Utc>>,
    pub last_rebuild_time: Option<DateTime<Utc>>,
}

/// Counters updated from any thread without taking the engine lock
#[derive(Debug)]
pub struct StatsRecorder {
    started: Instant,
    pub documents_indexed: AtomicU64,
    pub documents_deleted: AtomicU64,
    pub index_failures: AtomicU64,
    pub consistency_warnings: AtomicU64,
    pub queries: AtomicU64,
    pub zero_hit_queries: AtomicU64,
    pub failed_queries: AtomicU64,
    pub timed_out_queries: AtomicU64,
    pub query_micros: AtomicU64,
    pub snapshot_failures: AtomicU64,
    /// Failures since the last successful save
    pub consecutive_snapshot_failures: AtomicU64,
    last_save: Mutex<Option<DateTime<Utc>>>,
    last_rebuild: Mutex<Option<DateTime<Utc>>>,
}

impl Default for StatsRecorder {
    fn default() -> Self {
        StatsRecorder {
            started: Instant::now(),
            documents_indexed: AtomicU64::new(0),
            documents_deleted: AtomicU64::new(0),
            index_failures: AtomicU64::new(0),
            consistency_warnings: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            zero_hit_queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
            timed_out_queries: AtomicU64::new(0),
            query_micros: AtomicU64::new(0),
            snapshot_failures: AtomicU64::new(0),
            consecutive_snapshot_failures: AtomicU64::new(0),
            last_save: Mutex::new(None),
            last_rebuild: Mutex::new(None),
        }
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl StatsRecorder {
    pub fn record_query(&self, micros: u64, hits: usize) {
        bump(&self.queries, 1);
        bump(&self.query_micros, micros);
        if hits == 0 {
            bump(&self.zero_hit_queries, 1);
        }
    }

    pub fn record_failed_query(&self, timed_out: bool) {
        bump(&self.failed_queries, 1);
        if timed_out {
            bump(&self.timed_out_queries, 1);
        }
    }

    pub fn record_indexed(&self, count: usize) {
        bump(&self.documents_indexed, count as u64);
    }

    pub fn record_deleted(&self) {
        bump(&self.documents_deleted, 1);
    }

    pub fn record_index_failures(&self, count: usize) {
        bump(&self.index_failures, count as u64);
    }

    pub fn record_consistency_warnings(&self, count: usize) {
        bump(&self.consistency_warnings, count as u64);
    }

    pub fn record_save(&self, ok: bool) {
        if ok {
            self.consecutive_snapshot_failures.store(0, Ordering::Relaxed);
            *self.last_save.lock() = Some(Utc::now());
        } else {
            bump(&self.snapshot_failures, 1);
            bump(&self.consecutive_snapshot_failures, 1);
        }
    }

    pub fn record_rebuild(&self) {
        *self.last_rebuild.lock() = Some(Utc::now());
    }

    pub fn snapshot_failing(&self) -> bool {
        self.consecutive_snapshot_failures.load(Ordering::Relaxed) > 0
    }

    pub fn snapshot(&self, total_documents: usize, total_terms: usize) -> EngineStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let queries = load(&self.queries);
        let avg_query_latency_ms = if queries == 0 {
            0.0
        } else {
            load(&self.query_micros) as f64 / queries as f64 / 1000.0
        };

        EngineStats {
            uptime_secs: self.started.elapsed().as_secs(),
            total_documents,
            total_terms,
            documents_indexed: load(&self.documents_indexed),
            documents_deleted: load(&self.documents_deleted),
            index_failures: load(&self.index_failures),
            consistency_warnings: load(&self.consistency_warnings),
            queries,
            zero_hit_queries: load(&self.zero_hit_queries),
            failed_queries: load(&self.failed_queries),
            timed_out_queries: load(&self.timed_out_queries),
            avg_query_latency_ms,
            snapshot_failures: load(&self.snapshot_failures),
            last_save_time: *self.last_save.lock(),
            last_rebuild_time: *self.last_rebuild.lock(),
        }
    }
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl HealthCheckResult {
    /// Worst status among the checks
    pub fn from_checks(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| &c.status)
            .find(|s| matches!(s, HealthStatus::Unhealthy(_)))
            .or_else(|| checks.iter().map(|c| &c.status).find(|s| !s.is_healthy()))
            .cloned()
            .unwrap_or(HealthStatus::Healthy);

        HealthCheckResult {
            status,
            checks,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_latency_average() {
        let stats = StatsRecorder::default();
        stats.record_query(2_000, 3);
        stats.record_query(4_000, 0);
        stats.record_failed_query(true);

        let snapshot = stats.snapshot(10, 20);
        assert_eq!(snapshot.queries, 2);
        assert_eq!(snapshot.zero_hit_queries, 1);
        assert_eq!(snapshot.timed_out_queries, 1);
        assert!((snapshot.avg_query_latency_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn save_failures_reset_on_success() {
        let stats = StatsRecorder::default();
        stats.record_save(false);
        assert!(stats.snapshot_failing());
        stats.record_save(true);
        assert!(!stats.snapshot_failing());
        let snapshot = stats.snapshot(0, 0);
        assert_eq!(snapshot.snapshot_failures, 1);
        assert!(snapshot.last_save_time.is_some());
    }

    #[test]
    fn worst_check_wins() {
        let check = |status| HealthCheck {
            name: "x".into(),
            status,
            message: None,
            latency_ms: 0,
        };
        let result = HealthCheckResult::from_checks(vec![
            check(HealthStatus::Healthy),
            check(HealthStatus::Degraded("slow".into())),
        ]);
        assert_eq!(result.status, HealthStatus::Degraded("slow".into()));
        assert!(HealthCheckResult::from_checks(vec![]).status.is_healthy());
    }
}

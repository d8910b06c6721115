//! Pattern store metrics.
//!
//! Every repository statement is timed under a [`StoreOp`] label together
//! with its outcome. Row-producing operations also record how many rows they
//! touched, and pool gauges are refreshed on each readiness ping.

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;

/// Repository operations, used as the `query` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindByDevice,
    Upsert,
    UpsertBatch,
    FindAll,
    DeleteAll,
    Ping,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::FindByDevice => "find_patterns_by_device",
            StoreOp::Upsert => "upsert_pattern",
            StoreOp::UpsertBatch => "upsert_patterns_batch",
            StoreOp::FindAll => "find_all_patterns",
            StoreOp::DeleteAll => "delete_all_patterns",
            StoreOp::Ping => "ping",
        }
    }
}

/// Records one finished statement.
pub fn record_query(op: StoreOp, succeeded: bool, duration_secs: f64) {
    let outcome = if succeeded { "ok" } else { "error" };
    histogram!(
        "database_query_duration_seconds",
        "query" => op.as_str(),
        "outcome" => outcome
    )
    .record(duration_secs);
    counter!(
        "pattern_store_queries_total",
        "query" => op.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Records how many rows an operation read or wrote.
pub fn record_rows(op: StoreOp, rows: u64) {
    histogram!("pattern_store_rows", "query" => op.as_str()).record(rows as f64);
}

/// Connection counts for one pool sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub idle: usize,
    pub active: usize,
}

impl PoolStats {
    pub fn from_counts(total: usize, idle: usize) -> Self {
        Self {
            total,
            idle,
            active: total.saturating_sub(idle),
        }
    }

    pub fn sample(pool: &PgPool) -> Self {
        Self::from_counts(pool.size() as usize, pool.num_idle())
    }
}

/// Publishes the pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let stats = PoolStats::sample(pool);
    gauge!("database_connections_active").set(stats.active as f64);
    gauge!("database_connections_idle").set(stats.idle as f64);
    gauge!("database_connections_total").set(stats.total as f64);
}

/// Times one repository operation.
///
/// ```ignore
/// let timer = QueryTimer::start(StoreOp::FindByDevice);
/// let result = sqlx::query_as::<_, UsagePatternEntity>(...).fetch_all(&pool).await;
/// timer.finish(&result);
/// ```
#[derive(Debug)]
pub struct QueryTimer {
    op: StoreOp,
    started: Instant,
}

impl QueryTimer {
    pub fn start(op: StoreOp) -> Self {
        Self {
            op,
            started: Instant::now(),
        }
    }

    pub fn op(&self) -> StoreOp {
        self.op
    }

    /// Records duration and outcome of `result`.
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        record_query(self.op, result.is_ok(), self.started.elapsed().as_secs_f64());
    }
}

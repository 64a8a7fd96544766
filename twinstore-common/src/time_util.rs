use std::time::Duration;

use tokio::time::Instant;

/// A per-call deadline derived from a session's configured timeout. Threaded
/// through every CRUD primitive and every suspension point (prepare,
/// execute, query, cursor iteration, commit, rollback, Mongo cursor/insert/
/// update/delete) via `tokio::time::timeout`.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn from_timeout_ms(timeout_ms: u64) -> Self {
        Deadline(Instant::now() + Duration::from_millis(timeout_ms))
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub async fn run<F, T>(&self, fut: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(self.remaining(), fut).await
    }
}

/// Human-readable duration for slow-query log lines (e.g. "152ms" rather than
/// a raw `Duration` debug print).
pub fn to_duration_pretty(duration: &Duration) -> String {
    pretty_duration::pretty_duration(duration, None)
}

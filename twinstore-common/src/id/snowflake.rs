use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use super::IdGenerator;

const TWINSTORE_EPOCH_MS: i64 = 1_700_000_000_000;
const SEQUENCE_BITS: i64 = 12;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;
const WORKER_ID_BITS: i64 = 10;

/// A minimal Twitter-Snowflake-style `i64` id generator plus a UUIDv4-backed
/// string id generator, used as the default `IdGenerator` when the
/// embedding application does not register its own.
///
/// Not a distributed-systems-grade clock-skew-proof implementation — just
/// enough to hand back a monotonically increasing, practically-unique id so
/// `save()` has something to write back when a primary key is zero.
pub struct SnowflakeIdGenerator {
    worker_id: i64,
    last_ts: AtomicI64,
    sequence: AtomicI64,
}

impl SnowflakeIdGenerator {
    pub fn new(worker_id: i64) -> Self {
        SnowflakeIdGenerator {
            worker_id: worker_id & ((1 << WORKER_ID_BITS) - 1),
            last_ts: AtomicI64::new(0),
            sequence: AtomicI64::new(0),
        }
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

impl Default for SnowflakeIdGenerator {
    fn default() -> Self {
        SnowflakeIdGenerator::new(1)
    }
}

impl IdGenerator for SnowflakeIdGenerator {
    fn next_i64(&self) -> i64 {
        loop {
            let now = Self::now_ms();
            let last = self.last_ts.load(Ordering::Acquire);

            let (ts, seq) = if now == last {
                let seq = (self.sequence.fetch_add(1, Ordering::AcqRel) + 1) & MAX_SEQUENCE;
                if seq == 0 {
                    // Sequence exhausted within this millisecond; spin to the next tick.
                    continue;
                }
                (now, seq)
            } else {
                self.sequence.store(0, Ordering::Release);
                (now, 0)
            };

            if self
                .last_ts
                .compare_exchange(last, ts, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }

            let delta = ts - TWINSTORE_EPOCH_MS;
            return (delta << (WORKER_ID_BITS + SEQUENCE_BITS))
                | (self.worker_id << SEQUENCE_BITS)
                | seq;
        }
    }

    fn next_string(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique() {
        let gen = SnowflakeIdGenerator::new(3);
        let mut prev = 0i64;
        for _ in 0..1000 {
            let id = gen.next_i64();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn string_ids_are_distinct() {
        let gen = SnowflakeIdGenerator::default();
        let a = gen.next_string();
        let b = gen.next_string();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}

use crate::clock::Clock;
use crate::errors::{AppError, AppResult};
use crate::models::LeaderboardData;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct CachedLeaderboard {
    data: Arc<LeaderboardData>,
    computed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheSlot {
    entry: Option<CachedLeaderboard>,
    generation: u64,
}

/// Single-slot memo of the unfiltered leaderboard.
///
/// The lock is never held while rebuilding, so concurrent misses may rebuild
/// independently; the last finisher wins. A rebuild that started before an
/// [`invalidate`](Self::invalidate) is discarded instead of stored.
pub struct LeaderboardCache {
    slot: Mutex<CacheSlot>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(CacheSlot::default()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh slot contents, if any.
    pub fn peek(&self) -> AppResult<Option<Arc<LeaderboardData>>> {
        let slot = self.lock()?;
        let now = self.clock.now();
        Ok(slot
            .entry
            .as_ref()
            .filter(|cached| now - cached.computed_at < self.ttl)
            .map(|cached| cached.data.clone()))
    }

    pub fn get_or_rebuild<F>(&self, rebuild: F) -> AppResult<Arc<LeaderboardData>>
    where
        F: FnOnce() -> AppResult<LeaderboardData>,
    {
        if let Some(hit) = self.peek()? {
            tracing::debug!("leaderboard cache hit");
            return Ok(hit);
        }

        let generation = self.lock()?.generation;
        tracing::debug!(generation, "leaderboard cache miss; rebuilding");
        let data = Arc::new(rebuild()?);

        let mut slot = self.lock()?;
        if slot.generation == generation {
            slot.entry = Some(CachedLeaderboard {
                data: data.clone(),
                computed_at: self.clock.now(),
            });
        } else {
            tracing::debug!("leaderboard invalidated during rebuild; result not cached");
        }
        Ok(data)
    }

    pub fn invalidate(&self) {
        match self.slot.lock() {
            Ok(mut slot) => {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
            }
            Err(poisoned) => {
                let mut slot = poisoned.into_inner();
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        tracing::debug!("leaderboard cache invalidated");
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, CacheSlot>> {
        self.slot
            .lock()
            .map_err(|_| AppError::Internal("leaderboard cache mutex poisoned".to_string()))
    }
}

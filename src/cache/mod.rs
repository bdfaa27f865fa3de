use redis::AsyncCommands;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::Seat;
use crate::redis_client::RedisClient;

const SEATS_KEY: &str = "seats:snapshot";

/// Read-through кеш списка мест. Решения о бронировании кеш никогда не читают.
///
/// Каждая инвалидация увеличивает поколение. Снимок, прочитанный до инвалидации,
/// в кеш не записывается (в пределах процесса; между процессами устаревание ограничено TTL).
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
    generation: Arc<AtomicU64>,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self {
            redis: Some(redis),
            ttl_seconds,
            generation: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            redis: None,
            ttl_seconds: 0,
            generation: Arc::default(),
        }
    }

    /// Снять до чтения снимка из хранилища, передать в `save_seats`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }

    // Получить снимок мест из кеша. Любая ошибка Redis - промах
    pub async fn get_seats(&self) -> Option<Vec<Seat>> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();

        let cached: Option<String> = match conn.get(SEATS_KEY).await {
            Ok(v) => v,
            Err(e) => {
                warn!("seats cache read failed: {}", e);
                return None;
            }
        };

        cached.and_then(|json| match serde_json::from_str(&json) {
            Ok(seats) => Some(seats),
            Err(e) => {
                warn!("seats cache entry is corrupt: {}", e);
                None
            }
        })
    }

    /// Записать снимок, прочитанный в поколении `generation`. Устаревший снимок отбрасывается.
    pub async fn save_seats(&self, generation: u64, seats: &[Seat]) {
        let Some(redis) = self.redis.as_ref() else { return };
        if !self.is_current(generation) {
            debug!("skip caching stale seats snapshot");
            return;
        }
        let json = match serde_json::to_string(seats) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize seats for cache: {}", e);
                return;
            }
        };

        let mut conn = redis.conn.clone();
        let res: Result<(), _> = conn.set_ex(SEATS_KEY, json, self.ttl_seconds).await;
        if let Err(e) = res {
            warn!("seats cache write failed: {}", e);
            return;
        }

        // Инвалидация могла пройти между проверкой и SET
        if !self.is_current(generation) {
            self.delete_snapshot(redis).await;
        }
    }

    // Инвалидировать кеш мест
    pub async fn invalidate_seats(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let Some(redis) = self.redis.as_ref() else { return };
        self.delete_snapshot(redis).await;
        info!("Invalidated seats cache");
    }

    async fn delete_snapshot(&self, redis: &RedisClient) {
        let mut conn = redis.conn.clone();
        let res: Result<(), _> = conn.del(SEATS_KEY).await;
        if let Err(e) = res {
            warn!("seats cache invalidation failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalidation_makes_earlier_snapshots_stale() {
        let cache = CacheService::disabled();
        let before = cache.generation();
        assert!(cache.is_current(before));

        cache.invalidate_seats().await;
        assert!(!cache.is_current(before));

        let after = cache.generation();
        assert!(cache.is_current(after));
        // disabled cache: no-op, no panic
        cache.save_seats(before, &[]).await;
        assert!(cache.get_seats().await.is_none());
    }

    #[tokio::test]
    async fn clones_share_generation() {
        let cache = CacheService::disabled();
        let handler_copy = cache.clone();
        let seen = handler_copy.generation();

        cache.invalidate_seats().await;
        assert!(!handler_copy.is_current(seen));
    }
}

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use marquee_core::OwnershipCache;

/// Redis-backed ownership records for in-flight holds.
///
/// Key layout: `seat:{showtime_id}:{seat_id}` -> holding user id, with the
/// hold TTL so abandoned records disappear on their own.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    fn seat_key(showtime_id: &str, seat_id: &str) -> String {
        format!("seat:{}:{}", showtime_id, seat_id)
    }

    pub async fn acquire_seat_hold(
        &self,
        showtime_id: &str,
        seat_id: &str,
        user_id: &str,
        ttl_seconds: u64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::seat_key(showtime_id, seat_id);

        // SET NX: only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(user_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            info!("Seat hold set: {} -> {}", key, user_id);
        }
        Ok(result.is_some())
    }

    pub async fn seat_owner(&self, showtime_id: &str, seat_id: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::seat_key(showtime_id, seat_id);
        conn.get(key).await
    }

    pub async fn refresh_seat_hold(
        &self,
        showtime_id: &str,
        seat_id: &str,
        user_id: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::seat_key(showtime_id, seat_id);
        conn.set_ex::<_, _, ()>(key, user_id, ttl_seconds).await
    }

    pub async fn release_seat_hold(&self, showtime_id: &str, seat_id: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::seat_key(showtime_id, seat_id);
        conn.del::<_, ()>(key).await
    }
}

#[async_trait]
impl OwnershipCache for RedisClient {
    async fn acquire(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .acquire_seat_hold(
                &showtime_id.to_string(),
                &seat_id.to_string(),
                &user_id.to_string(),
                ttl.as_secs(),
            )
            .await?)
    }

    async fn owner(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let value = self
            .seat_owner(&showtime_id.to_string(), &seat_id.to_string())
            .await?;
        Ok(value.and_then(|v| Uuid::parse_str(&v).ok()))
    }

    async fn refresh(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.refresh_seat_hold(
            &showtime_id.to_string(),
            &seat_id.to_string(),
            &user_id.to_string(),
            ttl.as_secs(),
        )
        .await?;
        Ok(())
    }

    async fn release(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.release_seat_hold(&showtime_id.to_string(), &seat_id.to_string())
            .await?;
        Ok(())
    }
}

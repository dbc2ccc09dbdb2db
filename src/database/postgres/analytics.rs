use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{NewTapEvent, TapEvent};
use crate::database::repository::{AnalyticsRepository, DbResult};

pub struct PgAnalyticsRepository {
    pool: PgPool,
}

impl PgAnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn record_tap(&self, event: NewTapEvent) -> DbResult<TapEvent> {
        let row: (Uuid, Option<Uuid>, String, Option<Uuid>, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO tap_events (id, tag_id, user_id, profile_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id, tag_id, user_id, profile_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(event.tag_id)
        .bind(&event.user_id)
        .bind(event.profile_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TapEvent {
            id: row.0,
            tag_id: row.1,
            user_id: row.2,
            profile_id: row.3,
            created_at: row.4,
        })
    }

    async fn tap_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>> {
        let times = sqlx::query_scalar(
            "SELECT created_at FROM tap_events WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(times)
    }

    async fn lead_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>> {
        let times = sqlx::query_scalar(
            "SELECT created_at FROM leads WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(times)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{HardwareTag, TagAssignment, TagStatus, TagWithAssignment};
use crate::database::repository::{DbResult, TagRepository};

const TAG_COLUMNS: &str = "id, chip_uid, claim_code, status, claim_expires_at, created_at";

const ASSIGNMENT_COLUMNS: &str = "id, tag_id, user_id, profile_id, created_at, updated_at";

#[derive(FromRow)]
struct TagRow {
    id: Uuid,
    chip_uid: String,
    claim_code: String,
    status: String,
    claim_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TagRow> for HardwareTag {
    fn from(row: TagRow) -> Self {
        // The CHECK constraint keeps status within the known set.
        let status = row.status.parse().unwrap_or(TagStatus::Retired);
        HardwareTag {
            id: row.id,
            chip_uid: row.chip_uid,
            claim_code: row.claim_code,
            status,
            claim_expires_at: row.claim_expires_at,
            created_at: row.created_at,
        }
    }
}

pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assignment_for(&self, tag_id: Uuid) -> DbResult<Option<TagAssignment>> {
        let assignment = sqlx::query_as::<_, TagAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM tag_assignments WHERE tag_id = $1"
        ))
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn attach(&self, row: Option<TagRow>) -> DbResult<Option<TagWithAssignment>> {
        match row {
            Some(row) => {
                let assignment = self.assignment_for(row.id).await?;
                Ok(Some(TagWithAssignment { tag: row.into(), assignment }))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn insert(&self, chip_uid: &str, claim_code: &str, claim_expires_at: Option<DateTime<Utc>>) -> DbResult<HardwareTag> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "INSERT INTO hardware_tags (id, chip_uid, claim_code, claim_expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {TAG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(chip_uid)
        .bind(claim_code)
        .bind(claim_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_identifier(&self, identifier: &str) -> DbResult<Option<TagWithAssignment>> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM hardware_tags WHERE chip_uid = $1 OR claim_code = $1 LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        self.attach(row).await
    }

    async fn find_by_chip_uid(&self, chip_uid: &str) -> DbResult<Option<TagWithAssignment>> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM hardware_tags WHERE chip_uid = $1"
        ))
        .bind(chip_uid)
        .fetch_optional(&self.pool)
        .await?;

        self.attach(row).await
    }

    async fn find_by_id(&self, tag_id: Uuid) -> DbResult<Option<TagWithAssignment>> {
        let row = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM hardware_tags WHERE id = $1"
        ))
        .bind(tag_id)
        .fetch_optional(&self.pool)
        .await?;

        self.attach(row).await
    }

    async fn claim(&self, tag_id: Uuid, user_id: &str) -> DbResult<Option<TagAssignment>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE hardware_tags SET status = 'claimed' WHERE id = $1 AND status = 'unclaimed'",
        )
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let assignment = sqlx::query_as::<_, TagAssignment>(&format!(
            "INSERT INTO tag_assignments (id, tag_id, user_id)
             VALUES ($1, $2, $3)
             RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(tag_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(assignment))
    }

    async fn set_profile(&self, tag_id: Uuid, user_id: &str, profile_id: Option<Uuid>) -> DbResult<Option<TagAssignment>> {
        let assignment = sqlx::query_as::<_, TagAssignment>(&format!(
            "UPDATE tag_assignments SET profile_id = $3, updated_at = now()
             WHERE tag_id = $1 AND user_id = $2
             RETURNING {ASSIGNMENT_COLUMNS}"
        ))
        .bind(tag_id)
        .bind(user_id)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn release(&self, tag_id: Uuid, user_id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM tag_assignments WHERE tag_id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE hardware_tags SET status = 'unclaimed' WHERE id = $1 AND status = 'claimed'")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_for_account(&self, user_id: &str) -> DbResult<Vec<TagWithAssignment>> {
        let assignments = sqlx::query_as::<_, TagAssignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM tag_assignments WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if assignments.is_empty() {
            return Ok(vec![]);
        }

        let tag_ids: Vec<Uuid> = assignments.iter().map(|a| a.tag_id).collect();
        let rows = sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM hardware_tags WHERE id = ANY($1) ORDER BY created_at ASC"
        ))
        .bind(&tag_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_tag: HashMap<Uuid, TagAssignment> =
            assignments.into_iter().map(|a| (a.tag_id, a)).collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let assignment = by_tag.remove(&row.id);
                TagWithAssignment { tag: row.into(), assignment }
            })
            .collect())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    ActiveCandidate, Link, NewLink, NewProfile, Profile, ProfileUpdate, ProfileWithLinks,
};
use crate::database::repository::{DbResult, ProfileRepository};

const PROFILE_COLUMNS: &str =
    "id, user_id, name, handle, headline, theme, is_active, created_at, updated_at";

const LINK_COLUMNS: &str =
    "id, profile_id, user_id, title, url, order_index, is_active, created_at, updated_at";

#[derive(FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: String,
    name: String,
    handle: String,
    headline: Option<String>,
    theme: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let theme = row.theme.parse().unwrap_or_else(|_| {
            tracing::warn!("Profile {} has unknown theme '{}', using default", row.id, row.theme);
            Default::default()
        });
        Profile {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            handle: row.handle,
            headline: row.headline,
            theme,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_links(&self, rows: Vec<ProfileRow>) -> DbResult<Vec<ProfileWithLinks>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM profile_links
             WHERE profile_id = ANY($1)
             ORDER BY order_index ASC, created_at ASC, id ASC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_profile: HashMap<Uuid, Vec<Link>> = HashMap::new();
        for link in links {
            by_profile.entry(link.profile_id).or_default().push(link);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let links = by_profile.remove(&row.id).unwrap_or_default();
                ProfileWithLinks { profile: row.into(), links }
            })
            .collect())
    }

    async fn one_with_links(&self, row: Option<ProfileRow>) -> DbResult<Option<ProfileWithLinks>> {
        match row {
            Some(row) => Ok(self.with_links(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn list(&self, user_id: &str) -> DbResult<Vec<ProfileWithLinks>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles
             WHERE user_id = $1
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_links(rows).await
    }

    async fn get(&self, user_id: &str, profile_id: Uuid) -> DbResult<Option<ProfileWithLinks>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1 AND user_id = $2"
        ))
        .bind(profile_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_links(row).await
    }

    async fn find_by_handle(&self, user_id: &str, handle: &str) -> DbResult<Option<ProfileWithLinks>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1 AND handle = $2"
        ))
        .bind(user_id)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_links(row).await
    }

    async fn active(&self, user_id: &str) -> DbResult<Option<ProfileWithLinks>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles
             WHERE user_id = $1 AND is_active
             ORDER BY updated_at DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        self.one_with_links(row).await
    }

    async fn handle_in_use(&self, user_id: &str, handle: &str, exclude: Option<Uuid>) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM user_profiles
                WHERE user_id = $1 AND handle = $2 AND ($3::uuid IS NULL OR id <> $3)
             )",
        )
        .bind(user_id)
        .bind(handle)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn count(&self, user_id: &str) -> DbResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as usize)
    }

    async fn insert(&self, user_id: &str, profile: NewProfile) -> DbResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO user_profiles (id, user_id, name, handle, headline, theme, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.handle)
        .bind(profile.headline.as_deref())
        .bind(profile.theme.as_str())
        .bind(profile.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, user_id: &str, update: ProfileUpdate) -> DbResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE user_profiles
             SET name = $3, handle = $4, headline = $5, theme = $6, updated_at = now()
             WHERE id = $1 AND user_id = $2
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(update.id)
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.handle)
        .bind(update.headline.as_deref())
        .bind(update.theme.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("profile {}", update.id)))
    }

    async fn replace_links(&self, user_id: &str, profile_id: Uuid, links: Vec<NewLink>) -> DbResult<Vec<Link>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM profile_links WHERE profile_id = $1 AND user_id = $2")
            .bind(profile_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(links.len());
        for link in links {
            let row = sqlx::query_as::<_, Link>(&format!(
                "INSERT INTO profile_links (id, profile_id, user_id, title, url, order_index, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {LINK_COLUMNS}"
            ))
            .bind(link.id)
            .bind(profile_id)
            .bind(user_id)
            .bind(&link.title)
            .bind(&link.url)
            .bind(link.order_index)
            .bind(link.is_active)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn delete(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1 AND user_id = $2")
            .bind(profile_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn activate(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_profiles WHERE id = $1 AND user_id = $2)",
        )
        .bind(profile_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if !owned {
            tx.rollback().await?;
            return Ok(false);
        }

        // Demote first: the partial unique index rejects two active rows.
        sqlx::query(
            "UPDATE user_profiles SET is_active = false
             WHERE user_id = $1 AND is_active AND id <> $2",
        )
        .bind(user_id)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE user_profiles SET is_active = true
             WHERE id = $2 AND user_id = $1 AND NOT is_active",
        )
        .bind(user_id)
        .bind(profile_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn active_candidates(&self, user_id: &str) -> DbResult<Vec<ActiveCandidate>> {
        let rows: Vec<(Uuid, bool, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, is_active, created_at, updated_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, is_active, created_at, updated_at)| ActiveCandidate {
                id,
                is_active,
                created_at,
                updated_at,
            })
            .collect())
    }
}

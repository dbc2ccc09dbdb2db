use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::{Account, AccountUpdate};
use crate::database::repository::{AccountRepository, DbResult};

const ACCOUNT_COLUMNS: &str =
    "user_id, username, display_name, avatar_path, avatar_updated_at, created_at, updated_at";

pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn get(&self, user_id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(username) = lower($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn assign_username(&self, user_id: &str, username: &str) -> DbResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (user_id, username)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET username = COALESCE(accounts.username, EXCLUDED.username),
                    updated_at = now()
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn update(&self, user_id: &str, update: &AccountUpdate) -> DbResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (user_id, display_name, avatar_path, avatar_updated_at)
            VALUES ($1, $2, $3, CASE WHEN $3::text IS NULL THEN NULL ELSE now() END)
            ON CONFLICT (user_id) DO UPDATE
                SET display_name = COALESCE(EXCLUDED.display_name, accounts.display_name),
                    avatar_path = COALESCE(EXCLUDED.avatar_path, accounts.avatar_path),
                    avatar_updated_at = CASE
                        WHEN EXCLUDED.avatar_path IS NULL THEN accounts.avatar_updated_at
                        ELSE now()
                    END,
                    updated_at = now()
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(update.display_name.as_deref())
        .bind(update.avatar_path.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }
}

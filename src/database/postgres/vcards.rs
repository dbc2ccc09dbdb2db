use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{VcardPayload, VcardProfile};
use crate::database::repository::{DbResult, VcardRepository};

const VCARD_COLUMNS: &str = "id, user_id, full_name, title, email, phone, company, website, \
     address, note, photo_data, photo_name, created_at, updated_at";

pub struct PgVcardRepository {
    pool: PgPool,
}

impl PgVcardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VcardRepository for PgVcardRepository {
    async fn get(&self, user_id: &str) -> DbResult<Option<VcardProfile>> {
        let row = sqlx::query_as::<_, VcardProfile>(&format!(
            "SELECT {VCARD_COLUMNS} FROM vcard_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert(&self, user_id: &str, payload: &VcardPayload) -> DbResult<VcardProfile> {
        let row = sqlx::query_as::<_, VcardProfile>(&format!(
            "INSERT INTO vcard_profiles
                (id, user_id, full_name, title, email, phone, company, website,
                 address, note, photo_data, photo_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (user_id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                title = EXCLUDED.title,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                company = EXCLUDED.company,
                website = EXCLUDED.website,
                address = EXCLUDED.address,
                note = EXCLUDED.note,
                photo_data = EXCLUDED.photo_data,
                photo_name = EXCLUDED.photo_name,
                updated_at = now()
             RETURNING {VCARD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.full_name.as_deref())
        .bind(payload.title.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.company.as_deref())
        .bind(payload.website.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.note.as_deref())
        .bind(payload.photo_data.as_deref())
        .bind(payload.photo_name.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

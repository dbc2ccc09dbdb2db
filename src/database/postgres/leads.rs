use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::database::models::{
    FieldValidation, Lead, LeadFormField, LeadFormSettings, NewField, NewLead,
};
use crate::database::repository::{DbResult, LeadRepository};

const FIELD_COLUMNS: &str = "id, user_id, handle, key, label, type AS field_type, required, \
     placeholder, options, is_hidden, validation, order_index, is_active, created_at";

const LEAD_COLUMNS: &str = "id, user_id, handle, name, email, phone, company, message, \
     custom_fields, source_url, created_at";

#[derive(FromRow)]
struct FieldRow {
    id: Uuid,
    user_id: String,
    handle: String,
    key: String,
    label: String,
    field_type: String,
    required: bool,
    placeholder: Option<String>,
    options: Vec<String>,
    is_hidden: bool,
    validation: Json<FieldValidation>,
    order_index: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<FieldRow> for LeadFormField {
    fn from(row: FieldRow) -> Self {
        let field_type = row.field_type.parse().unwrap_or_else(|_| {
            tracing::warn!("Lead field {} has unknown type '{}'", row.id, row.field_type);
            Default::default()
        });
        LeadFormField {
            id: row.id,
            user_id: row.user_id,
            handle: row.handle,
            key: row.key,
            label: row.label,
            field_type,
            required: row.required,
            placeholder: row.placeholder,
            options: row.options,
            is_hidden: row.is_hidden,
            validation: row.validation.0,
            order_index: row.order_index,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn list_fields(&self, user_id: &str, handle: &str) -> DbResult<Vec<LeadFormField>> {
        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            "SELECT {FIELD_COLUMNS} FROM lead_form_fields
             WHERE user_id = $1 AND handle = $2
             ORDER BY order_index ASC, created_at ASC"
        ))
        .bind(user_id)
        .bind(handle)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LeadFormField::from).collect())
    }

    async fn replace_fields(&self, user_id: &str, handle: &str, fields: Vec<NewField>) -> DbResult<Vec<LeadFormField>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM lead_form_fields WHERE user_id = $1 AND handle = $2")
            .bind(user_id)
            .bind(handle)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(fields.len());
        for field in fields {
            let row = sqlx::query_as::<_, FieldRow>(&format!(
                "INSERT INTO lead_form_fields
                    (id, user_id, handle, key, label, type, required, placeholder,
                     options, is_hidden, validation, order_index, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 RETURNING {FIELD_COLUMNS}"
            ))
            .bind(field.id)
            .bind(user_id)
            .bind(handle)
            .bind(&field.key)
            .bind(&field.label)
            .bind(field.field_type.as_str())
            .bind(field.required)
            .bind(field.placeholder.as_deref())
            .bind(&field.options)
            .bind(field.is_hidden)
            .bind(Json(&field.validation))
            .bind(field.order_index)
            .bind(field.is_active)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row.into());
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn delete_field(&self, user_id: &str, handle: &str, key: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM lead_form_fields WHERE user_id = $1 AND handle = $2 AND key = $3",
        )
        .bind(user_id)
        .bind(handle)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_settings(&self, user_id: &str, handle: &str) -> DbResult<Option<LeadFormSettings>> {
        let settings: Option<Json<LeadFormSettings>> = sqlx::query_scalar(
            "SELECT settings FROM lead_form_settings WHERE user_id = $1 AND handle = $2",
        )
        .bind(user_id)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(settings.map(|s| s.0))
    }

    async fn save_settings(&self, user_id: &str, handle: &str, settings: &LeadFormSettings) -> DbResult<LeadFormSettings> {
        let saved: Json<LeadFormSettings> = sqlx::query_scalar(
            "INSERT INTO lead_form_settings (id, user_id, handle, settings)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, handle) DO UPDATE
                SET settings = EXCLUDED.settings, updated_at = now()
             RETURNING settings",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(handle)
        .bind(Json(settings))
        .fetch_one(&self.pool)
        .await?;

        Ok(saved.0)
    }

    async fn insert_lead(&self, lead: NewLead) -> DbResult<Lead> {
        let row = sqlx::query_as::<_, Lead>(&format!(
            "INSERT INTO leads
                (id, user_id, handle, name, email, phone, company, message, custom_fields, source_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {LEAD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&lead.user_id)
        .bind(&lead.handle)
        .bind(lead.name.as_deref())
        .bind(lead.email.as_deref())
        .bind(lead.phone.as_deref())
        .bind(lead.company.as_deref())
        .bind(lead.message.as_deref())
        .bind(&lead.custom_fields)
        .bind(lead.source_url.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_leads(&self, user_id: &str) -> DbResult<Vec<Lead>> {
        let rows = sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

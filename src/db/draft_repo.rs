// src/db/draft_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::wizard::WizardDraft};

// Slot único de rascunho por usuário (tabela 'wizard_drafts').
// Escritas são last-write-wins; não existe merge.
#[derive(Clone)]
pub struct DraftRepository {
    pool: PgPool,
}

impl DraftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch(&self, user_id: Uuid) -> Result<Option<WizardDraft>, AppError> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT payload::text FROM wizard_drafts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(payload) => {
                let draft = serde_json::from_str(&payload)
                    .map_err(|e| anyhow::anyhow!("rascunho ilegível: {}", e))?;
                Ok(Some(draft))
            }
            None => Ok(None),
        }
    }

    pub async fn upsert(&self, user_id: Uuid, draft: &WizardDraft) -> Result<(), AppError> {
        let payload = serde_json::to_string(draft)
            .map_err(|e| anyhow::anyhow!("falha ao serializar rascunho: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO wizard_drafts (user_id, payload, saved_at)
            VALUES ($1, $2::jsonb, now())
            ON CONFLICT (user_id)
            DO UPDATE SET payload = EXCLUDED.payload, saved_at = now()
            "#,
        )
        .bind(user_id)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM wizard_drafts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

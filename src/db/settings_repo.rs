// src/db/settings_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::invoice::NotifierSettings};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Configuração do webhook de notificação (linha única).
    pub async fn get_notifier_settings(&self) -> Result<Option<NotifierSettings>, AppError> {
        let settings =
            sqlx::query_as::<_, NotifierSettings>("SELECT * FROM notifier_settings LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(settings)
    }
}

// src/services/notifier_service.rs
//
// Notificação externa de transferências (webhook de mensageria).
// Totalmente best-effort: o chamador engole qualquer erro daqui.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use crate::{common::error::AppError, db::SettingsRepository, models::invoice::TransferLog};

#[async_trait]
pub trait TransferNotifier: Send + Sync {
    async fn notify_transfer(
        &self,
        transfer: &TransferLog,
        receipt_pdf: Option<&[u8]>,
    ) -> Result<(), AppError>;
}

// Implementação contra o endpoint de mensageria configurado na tabela
// 'notifier_settings'.
pub struct WebhookNotifier {
    http: reqwest::Client,
    settings_repo: SettingsRepository,
}

impl WebhookNotifier {
    pub fn new(settings_repo: SettingsRepository) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings_repo,
        }
    }
}

#[async_trait]
impl TransferNotifier for WebhookNotifier {
    async fn notify_transfer(
        &self,
        transfer: &TransferLog,
        receipt_pdf: Option<&[u8]>,
    ) -> Result<(), AppError> {
        let settings = self
            .settings_repo
            .get_notifier_settings()
            .await?
            .ok_or_else(|| anyhow::anyhow!("configuração do notificador ausente"))?;

        let date = transfer.occurred_at.format("%d/%m/%Y").to_string();
        let time = transfer.occurred_at.format("%H:%M:%S").to_string();
        let kind = if transfer.direction == "ingreso" {
            "INGRESO"
        } else {
            "EGRESO"
        };
        let recorded_by = transfer
            .recorded_by_name
            .as_deref()
            .or(transfer.recorded_by.as_deref())
            .unwrap_or("N/A");

        let caption = format!(
            "*Nueva Transferencia Registrada*\n\n*DETALLES DEL MOVIMIENTO*\n\n\
             *Fecha:* {}\n*Hora:* {}\n\n*Tipo:* {}\n*Monto:* ${:.2}\n\n\
             *Motivo:*\n{}\n\n*Registrado por:*\n{}",
            date, time, kind, transfer.amount, transfer.reason, recorded_by
        );

        let file_name = format!(
            "TRANSFERENCIA_{}_{}.pdf",
            date.replace('/', "-"),
            time.replace(':', "-")
        );

        let media = receipt_pdf
            .map(|bytes| STANDARD.encode(bytes))
            .unwrap_or_default();

        let url = format!("{}/message/sendMedia/{}", settings.endpoint, settings.instance);
        let payload = json!({
            "number": settings.phone_number,
            "mediatype": "document",
            "mimetype": "application/pdf",
            "caption": caption,
            "media": media,
            "fileName": file_name,
            "delay": 1000,
            "linkPreview": false,
        });

        let response = self
            .http
            .post(&url)
            .header("apikey", &settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("falha ao chamar o webhook: {}", e))?;

        if !response.status().is_success() {
            return Err(
                anyhow::anyhow!("webhook respondeu {}", response.status()).into(),
            );
        }
        Ok(())
    }
}

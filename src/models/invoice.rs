// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Cabeçalho da Fatura ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub id: Uuid,

    #[schema(example = "001-002-000123")]
    pub number: String,

    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub supplier_id: Uuid,

    pub total: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,

    // Igual ao total quando o pagamento é a prazo; zero quando à vista.
    pub outstanding_balance: Decimal,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Dados para o insert do cabeçalho (o id é gerado pelo banco).
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub supplier_id: Uuid,
    pub total: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub outstanding_balance: Decimal,
    pub notes: Option<String>,
}

// --- 2. Pagamento ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,

    #[schema(example = "CONTADO - EFECTIVO")]
    pub method: String,

    #[schema(example = "Total")]
    pub kind: String,

    pub reference: Option<String>,
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- 3. Log de Transferências (auditoria) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferLog {
    pub id: Uuid,

    #[schema(example = "egreso")]
    pub direction: String,

    pub amount: Decimal,
    pub reason: String,
    pub receipt_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recorded_by: Option<String>,
    pub recorded_by_name: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewTransferLog {
    pub direction: String,
    pub amount: Decimal,
    pub reason: String,
    pub receipt_url: Option<String>,
    pub recorded_by: Option<String>,
    pub recorded_by_name: Option<String>,
    pub user_id: Option<Uuid>,
}

// --- 4. Configuração do Notificador ---
// Linha única da tabela 'notifier_settings' com os dados do webhook.
#[derive(Debug, Clone, FromRow)]
pub struct NotifierSettings {
    pub id: i32,
    pub endpoint: String,
    pub instance: String,
    pub phone_number: String,
    pub api_key: String,
}

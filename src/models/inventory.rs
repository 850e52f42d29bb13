// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Registro de Inventário ---
// Linha da tabela 'inventory'. O 'code' é a chave natural usada pela
// reconciliação; 'stock' só é incrementado por este fluxo, nunca reduzido.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub id: Uuid,

    #[schema(example = "100")]
    pub code: String,

    #[schema(example = "MARTILLO 16OZ")]
    pub product_name: String,

    pub supplier_price: Decimal,
    pub sale_price: Decimal,
    pub zone: Option<i32>,
    pub stock: Decimal,
    pub min_stock: Decimal,

    #[schema(example = "UNIDADES")]
    pub unit_type: String,

    pub supplier_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Linha de Upsert ---
// Linha montada pela reconciliação para o "insert-or-update-by-code".
// Para registros existentes, os campos vêm preenchidos com os valores
// anteriores como fallback (nunca sobrescrevemos com vazio).
#[derive(Debug, Clone)]
pub struct InventoryUpsertRow {
    pub code: String,
    pub product_name: String,
    pub supplier_price: Decimal,
    pub sale_price: Decimal,
    pub zone: Option<i32>,
    pub stock: Decimal,
    pub min_stock: Decimal,
    pub unit_type: String,
    pub supplier_id: Option<Uuid>,
}

// --- 3. Resultado da Reconciliação ---

// 'to_update' e 'to_insert' são estados provisórios; viram
// 'updated'/'inserted' quando a fase correspondente confirma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    ToUpdate,     // Vira "to_update"
    ToInsert,     // Vira "to_insert"
    Updated,      // Vira "updated"
    Inserted,     // Vira "inserted"
    UpdateFailed, // Vira "update_failed"
    Failed,       // Vira "failed"
}

// Um resultado por item da fatura, com os dados que o resumo final exibe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub code: String,
    pub action: ReconcileAction,
    pub product_name: Option<String>,
    pub previous_stock: Option<Decimal>,
    pub new_stock: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub detail: Option<String>,
}

impl ReconcileResult {
    pub fn new(code: impl Into<String>, action: ReconcileAction) -> Self {
        Self {
            code: code.into(),
            action,
            product_name: None,
            previous_stock: None,
            new_stock: None,
            quantity: None,
            detail: None,
        }
    }
}

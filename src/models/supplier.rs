// src/models/supplier.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::wizard::SupplierRef;

// Fornecedor cadastrado (tabela 'suppliers').
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,

    #[schema(example = "PRV01")]
    pub code: String,

    #[schema(example = "ACME Ferretería")]
    pub company_name: String,

    pub salesperson: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    // Projeção mínima que o assistente guarda no estado (e no rascunho).
    pub fn to_ref(&self) -> SupplierRef {
        SupplierRef {
            id: self.id,
            code: self.code.clone(),
            company_name: self.company_name.clone(),
        }
    }
}

// src/db/inventory_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{InventoryRecord, InventoryUpsertRow},
    services::inventory_service::InventoryGateway,
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Procedimento remoto que sugere o próximo código numérico livre.
    // O ajuste para a faixa manual fica no serviço do assistente.
    pub async fn suggest_next_code(&self) -> Result<String, AppError> {
        let code = sqlx::query_scalar::<_, String>("SELECT suggest_next_code()")
            .fetch_one(&self.pool)
            .await?;
        Ok(code)
    }
}

#[async_trait]
impl InventoryGateway for InventoryRepository {
    // Snapshot completo, na ordem em que a busca exibe os produtos.
    async fn list_all(&self) -> Result<Vec<InventoryRecord>, AppError> {
        let records =
            sqlx::query_as::<_, InventoryRecord>("SELECT * FROM inventory ORDER BY product_name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(records)
    }

    // O chamador fatia os códigos em chunks; aqui é uma busca direta.
    async fn fetch_by_codes(&self, codes: &[String]) -> Result<Vec<InventoryRecord>, AppError> {
        let records =
            sqlx::query_as::<_, InventoryRecord>("SELECT * FROM inventory WHERE code = ANY($1)")
                .bind(codes)
                .fetch_all(&self.pool)
                .await?;
        Ok(records)
    }

    // "Insert-or-update-by-code" em um único lote. O estoque fica de fora
    // do UPDATE: linhas existentes preservam o valor atual e só os inserts
    // novos usam o estoque informado.
    async fn upsert_rows(
        &self,
        rows: &[InventoryUpsertRow],
    ) -> Result<Vec<InventoryRecord>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO inventory \
             (code, product_name, supplier_price, sale_price, zone, stock, min_stock, unit_type, supplier_id) ",
        );
        builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.code)
                .push_bind(&row.product_name)
                .push_bind(row.supplier_price)
                .push_bind(row.sale_price)
                .push_bind(row.zone)
                .push_bind(row.stock)
                .push_bind(row.min_stock)
                .push_bind(&row.unit_type)
                .push_bind(row.supplier_id);
        });
        builder.push(
            " ON CONFLICT (code) DO UPDATE SET \
             product_name = EXCLUDED.product_name, \
             supplier_price = EXCLUDED.supplier_price, \
             sale_price = EXCLUDED.sale_price, \
             zone = EXCLUDED.zone, \
             min_stock = EXCLUDED.min_stock, \
             unit_type = EXCLUDED.unit_type, \
             supplier_id = EXCLUDED.supplier_id, \
             updated_at = now() \
             RETURNING *",
        );

        let records = builder
            .build_query_as::<InventoryRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    // Grava o novo saldo de um item (incremento calculado pelo serviço).
    async fn set_stock(&self, id: Uuid, stock: Decimal) -> Result<(), AppError> {
        sqlx::query("UPDATE inventory SET stock = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(stock)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// src/db/supplier_repo.rs

use sqlx::PgPool;

use crate::{common::error::AppError, models::supplier::Supplier};

// O repositório de fornecedores, responsável pelas interações com a tabela 'suppliers'
#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Lista completa, na ordem em que o passo 1 exibe os fornecedores.
    pub async fn list_all(&self) -> Result<Vec<Supplier>, AppError> {
        let suppliers =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY company_name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(suppliers)
    }

    // Cria um fornecedor novo (fluxo do modal no passo 1).
    pub async fn create(
        &self,
        code: &str,
        company_name: &str,
        salesperson: Option<&str>,
        contact: Option<&str>,
    ) -> Result<Supplier, AppError> {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (code, company_name, salesperson, contact)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(company_name)
        .bind(salesperson)
        .bind(contact)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::SupplierCodeAlreadyExists(code.to_string());
                }
            }
            e.into()
        })
    }
}

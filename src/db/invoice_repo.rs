// src/db/invoice_repo.rs

use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        invoice::{InvoiceHeader, NewInvoice, NewTransferLog, Payment, TransferLog},
        wizard::LineItem,
    },
};

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Insere o cabeçalho e devolve a linha completa (com o id gerado).
    pub async fn insert_header(&self, invoice: &NewInvoice) -> Result<InvoiceHeader, AppError> {
        let header = sqlx::query_as::<_, InvoiceHeader>(
            r#"
            INSERT INTO invoices
                (number, issue_date, due_date, supplier_id, total, tax, discount, outstanding_balance, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&invoice.number)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.supplier_id)
        .bind(invoice.total)
        .bind(invoice.tax)
        .bind(invoice.discount)
        .bind(invoice.outstanding_balance)
        .bind(&invoice.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(header)
    }

    // Insere todas as linhas de detalhe da fatura em um único lote.
    pub async fn insert_line_items(
        &self,
        invoice_id: Uuid,
        items: &[LineItem],
    ) -> Result<(), AppError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO invoice_line_items \
             (invoice_id, product_id, product_code, product_name, quantity, supplier_price, \
              sale_price, margin_percent, zone, is_new_product) ",
        );
        builder.push_values(items, |mut b, item| {
            let zone = item.zone.as_deref().and_then(|z| z.parse::<i32>().ok());
            b.push_bind(invoice_id)
                .push_bind(item.product_id)
                .push_bind(&item.code)
                .push_bind(&item.name)
                .push_bind(item.quantity)
                .push_bind(item.supplier_price)
                .push_bind(item.sale_price)
                .push_bind(item.margin_percent)
                .push_bind(zone)
                .push_bind(item.is_new_product);
        });

        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    // Registra o pagamento de contado que liquida a fatura inteira.
    pub async fn insert_payment(
        &self,
        invoice_id: Uuid,
        amount: rust_decimal::Decimal,
        method: &str,
        reference: &str,
    ) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (invoice_id, amount, method, kind, reference, new_balance)
            VALUES ($1, $2, $3, 'Total', $4, 0)
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(amount)
        .bind(method)
        .bind(reference)
        .fetch_one(&self.pool)
        .await?;
        Ok(payment)
    }

    // Registra a transferência no log de auditoria.
    pub async fn insert_transfer(&self, transfer: &NewTransferLog) -> Result<TransferLog, AppError> {
        let row = sqlx::query_as::<_, TransferLog>(
            r#"
            INSERT INTO transfers_log
                (direction, amount, reason, receipt_url, recorded_by, recorded_by_name, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&transfer.direction)
        .bind(transfer.amount)
        .bind(&transfer.reason)
        .bind(&transfer.receipt_url)
        .bind(&transfer.recorded_by)
        .bind(&transfer.recorded_by_name)
        .bind(transfer.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

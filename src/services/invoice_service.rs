// src/services/invoice_service.rs
//
// Orquestração da submissão da fatura. Escritas dependentes em sequência
// (cabeçalho antes de detalhes, detalhes antes de pagamento); não há
// transação entre tabelas: uma queda depois do cabeçalho deixa a fatura
// gravada sem efeito no inventário, e o operador reconcilia manualmente.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::InvoiceRepository,
    models::{
        auth::CurrentUser,
        inventory::ReconcileResult,
        invoice::{InvoiceHeader, NewInvoice, NewTransferLog},
        wizard::{WizardState, WizardStep},
    },
    services::{
        document_service::{DocumentService, ReceiptData},
        inventory_service::InventoryService,
        notifier_service::TransferNotifier,
        wizard_service,
    },
};

/// Resumo devolvido ao cliente depois da submissão: a fatura gravada, a
/// tabela de efeitos no inventário e os avisos não fatais.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub invoice: InvoiceHeader,
    pub reconciliation: Vec<ReconcileResult>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct InvoiceService {
    invoice_repo: InvoiceRepository,
    inventory_service: InventoryService,
    document_service: DocumentService,
    notifier: Arc<dyn TransferNotifier>,
}

impl InvoiceService {
    pub fn new(
        invoice_repo: InvoiceRepository,
        inventory_service: InventoryService,
        document_service: DocumentService,
        notifier: Arc<dyn TransferNotifier>,
    ) -> Self {
        Self {
            invoice_repo,
            inventory_service,
            document_service,
            notifier,
        }
    }

    pub async fn submit(
        &self,
        state: &WizardState,
        user: &CurrentUser,
    ) -> Result<SubmissionSummary, AppError> {
        let supplier = state
            .selected_supplier
            .clone()
            .ok_or(AppError::SupplierNotSelected)?;

        for step in [
            WizardStep::Supplier,
            WizardStep::InvoiceMeta,
            WizardStep::PaymentMethod,
            WizardStep::LineItems,
        ] {
            if !wizard_service::is_step_valid(state, step) {
                return Err(AppError::WizardIncomplete(format!(
                    "O passo {} ainda não está válido.",
                    step.number()
                )));
            }
        }

        let method = state
            .payment_method
            .ok_or_else(|| AppError::WizardIncomplete("Método de pagamento ausente.".to_string()))?;

        let (issue_date, due_date) = wizard_service::parsed_dates(state)?;
        let totals = wizard_service::compute_totals(state);
        let deferred = method.is_deferred();

        let notes = state.invoice_meta.notes.trim();
        let new_invoice = NewInvoice {
            number: state.invoice_meta.number.clone(),
            issue_date,
            due_date,
            supplier_id: supplier.id,
            total: totals.total,
            tax: totals.tax,
            discount: totals.discount,
            // A prazo, o saldo pendente é o total; à vista, zero.
            outstanding_balance: if deferred { totals.total } else { Decimal::ZERO },
            notes: if notes.is_empty() {
                None
            } else {
                Some(notes.to_string())
            },
        };

        // --- CAMINHO CRÍTICO ---
        // Qualquer erro aqui aborta a submissão inteira.
        let header = self.invoice_repo.insert_header(&new_invoice).await?;
        self.invoice_repo
            .insert_line_items(header.id, &state.line_items)
            .await?;

        if !deferred {
            self.invoice_repo
                .insert_payment(header.id, header.total, method.as_str(), &header.number)
                .await?;

            if method.is_transfer() {
                // Comprovante, log de transferência e webhook: best-effort.
                self.record_transfer_extras(&header, &supplier.company_name, user)
                    .await;
            }
        }

        // --- EFEITOS NO INVENTÁRIO ---
        // A fatura já está gravada; daqui em diante nada desfaz as escritas
        // anteriores, só reportamos o que conseguimos aplicar.
        let outcome = self
            .inventory_service
            .reconcile_line_items(&state.line_items, Some(supplier.id))
            .await;

        let mut warnings = Vec::new();
        if !outcome.missing_stock.is_empty() {
            warnings.push(format!(
                "Não foi possível criar/atualizar alguns produtos: faltam quantidades para {}. \
                 Revise os produtos e aplique o estoque manualmente.",
                outcome.missing_stock.join(", ")
            ));
        }

        Ok(SubmissionSummary {
            invoice: header,
            reconciliation: outcome.results,
            warnings,
        })
    }

    // Nada daqui pode derrubar a submissão: falhas viram warn no log.
    async fn record_transfer_extras(
        &self,
        header: &InvoiceHeader,
        supplier_name: &str,
        user: &CurrentUser,
    ) {
        let receipt = ReceiptData {
            supplier_name: supplier_name.to_string(),
            invoice_number: header.number.clone(),
            amount: header.total,
            date: header.issue_date,
        };
        let receipt_pdf = match self.document_service.transfer_receipt_pdf(&receipt) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Falha ao gerar o comprovante de transferência: {}", e);
                None
            }
        };

        let transfer = NewTransferLog {
            direction: "egreso".to_string(),
            amount: header.total,
            reason: format!(
                "Pago a {} por el pago de la factura {} con el valor de ${:.2}",
                supplier_name, header.number, header.total
            ),
            receipt_url: None,
            recorded_by: Some(user.email.clone()),
            recorded_by_name: user.name.clone(),
            user_id: Some(user.id),
        };

        let inserted = match self.invoice_repo.insert_transfer(&transfer).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Falha ao registrar a transferência: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .notifier
            .notify_transfer(&inserted, receipt_pdf.as_deref())
            .await
        {
            tracing::warn!("Notificação de transferência falhou: {}", e);
        }
    }
}

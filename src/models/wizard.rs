// src/models/wizard.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{inventory::InventoryRecord, supplier::Supplier};

// --- 1. Passos do Assistente ---
// Fluxo linear de 5 passos. Só avançamos se o passo atual validar;
// voltar é sempre permitido.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(into = "u8", try_from = "u8")]
pub enum WizardStep {
    Supplier,
    InvoiceMeta,
    PaymentMethod,
    LineItems,
    Summary,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::Supplier => 1,
            WizardStep::InvoiceMeta => 2,
            WizardStep::PaymentMethod => 3,
            WizardStep::LineItems => 4,
            WizardStep::Summary => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(WizardStep::Supplier),
            2 => Some(WizardStep::InvoiceMeta),
            3 => Some(WizardStep::PaymentMethod),
            4 => Some(WizardStep::LineItems),
            5 => Some(WizardStep::Summary),
            _ => None,
        }
    }

}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> u8 {
        step.number()
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        WizardStep::from_number(n).ok_or_else(|| format!("passo inválido: {}", n))
    }
}

// --- 2. Método de Pagamento ---
// Os valores de fio são os mesmos que o sistema sempre usou.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentMethod {
    #[serde(rename = "PLAZO")]
    Plazo,
    #[serde(rename = "CONTADO - EFECTIVO")]
    ContadoEfectivo,
    #[serde(rename = "CONTADO - TRANSFERENCIA")]
    ContadoTransferencia,
}

impl PaymentMethod {
    // Pagamento a prazo: o saldo da fatura fica pendente.
    pub fn is_deferred(self) -> bool {
        matches!(self, PaymentMethod::Plazo)
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, PaymentMethod::ContadoTransferencia)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Plazo => "PLAZO",
            PaymentMethod::ContadoEfectivo => "CONTADO - EFECTIVO",
            PaymentMethod::ContadoTransferencia => "CONTADO - TRANSFERENCIA",
        }
    }

    // Rótulo legível para o resumo.
    pub fn display_label(self) -> &'static str {
        match self {
            PaymentMethod::Plazo => "Plazo",
            PaymentMethod::ContadoEfectivo => "Contado (Efectivo)",
            PaymentMethod::ContadoTransferencia => "Contado (Transferencia)",
        }
    }
}

// --- 3. Fornecedor Selecionado ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRef {
    pub id: Uuid,
    pub code: String,
    pub company_name: String,
}

// --- 4. Item da Fatura ---
// 'code' é chave de negócio única dentro da lista: adicionar um código
// repetido incrementa a quantidade do item existente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    // None para produtos ainda não cadastrados no inventário.
    pub product_id: Option<Uuid>,

    #[schema(example = "100")]
    pub code: String,

    // Sempre normalizado para maiúsculas.
    #[schema(example = "MARTILLO 16OZ")]
    pub name: String,

    pub quantity: Decimal,
    pub supplier_price: Decimal,
    pub sale_price: Decimal,

    // None quando o par de preços não corresponde a nenhum degrau conhecido.
    pub margin_percent: Option<Decimal>,

    // String numérica ("1".."18") ou None.
    pub zone: Option<String>,

    pub is_new_product: bool,

    #[serde(default)]
    pub min_stock: Option<Decimal>,

    #[serde(default)]
    pub unit_type: Option<String>,

    // quantity * supplier_price, recalculado a cada mutação.
    pub subtotal: Decimal,
}

// --- 5. Dados da Fatura (formulário do passo 2) ---
// Datas ficam como strings canônicas YYYY-MM-DD; a conversão para
// NaiveDate acontece só na submissão.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMetaForm {
    pub number: String,
    pub issue_date: String,
    pub due_date: String,
    pub notes: String,
}

// --- 6. Estado do Assistente ---
// Um agregado mutável por sessão de usuário. Criado na entrada do
// assistente, destruído (reiniciado) após submissão ou reset explícito.
#[derive(Debug, Clone)]
pub struct WizardState {
    pub current_step: WizardStep,
    pub selected_supplier: Option<SupplierRef>,
    pub payment_method: Option<PaymentMethod>,
    pub line_items: Vec<LineItem>,
    pub discount: Decimal,
    pub invoice_meta: InvoiceMetaForm,

    // Cache somente-leitura do inventário, carregado uma vez por sessão.
    // Serve apenas para busca/correspondência; nunca é escrito.
    pub inventory_snapshot: Vec<InventoryRecord>,

    // Lista pré-carregada de fornecedores (entrada da inicialização).
    pub suppliers: Vec<Supplier>,
}

impl WizardState {
    pub fn new(suppliers: Vec<Supplier>, inventory_snapshot: Vec<InventoryRecord>) -> Self {
        Self {
            current_step: WizardStep::Supplier,
            selected_supplier: None,
            payment_method: None,
            line_items: Vec::new(),
            discount: Decimal::ZERO,
            invoice_meta: InvoiceMetaForm::default(),
            inventory_snapshot,
            suppliers,
        }
    }
}

// --- 7. Totais do Resumo ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

// --- 8. Documento de Rascunho ---
// Formato persistido no slot único de rascunho (um por usuário).
// As chaves são as históricas do documento; mantê-las estáveis permite
// restaurar rascunhos gravados por versões anteriores do sistema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardDraft {
    #[serde(rename = "pasoActual")]
    pub step: u8,

    #[serde(rename = "proveedorSeleccionado")]
    pub selected_supplier: Option<SupplierRef>,

    #[serde(rename = "metodoPago")]
    pub payment_method: Option<PaymentMethod>,

    #[serde(rename = "productosEnFactura")]
    pub line_items: Vec<LineItem>,

    #[serde(rename = "descuento")]
    pub discount: Decimal,

    #[serde(rename = "datosFactura")]
    pub invoice_data: DraftInvoiceData,

    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftInvoiceData {
    #[serde(rename = "numero")]
    pub number: String,

    // Normalizadas para YYYY-MM-DD independentemente do formato de entrada.
    #[serde(rename = "fechaEmision")]
    pub issue_date: String,

    #[serde(rename = "fechaVencimiento")]
    pub due_date: String,

    #[serde(rename = "notas")]
    pub notes: String,
}

// src/services/wizard_service.rs
//
// Máquina de estados do assistente de ingresso de faturas: estado puro +
// funções de transição, sem nada de HTTP nem de banco. Os handlers apenas
// roteiam intenções para cá e projetam o estado de volta ao cliente.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        inventory::InventoryRecord,
        wizard::{
            DraftInvoiceData, InvoiceMetaForm, LineItem, PaymentMethod, SupplierRef, Totals,
            WizardDraft, WizardState, WizardStep,
        },
    },
    services::pricing,
};

use serde::Serialize;
use utoipa::ToSchema;

// Janela de validade do rascunho.
pub const DRAFT_MAX_AGE_HOURS: i64 = 24;

// IVA fixo aplicado no resumo e na submissão.
fn tax_rate() -> Decimal {
    Decimal::new(15, 2) // 0.15
}

// =====================================================
// NAVEGAÇÃO ENTRE PASSOS
// =====================================================

// Valida um passo específico sem depender do passo atual.
pub fn is_step_valid(state: &WizardState, step: WizardStep) -> bool {
    match step {
        WizardStep::Supplier => state.selected_supplier.is_some(),

        WizardStep::InvoiceMeta => {
            // Requer fornecedor selecionado, número e ambas as datas.
            // A ordem das datas NÃO bloqueia: vira apenas um aviso
            // (ver date_order_warning).
            state.selected_supplier.is_some()
                && !state.invoice_meta.number.trim().is_empty()
                && !state.invoice_meta.issue_date.is_empty()
                && !state.invoice_meta.due_date.is_empty()
        }

        WizardStep::PaymentMethod => state.payment_method.is_some(),

        WizardStep::LineItems => !state.line_items.is_empty(),

        WizardStep::Summary => true,
    }
}

pub fn validate_current(state: &WizardState) -> bool {
    is_step_valid(state, state.current_step)
}

// Aviso não bloqueante: vencimento anterior à emissão.
pub fn date_order_warning(state: &WizardState) -> bool {
    let issue = NaiveDate::parse_from_str(&state.invoice_meta.issue_date, "%Y-%m-%d");
    let due = NaiveDate::parse_from_str(&state.invoice_meta.due_date, "%Y-%m-%d");
    matches!((issue, due), (Ok(i), Ok(d)) if d < i)
}

/// Navegação direta: sempre é permitido voltar; avançar só para o passo
/// imediatamente seguinte e só se o passo atual validar. Qualquer outra
/// tentativa é ignorada (retorna false sem alterar o estado).
pub fn goto_step(state: &mut WizardState, target: WizardStep) -> bool {
    if target == state.current_step {
        return true;
    }
    if target < state.current_step {
        state.current_step = target;
        return true;
    }
    if target.number() == state.current_step.number() + 1 && validate_current(state) {
        state.current_step = target;
        return true;
    }
    false
}

// =====================================================
// PASSO 1: FORNECEDOR
// =====================================================

pub fn select_supplier(state: &mut WizardState, supplier: SupplierRef) {
    state.selected_supplier = Some(supplier);

    // Avança automaticamente ao passo 2 (o atraso de confirmação visual
    // é responsabilidade do cliente).
    if state.current_step == WizardStep::Supplier {
        state.current_step = WizardStep::InvoiceMeta;
    }
}

pub fn clear_supplier(state: &mut WizardState) {
    state.selected_supplier = None;
    state.current_step = WizardStep::Supplier;
}

// =====================================================
// PASSO 2: DADOS DA FATURA
// =====================================================

/// Atualiza o formulário do passo 2 e devolve o aviso de ordem de datas.
pub fn set_invoice_meta(
    state: &mut WizardState,
    number: &str,
    issue_date: &str,
    due_date: &str,
    notes: &str,
) -> bool {
    state.invoice_meta = InvoiceMetaForm {
        number: number.trim().to_string(),
        issue_date: normalize_date_input(issue_date),
        due_date: normalize_date_input(due_date),
        notes: notes.to_string(),
    };
    date_order_warning(state)
}

/// Normaliza valores de data para o formato canônico YYYY-MM-DD.
/// Aceita YYYY-MM-DD, M/D/YYYY e timestamps RFC 3339; qualquer outra
/// coisa vira string vazia.
pub fn normalize_date_input(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return value.to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%Y") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    String::new()
}

// Datas parseadas para a submissão.
pub fn parsed_dates(state: &WizardState) -> Result<(NaiveDate, NaiveDate), AppError> {
    let issue = NaiveDate::parse_from_str(&state.invoice_meta.issue_date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInvoiceDate(state.invoice_meta.issue_date.clone()))?;
    let due = NaiveDate::parse_from_str(&state.invoice_meta.due_date, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInvoiceDate(state.invoice_meta.due_date.clone()))?;
    Ok((issue, due))
}

// =====================================================
// PASSO 3: MÉTODO DE PAGAMENTO
// =====================================================

pub fn set_payment_method(state: &mut WizardState, method: PaymentMethod) {
    state.payment_method = Some(method);
}

// =====================================================
// PASSO 4: PRODUTOS
// =====================================================

/// Resultado da busca de produtos sobre o snapshot do inventário.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SearchOutcome {
    /// Menos de 2 caracteres: não buscamos ainda.
    TooShort,
    /// Nada encontrado.
    NotFound,
    /// O produto foi adicionado diretamente à fatura.
    Added { code: String },
    /// Lista de correspondências (máximo 10).
    Matches { results: Vec<InventoryRecord> },
    /// Correspondência exata de 4 dígitos aguardando Enter.
    Suggestion { result: InventoryRecord },
    /// Código de barras sem correspondência; aguardando Enter para criar.
    HintCreate { code: String },
    /// Enter confirmado: abrir o fluxo de produto novo com este código.
    PromptCreate { code: String },
}

/// Busca no snapshot com o comportamento de leitor de código de barras:
/// entradas só-dígitos longas são tratadas como scan (adição direta),
/// 4 dígitos só adicionam com Enter explícito, o resto é busca por
/// substring em código ou nome.
pub fn search_products(state: &mut WizardState, term: &str, pressed_enter: bool) -> SearchOutcome {
    let term = term.trim();
    if term.chars().count() < 2 {
        return SearchOutcome::TooShort;
    }

    let is_numeric = term.chars().all(|c| c.is_ascii_digit());

    if is_numeric {
        if term.len() >= 5 {
            // Scan de código de barras: correspondência exata adiciona.
            if let Some(record) = find_snapshot(state, term) {
                add_from_record(state, &record);
                return SearchOutcome::Added {
                    code: record.code,
                };
            }
            // Sem correspondência: só abrimos o fluxo de criação com Enter
            // explícito, para não disparar com leituras fragmentadas.
            return if pressed_enter {
                SearchOutcome::PromptCreate { code: term.to_string() }
            } else {
                SearchOutcome::HintCreate { code: term.to_string() }
            };
        }

        if term.len() == 4 {
            return match find_snapshot(state, term) {
                Some(record) if pressed_enter => {
                    add_from_record(state, &record);
                    SearchOutcome::Added { code: record.code }
                }
                Some(record) => SearchOutcome::Suggestion { result: record },
                None => SearchOutcome::NotFound,
            };
        }
        // 2 ou 3 dígitos caem na busca normal abaixo.
    }

    let lower = term.to_lowercase();
    let filtered: Vec<InventoryRecord> = state
        .inventory_snapshot
        .iter()
        .filter(|p| {
            p.code.to_lowercase().contains(&lower)
                || p.product_name.to_lowercase().contains(&lower)
        })
        .take(10)
        .cloned()
        .collect();

    if filtered.is_empty() {
        return SearchOutcome::NotFound;
    }

    if pressed_enter && term.chars().any(|c| c.is_alphabetic()) {
        let first = filtered[0].clone();
        add_from_record(state, &first);
        return SearchOutcome::Added { code: first.code };
    }

    SearchOutcome::Matches { results: filtered }
}

fn find_snapshot(state: &WizardState, code: &str) -> Option<InventoryRecord> {
    state
        .inventory_snapshot
        .iter()
        .find(|p| p.code == code)
        .cloned()
}

// Código repetido: incrementa a quantidade e move o item para o topo.
fn bump_existing(state: &mut WizardState, code: &str, quantity: Decimal) -> bool {
    if let Some(pos) = state.line_items.iter().position(|i| i.code == code) {
        let mut item = state.line_items.remove(pos);
        item.quantity += quantity;
        item.subtotal = item.quantity * item.supplier_price;
        state.line_items.insert(0, item);
        return true;
    }
    false
}

/// Adiciona um item da fatura a partir de um código do snapshot.
pub fn add_from_inventory(state: &mut WizardState, code: &str) -> Result<(), AppError> {
    let record = find_snapshot(state, code)
        .ok_or_else(|| AppError::UnknownProductCode(code.to_string()))?;
    add_from_record(state, &record);
    Ok(())
}

/// Adiciona (ou incrementa) um item a partir de um registro de inventário.
/// Itens novos entram no topo da lista.
pub fn add_from_record(state: &mut WizardState, record: &InventoryRecord) {
    if bump_existing(state, &record.code, Decimal::ONE) {
        return;
    }

    let supplier_price = record.supplier_price;
    let sale_price = if record.sale_price > Decimal::ZERO {
        record.sale_price
    } else {
        pricing::suggested_sale_price(supplier_price)
    };

    let item = LineItem {
        product_id: Some(record.id),
        code: record.code.clone(),
        name: record.product_name.trim().to_uppercase(),
        quantity: Decimal::ONE,
        supplier_price,
        sale_price,
        margin_percent: pricing::nearest_margin_tier(supplier_price, sale_price),
        zone: record.zone.map(|z| z.to_string()),
        is_new_product: false,
        min_stock: None,
        unit_type: None,
        subtotal: supplier_price,
    };
    state.line_items.insert(0, item);
}

/// Entrada do fluxo "produto novo" (ainda sem cadastro no inventário).
#[derive(Debug, Clone)]
pub struct NewProductInput {
    pub code: String,
    pub name: String,
    pub quantity: Decimal,
    pub supplier_price: Decimal,
    pub sale_price: Decimal,
    pub zone: Option<String>,
    pub min_stock: Decimal,
    pub unit_type: Option<String>,
}

pub fn add_new_product(state: &mut WizardState, input: NewProductInput) {
    let code = input.code.trim().to_string();
    let quantity = if input.quantity <= Decimal::ZERO {
        Decimal::ONE
    } else {
        input.quantity
    };

    if bump_existing(state, &code, quantity) {
        return;
    }

    // Sem preço de venda informado, sugerimos com a margem padrão.
    let sale_price = if input.sale_price <= Decimal::ZERO {
        pricing::suggested_sale_price(input.supplier_price)
    } else {
        input.sale_price
    };

    let item = LineItem {
        product_id: None,
        code,
        name: input.name.trim().to_uppercase(),
        quantity,
        supplier_price: input.supplier_price,
        sale_price,
        // Produtos novos ficam marcados com a margem padrão.
        margin_percent: Some(Decimal::from(pricing::DEFAULT_MARGIN)),
        zone: input.zone.as_deref().and_then(normalize_zone),
        is_new_product: true,
        min_stock: Some(input.min_stock),
        unit_type: Some(
            input
                .unit_type
                .unwrap_or_else(|| "UNIDADES".to_string()),
        ),
        subtotal: quantity * input.supplier_price,
    };
    state.line_items.insert(0, item);
}

/// Deriva a versão "UNIDADES" de um item empacotado: código com sufixo 001
/// e nome base com " -UNIDADES". Só vale para códigos curtos (< 6) que
/// ainda não têm a versão na fatura.
pub fn add_unit_variant(state: &mut WizardState, code: &str) -> Result<String, AppError> {
    let item = state
        .line_items
        .iter()
        .find(|i| i.code == code)
        .ok_or_else(|| AppError::LineItemNotFound(code.to_string()))?;

    if code.len() >= 6 || item.unit_type.as_deref() == Some("UNIDADES") {
        return Err(AppError::UnitVariantNotAllowed(code.to_string()));
    }

    let base_name = strip_variant_suffix(&item.name);
    let zone = item.zone.clone();
    let variant_code = format!("{}001", code);

    if state.line_items.iter().any(|i| i.code == variant_code) {
        return Err(AppError::UnitVariantAlreadyAdded(base_name));
    }

    if let Some(record) = find_snapshot(state, &variant_code) {
        add_from_record(state, &record);
    } else {
        let item = LineItem {
            product_id: None,
            code: variant_code.clone(),
            name: format!("{} -UNIDADES", base_name),
            quantity: Decimal::ONE,
            supplier_price: Decimal::ZERO,
            sale_price: Decimal::ZERO,
            margin_percent: None,
            zone,
            is_new_product: false,
            min_stock: None,
            unit_type: None,
            subtotal: Decimal::ZERO,
        };
        state.line_items.insert(0, item);
    }

    Ok(variant_code)
}

// Remove o sufixo final " -XXX" do nome ("CLAVOS -CAJA" -> "CLAVOS").
fn strip_variant_suffix(name: &str) -> String {
    if let Some(pos) = name.rfind(" -") {
        let suffix = &name[pos + 2..];
        if !suffix.is_empty() && !suffix.contains('-') && pos > 0 {
            return name[..pos].trim().to_string();
        }
    }
    name.trim().to_string()
}

/// Alterações de campos de um item já na fatura.
#[derive(Debug, Clone, Default)]
pub struct LineItemPatch {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub supplier_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub zone: Option<String>,
}

pub fn update_item(state: &mut WizardState, code: &str, patch: LineItemPatch) -> Result<(), AppError> {
    let item = state
        .line_items
        .iter_mut()
        .find(|i| i.code == code)
        .ok_or_else(|| AppError::LineItemNotFound(code.to_string()))?;

    if let Some(name) = patch.name {
        item.name = name.trim().to_uppercase();
    }

    if let Some(quantity) = patch.quantity {
        item.quantity = quantity.max(Decimal::ZERO);
    }

    if let Some(supplier_price) = patch.supplier_price {
        item.supplier_price = supplier_price.max(Decimal::ZERO);
        match item.margin_percent {
            // Margem ativa permanece estável: rederiva o preço de venda.
            Some(margin) => {
                item.sale_price = pricing::price_from_margin(item.supplier_price, margin);
            }
            // Sem margem ativa, sugere com a margem padrão.
            None => {
                item.sale_price = pricing::suggested_sale_price(item.supplier_price);
                item.margin_percent =
                    pricing::nearest_margin_tier(item.supplier_price, item.sale_price);
            }
        }
    }

    if let Some(sale_price) = patch.sale_price {
        item.sale_price = sale_price.max(Decimal::ZERO);
        item.margin_percent = pricing::nearest_margin_tier(item.supplier_price, item.sale_price);
    }

    if let Some(zone) = patch.zone {
        item.zone = normalize_zone(&zone);
    }

    item.subtotal = item.quantity * item.supplier_price;
    Ok(())
}

/// Aplica um degrau de margem a um item (botões de porcentagem).
pub fn apply_margin_tier(
    state: &mut WizardState,
    code: &str,
    margin: Decimal,
) -> Result<(), AppError> {
    let item = state
        .line_items
        .iter_mut()
        .find(|i| i.code == code)
        .ok_or_else(|| AppError::LineItemNotFound(code.to_string()))?;

    item.sale_price = pricing::price_from_margin(item.supplier_price, margin);
    item.margin_percent = Some(margin);
    item.subtotal = item.quantity * item.supplier_price;
    Ok(())
}

/// Aplica o preço sugerido (margem padrão) a um item.
pub fn apply_suggested_price(state: &mut WizardState, code: &str) -> Result<(), AppError> {
    let item = state
        .line_items
        .iter_mut()
        .find(|i| i.code == code)
        .ok_or_else(|| AppError::LineItemNotFound(code.to_string()))?;

    item.sale_price = pricing::suggested_sale_price(item.supplier_price);
    item.margin_percent = pricing::nearest_margin_tier(item.supplier_price, item.sale_price)
        .or(Some(Decimal::from(pricing::DEFAULT_MARGIN)));
    item.subtotal = item.quantity * item.supplier_price;
    Ok(())
}

pub fn remove_item(state: &mut WizardState, code: &str) -> Result<(), AppError> {
    let pos = state
        .line_items
        .iter()
        .position(|i| i.code == code)
        .ok_or_else(|| AppError::LineItemNotFound(code.to_string()))?;
    state.line_items.remove(pos);
    Ok(())
}

// Zonas chegam como "5" ou "ZONA 5"; guardamos só a parte numérica.
pub fn normalize_zone(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if !digits.is_empty() {
        return Some(digits);
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =====================================================
// PASSO 5: RESUMO
// =====================================================

/// Normaliza a entrada de desconto: vírgula vira ponto, caracteres não
/// numéricos caem fora e só o primeiro ponto sobrevive.
pub fn parse_discount(raw: &str) -> Decimal {
    let mut normalized: String = raw
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if let Some(first_dot) = normalized.find('.') {
        let head = normalized[..=first_dot].to_string();
        let tail: String = normalized[first_dot + 1..]
            .chars()
            .filter(|c| *c != '.')
            .collect();
        normalized = head + &tail;
    }

    normalized.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

pub fn set_discount(state: &mut WizardState, raw: &str) {
    state.discount = parse_discount(raw);
}

/// Totais exibidos no resumo. O total nunca fica negativo, por maior que
/// seja o desconto.
pub fn compute_totals(state: &WizardState) -> Totals {
    let subtotal: Decimal = state.line_items.iter().map(|i| i.subtotal).sum();
    let tax = subtotal * tax_rate();
    let mut total = subtotal + tax - state.discount;
    if total < Decimal::ZERO {
        total = Decimal::ZERO;
    }
    Totals {
        subtotal,
        tax,
        discount: state.discount,
        total,
    }
}

// =====================================================
// CÓDIGO SUGERIDO PARA PRODUTO NOVO
// =====================================================

/// Ajusta a sugestão vinda do banco para a faixa de códigos manuais
/// (1001..9999), levando em conta os códigos já presentes na fatura e no
/// snapshot. Sugestões não numéricas passam sem ajuste.
pub fn adjust_suggested_code(state: &WizardState, suggested: &str) -> String {
    let trimmed = suggested.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    let suggested_num: i64 = trimmed.parse().unwrap_or(0);

    let manual_max = state
        .line_items
        .iter()
        .map(|i| i.code.as_str())
        .chain(state.inventory_snapshot.iter().map(|p| p.code.as_str()))
        .filter(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()))
        .filter_map(|c| c.parse::<i64>().ok())
        .filter(|n| (1001..=9999).contains(n))
        .max();

    match manual_max {
        Some(max) => (max + 1).min(9999).to_string(),
        None if suggested_num < 1001 => "1001".to_string(),
        None => trimmed.to_string(),
    }
}

// =====================================================
// RASCUNHO E REINÍCIO
// =====================================================

pub fn build_draft(state: &WizardState, now: DateTime<Utc>) -> WizardDraft {
    WizardDraft {
        step: state.current_step.number(),
        selected_supplier: state.selected_supplier.clone(),
        payment_method: state.payment_method,
        line_items: state.line_items.clone(),
        discount: state.discount,
        invoice_data: DraftInvoiceData {
            number: state.invoice_meta.number.clone(),
            issue_date: normalize_date_input(&state.invoice_meta.issue_date),
            due_date: normalize_date_input(&state.invoice_meta.due_date),
            notes: state.invoice_meta.notes.clone(),
        },
        timestamp: now,
    }
}

pub fn is_draft_expired(draft: &WizardDraft, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(draft.timestamp) > chrono::Duration::hours(DRAFT_MAX_AGE_HOURS)
}

/// Restaura um rascunho sobre um estado recém-criado (fornecedores e
/// snapshot já carregados) e volta ao passo salvo.
pub fn restore_from_draft(state: &mut WizardState, draft: WizardDraft) {
    if let Some(supplier) = draft.selected_supplier {
        state.selected_supplier = Some(supplier);
    }
    if let Some(method) = draft.payment_method {
        state.payment_method = Some(method);
    }
    if !draft.line_items.is_empty() {
        state.line_items = draft.line_items;
    }
    state.discount = draft.discount;
    state.invoice_meta = InvoiceMetaForm {
        number: draft.invoice_data.number,
        issue_date: normalize_date_input(&draft.invoice_data.issue_date),
        due_date: normalize_date_input(&draft.invoice_data.due_date),
        notes: draft.invoice_data.notes,
    };
    state.current_step = WizardStep::from_number(draft.step).unwrap_or(WizardStep::Supplier);
}

/// Reinicia o assistente preservando apenas a lista de fornecedores e o
/// snapshot do inventário.
pub fn reset(state: &mut WizardState) {
    let suppliers = std::mem::take(&mut state.suppliers);
    let snapshot = std::mem::take(&mut state.inventory_snapshot);
    *state = WizardState::new(suppliers, snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(code: &str, name: &str, supplier_price: &str, sale_price: &str, stock: &str) -> InventoryRecord {
        InventoryRecord {
            id: Uuid::new_v4(),
            code: code.to_string(),
            product_name: name.to_string(),
            supplier_price: dec(supplier_price),
            sale_price: dec(sale_price),
            zone: Some(3),
            stock: dec(stock),
            min_stock: Decimal::ONE,
            unit_type: "UNIDADES".to_string(),
            supplier_id: None,
            updated_at: Utc::now(),
        }
    }

    fn supplier_ref() -> SupplierRef {
        SupplierRef {
            id: Uuid::new_v4(),
            code: "PRV01".to_string(),
            company_name: "ACME".to_string(),
        }
    }

    fn state_with(records: Vec<InventoryRecord>) -> WizardState {
        WizardState::new(Vec::new(), records)
    }

    #[test]
    fn selecting_supplier_advances_to_step_two() {
        let mut state = state_with(vec![]);
        select_supplier(&mut state, supplier_ref());
        assert_eq!(state.current_step, WizardStep::InvoiceMeta);
        assert!(is_step_valid(&state, WizardStep::Supplier));

        clear_supplier(&mut state);
        assert_eq!(state.current_step, WizardStep::Supplier);
        assert!(!is_step_valid(&state, WizardStep::Supplier));
    }

    #[test]
    fn cannot_skip_ahead_past_unvalidated_step() {
        let mut state = state_with(vec![]);
        assert!(!goto_step(&mut state, WizardStep::PaymentMethod));
        assert!(!goto_step(&mut state, WizardStep::InvoiceMeta));
        assert_eq!(state.current_step, WizardStep::Supplier);

        select_supplier(&mut state, supplier_ref());
        // voltar é sempre permitido
        assert!(goto_step(&mut state, WizardStep::Supplier));
        // e avançar de novo, porque o passo 1 está válido
        assert!(goto_step(&mut state, WizardStep::InvoiceMeta));
    }

    #[test]
    fn step_two_requires_number_and_both_dates() {
        let mut state = state_with(vec![]);
        select_supplier(&mut state, supplier_ref());
        assert!(!is_step_valid(&state, WizardStep::InvoiceMeta));

        set_invoice_meta(&mut state, "F-001", "2025-03-10", "", "");
        assert!(!is_step_valid(&state, WizardStep::InvoiceMeta));

        set_invoice_meta(&mut state, "F-001", "2025-03-10", "2025-04-10", "");
        assert!(is_step_valid(&state, WizardStep::InvoiceMeta));
    }

    #[test]
    fn inverted_dates_warn_but_do_not_block() {
        let mut state = state_with(vec![]);
        select_supplier(&mut state, supplier_ref());
        let warning = set_invoice_meta(&mut state, "F-001", "2025-04-10", "2025-03-10", "");
        assert!(warning);
        assert!(is_step_valid(&state, WizardStep::InvoiceMeta));
        assert!(goto_step(&mut state, WizardStep::PaymentMethod));
    }

    #[test]
    fn date_input_is_normalized() {
        assert_eq!(normalize_date_input("2025-03-10"), "2025-03-10");
        assert_eq!(normalize_date_input("3/9/2025"), "2025-03-09");
        assert_eq!(normalize_date_input("12/31/2024"), "2024-12-31");
        assert_eq!(normalize_date_input("2025-03-10T08:00:00Z"), "2025-03-10");
        assert_eq!(normalize_date_input("no es fecha"), "");
        assert_eq!(normalize_date_input(""), "");
    }

    #[test]
    fn duplicate_code_increments_quantity_and_moves_to_front() {
        // Cenário do fluxo completo: fornecedor + código "100" duas vezes.
        let mut state = state_with(vec![
            record("100", "Martillo", "10.00", "0", "5"),
            record("200", "Clavos", "2.00", "3.10", "8"),
        ]);
        select_supplier(&mut state, supplier_ref());

        add_from_inventory(&mut state, "100").unwrap();
        assert_eq!(state.line_items.len(), 1);
        // sem preço de venda cadastrado, sugere com 38%
        assert_eq!(state.line_items[0].sale_price, dec("16.2"));
        assert_eq!(state.line_items[0].margin_percent, Some(dec("38")));
        assert_eq!(state.line_items[0].name, "MARTILLO");

        add_from_inventory(&mut state, "200").unwrap();
        assert_eq!(state.line_items[0].code, "200");

        add_from_inventory(&mut state, "100").unwrap();
        // mesmo comprimento de lista, quantidade 2, item de volta ao topo
        assert_eq!(state.line_items.len(), 2);
        assert_eq!(state.line_items[0].code, "100");
        assert_eq!(state.line_items[0].quantity, dec("2"));
        assert_eq!(state.line_items[0].subtotal, dec("20.00"));
    }

    #[test]
    fn changing_supplier_price_keeps_active_margin() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);
        add_from_inventory(&mut state, "100").unwrap();
        assert_eq!(state.line_items[0].margin_percent, Some(dec("38")));

        update_item(
            &mut state,
            "100",
            LineItemPatch {
                supplier_price: Some(dec("20.00")),
                ..Default::default()
            },
        )
        .unwrap();

        let item = &state.line_items[0];
        assert_eq!(item.margin_percent, Some(dec("38")));
        assert_eq!(item.sale_price, pricing::price_from_margin(dec("20"), dec("38")));
        assert_eq!(item.subtotal, dec("20.00"));
    }

    #[test]
    fn changing_sale_price_rederives_margin_tier() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);
        add_from_inventory(&mut state, "100").unwrap();

        // preço do degrau 45 para compra 10
        let tier45 = pricing::price_from_margin(dec("10"), dec("45"));
        update_item(
            &mut state,
            "100",
            LineItemPatch {
                sale_price: Some(tier45),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.line_items[0].margin_percent, Some(dec("45")));

        // um preço fora de qualquer degrau zera a margem
        update_item(
            &mut state,
            "100",
            LineItemPatch {
                sale_price: Some(dec("99.90")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.line_items[0].margin_percent, None);
    }

    #[test]
    fn names_are_always_uppercase() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);
        add_from_inventory(&mut state, "100").unwrap();
        update_item(
            &mut state,
            "100",
            LineItemPatch {
                name: Some("  martillo chico ".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(state.line_items[0].name, "MARTILLO CHICO");
    }

    #[test]
    fn zone_input_keeps_only_digits() {
        assert_eq!(normalize_zone("ZONA 5"), Some("5".to_string()));
        assert_eq!(normalize_zone("12"), Some("12".to_string()));
        assert_eq!(normalize_zone(""), None);
    }

    #[test]
    fn unit_variant_derives_code_and_name() {
        let mut state = state_with(vec![record("1001", "CLAVOS -CAJA", "5.00", "8.10", "4")]);
        add_from_inventory(&mut state, "1001").unwrap();

        let variant = add_unit_variant(&mut state, "1001").unwrap();
        assert_eq!(variant, "1001001");
        assert_eq!(state.line_items[0].code, "1001001");
        assert_eq!(state.line_items[0].name, "CLAVOS -UNIDADES");
        assert!(state.line_items[0].product_id.is_none());

        // repetir é rejeitado
        assert!(matches!(
            add_unit_variant(&mut state, "1001"),
            Err(AppError::UnitVariantAlreadyAdded(_))
        ));
    }

    #[test]
    fn unit_variant_rejected_for_long_codes() {
        let mut state = state_with(vec![record("7891234", "JABON", "1.00", "1.60", "9")]);
        add_from_inventory(&mut state, "7891234").unwrap();
        assert!(matches!(
            add_unit_variant(&mut state, "7891234"),
            Err(AppError::UnitVariantNotAllowed(_))
        ));
    }

    #[test]
    fn search_barcode_adds_exact_match_directly() {
        let mut state = state_with(vec![record("78912", "JABON", "1.00", "1.60", "9")]);
        let outcome = search_products(&mut state, "78912", false);
        assert!(matches!(outcome, SearchOutcome::Added { ref code } if code == "78912"));
        assert_eq!(state.line_items.len(), 1);
    }

    #[test]
    fn search_unknown_barcode_waits_for_enter() {
        let mut state = state_with(vec![]);
        assert!(matches!(
            search_products(&mut state, "99999", false),
            SearchOutcome::HintCreate { .. }
        ));
        assert!(matches!(
            search_products(&mut state, "99999", true),
            SearchOutcome::PromptCreate { .. }
        ));
        assert!(state.line_items.is_empty());
    }

    #[test]
    fn search_four_digit_code_only_adds_on_enter() {
        let mut state = state_with(vec![record("1234", "TORNILLO", "0.50", "0.90", "30")]);
        assert!(matches!(
            search_products(&mut state, "1234", false),
            SearchOutcome::Suggestion { .. }
        ));
        assert!(state.line_items.is_empty());

        assert!(matches!(
            search_products(&mut state, "1234", true),
            SearchOutcome::Added { .. }
        ));
        assert_eq!(state.line_items.len(), 1);
    }

    #[test]
    fn search_by_name_filters_and_caps_results() {
        let mut records = Vec::new();
        for i in 0..15 {
            records.push(record(&format!("90{:02}", i), "LLAVE MIXTA", "2.00", "3.30", "5"));
        }
        let mut state = state_with(records);

        match search_products(&mut state, "llave", false) {
            SearchOutcome::Matches { results } => assert_eq!(results.len(), 10),
            other => panic!("esperava Matches, veio {:?}", other),
        }

        // Enter com termo alfabético adiciona o primeiro resultado
        assert!(matches!(
            search_products(&mut state, "llave", true),
            SearchOutcome::Added { .. }
        ));

        assert!(matches!(
            search_products(&mut state, "x", false),
            SearchOutcome::TooShort
        ));
        assert!(matches!(
            search_products(&mut state, "inexistente", false),
            SearchOutcome::NotFound
        ));
    }

    #[test]
    fn discount_parsing_normalizes_commas_and_garbage() {
        assert_eq!(parse_discount("12,50"), dec("12.50"));
        assert_eq!(parse_discount("$ 9.90"), dec("9.90"));
        assert_eq!(parse_discount("1.2.3"), dec("1.23"));
        assert_eq!(parse_discount("abc"), Decimal::ZERO);
    }

    #[test]
    fn totals_never_go_negative() {
        // Cenário: desconto 1000 sobre subtotal 50 (IVA 7.5) -> total 0.
        let mut state = state_with(vec![record("100", "Martillo", "50.00", "0", "5")]);
        add_from_inventory(&mut state, "100").unwrap();
        set_discount(&mut state, "1000");

        let totals = compute_totals(&state);
        assert_eq!(totals.subtotal, dec("50.00"));
        assert_eq!(totals.tax, dec("7.5000"));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn step_validity_is_monotonic_in_the_happy_path() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);

        select_supplier(&mut state, supplier_ref());
        assert!(is_step_valid(&state, WizardStep::Supplier));

        set_invoice_meta(&mut state, "F-001", "2025-03-10", "2025-04-10", "");
        set_payment_method(&mut state, PaymentMethod::Plazo);
        add_from_inventory(&mut state, "100").unwrap();

        // nenhum passo anterior regrediu
        for step in 1..=5 {
            assert!(is_step_valid(&state, WizardStep::from_number(step).unwrap()));
        }

        // só a limpeza explícita invalida
        clear_supplier(&mut state);
        assert!(!is_step_valid(&state, WizardStep::Supplier));
    }

    #[test]
    fn suggested_code_is_adjusted_into_manual_range() {
        let mut state = state_with(vec![record("4500", "BROCHA", "1.00", "1.60", "2")]);
        // snapshot tem 4500 na faixa manual -> próximo é 4501
        assert_eq!(adjust_suggested_code(&state, "87"), "4501");

        // itens da fatura também contam
        add_from_inventory(&mut state, "4500").unwrap();
        add_new_product(
            &mut state,
            NewProductInput {
                code: "7800".to_string(),
                name: "lija".to_string(),
                quantity: Decimal::ONE,
                supplier_price: dec("0.50"),
                sale_price: Decimal::ZERO,
                zone: None,
                min_stock: Decimal::ONE,
                unit_type: None,
            },
        );
        assert_eq!(adjust_suggested_code(&state, "87"), "7801");

        // sem códigos manuais, sugestões baixas sobem para 1001
        let empty = state_with(vec![]);
        assert_eq!(adjust_suggested_code(&empty, "87"), "1001");
        assert_eq!(adjust_suggested_code(&empty, "54321"), "54321");
        assert_eq!(adjust_suggested_code(&empty, "AB-12"), "AB-12");
    }

    #[test]
    fn draft_round_trip_restores_state() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);
        select_supplier(&mut state, supplier_ref());
        set_invoice_meta(&mut state, "F-001", "3/9/2025", "04/10/2025", "urgente");
        set_payment_method(&mut state, PaymentMethod::ContadoTransferencia);
        add_from_inventory(&mut state, "100").unwrap();
        set_discount(&mut state, "5,00");
        goto_step(&mut state, WizardStep::PaymentMethod);

        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let draft = build_draft(&state, now);

        // o documento usa as chaves históricas do slot de rascunho
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["pasoActual"], 3);
        assert!(json["proveedorSeleccionado"].is_object());
        assert_eq!(json["metodoPago"], "CONTADO - TRANSFERENCIA");
        assert_eq!(json["datosFactura"]["fechaEmision"], "2025-03-09");
        assert_eq!(json["datosFactura"]["numero"], "F-001");

        let restored_draft: WizardDraft = serde_json::from_value(json).unwrap();
        let mut restored = state_with(vec![]);
        restore_from_draft(&mut restored, restored_draft);

        assert_eq!(restored.selected_supplier, state.selected_supplier);
        assert_eq!(restored.payment_method, Some(PaymentMethod::ContadoTransferencia));
        assert_eq!(restored.line_items, state.line_items);
        assert_eq!(restored.discount, dec("5.00"));
        assert_eq!(restored.current_step, WizardStep::PaymentMethod);
        assert_eq!(restored.invoice_meta.issue_date, "2025-03-09");
        assert_eq!(restored.invoice_meta.due_date, "2025-04-10");
    }

    #[test]
    fn drafts_older_than_24_hours_expire() {
        let state = state_with(vec![]);
        let saved_at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let draft = build_draft(&state, saved_at);

        let fresh = saved_at + chrono::Duration::hours(23);
        let stale = saved_at + chrono::Duration::hours(25);
        assert!(!is_draft_expired(&draft, fresh));
        assert!(is_draft_expired(&draft, stale));
    }

    #[test]
    fn reset_keeps_suppliers_and_snapshot() {
        let mut state = state_with(vec![record("100", "Martillo", "10.00", "0", "5")]);
        select_supplier(&mut state, supplier_ref());
        add_from_inventory(&mut state, "100").unwrap();
        set_discount(&mut state, "3");

        reset(&mut state);

        assert_eq!(state.current_step, WizardStep::Supplier);
        assert!(state.selected_supplier.is_none());
        assert!(state.line_items.is_empty());
        assert_eq!(state.discount, Decimal::ZERO);
        assert_eq!(state.inventory_snapshot.len(), 1);
    }
}

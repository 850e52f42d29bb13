// src/handlers/wizard.rs
//
// Handlers do assistente de ingresso de faturas. Cada handler roteia uma
// intenção da UI para a máquina de estados e devolve a projeção atualizada
// do estado; toda mutação grava um checkpoint do rascunho (best-effort).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        supplier::Supplier,
        wizard::{
            InvoiceMetaForm, LineItem, PaymentMethod, SupplierRef, Totals, WizardDraft,
            WizardState, WizardStep,
        },
    },
    services::{
        invoice_service::SubmissionSummary,
        wizard_service::{self, LineItemPatch, NewProductInput, SearchOutcome},
    },
};

// ---
// Validação customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Projeção do estado para o cliente
// ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub current_step: u8,
    pub selected_supplier: Option<SupplierRef>,
    pub payment_method: Option<PaymentMethod>,

    // Rótulo legível para o resumo ("Plazo", "Contado (Efectivo)", ...)
    pub payment_method_label: Option<String>,

    pub invoice_meta: InvoiceMetaForm,
    pub line_items: Vec<LineItem>,
    pub discount: Decimal,
    pub totals: Totals,
    pub steps_valid: Vec<bool>,
    pub date_order_warning: bool,
    pub suppliers: Vec<Supplier>,
}

fn build_view(state: &WizardState) -> WizardView {
    let steps_valid = (1..=5)
        .map(|n| wizard_service::is_step_valid(state, WizardStep::from_number(n).unwrap()))
        .collect();

    WizardView {
        current_step: state.current_step.number(),
        selected_supplier: state.selected_supplier.clone(),
        payment_method: state.payment_method,
        payment_method_label: state
            .payment_method
            .map(|m| m.display_label().to_string()),
        invoice_meta: state.invoice_meta.clone(),
        line_items: state.line_items.clone(),
        discount: state.discount,
        totals: wizard_service::compute_totals(state),
        steps_valid,
        date_order_warning: wizard_service::date_order_warning(state),
        suppliers: state.suppliers.clone(),
    }
}

// Aplica uma intenção sob o lock de sessões e devolve o resultado junto
// com o checkpoint do rascunho (gravado pelo handler depois de soltar o
// lock, para não segurar as outras sessões durante o I/O).
async fn with_session<T>(
    app_state: &AppState,
    user_id: Uuid,
    apply: impl FnOnce(&mut WizardState) -> Result<T, AppError>,
) -> Result<(T, WizardDraft), AppError> {
    let mut sessions = app_state.sessions.lock().await;
    let state = sessions
        .get_mut(&user_id)
        .ok_or(AppError::WizardSessionNotFound)?;
    let value = apply(state)?;
    let draft = wizard_service::build_draft(state, Utc::now());
    Ok((value, draft))
}

// =====================================================
// CICLO DE VIDA DA SESSÃO
// =====================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartWizardResponse {
    // true quando um rascunho com menos de 24h foi restaurado
    pub restored_from_draft: bool,
    pub wizard: WizardView,
}

// POST /api/ingestion/start
#[utoipa::path(
    post,
    path = "/api/ingestion/start",
    tag = "Ingestion",
    responses(
        (status = 200, description = "Sessão iniciada (rascunho restaurado se houver)", body = StartWizardResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn start_wizard(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let suppliers = app_state.supplier_repo.list_all().await?;

    // O snapshot é tolerante a falha: a sessão abre mesmo sem inventário
    // (a busca fica vazia até recarregar).
    let snapshot = match app_state.inventory_service.snapshot().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Falha ao carregar o inventário: {}", e);
            Vec::new()
        }
    };

    let mut state = WizardState::new(suppliers, snapshot);
    let restored = match app_state.draft_service.load(user.0.id).await {
        Some(draft) => {
            wizard_service::restore_from_draft(&mut state, draft);
            true
        }
        None => false,
    };

    let view = build_view(&state);
    app_state.sessions.lock().await.insert(user.0.id, state);

    Ok((
        StatusCode::OK,
        Json(StartWizardResponse {
            restored_from_draft: restored,
            wizard: view,
        }),
    ))
}

// GET /api/ingestion/state
#[utoipa::path(
    get,
    path = "/api/ingestion/state",
    tag = "Ingestion",
    responses((status = 200, description = "Estado atual do assistente", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn get_state(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let sessions = app_state.sessions.lock().await;
    let state = sessions
        .get(&user.0.id)
        .ok_or(AppError::WizardSessionNotFound)?;
    Ok((StatusCode::OK, Json(build_view(state))))
}

// POST /api/ingestion/close
// Fecha sem confirmação: o rascunho persiste e guarda o progresso.
#[utoipa::path(
    post,
    path = "/api/ingestion/close",
    tag = "Ingestion",
    responses((status = 204, description = "Sessão encerrada; rascunho preservado")),
    security(("api_jwt" = []))
)]
pub async fn close_wizard(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    app_state.sessions.lock().await.remove(&user.0.id);
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/ingestion/reset
// Reinício explícito (a confirmação é responsabilidade do cliente):
// descarta estado e rascunho, preservando fornecedores e snapshot.
#[utoipa::path(
    post,
    path = "/api/ingestion/reset",
    tag = "Ingestion",
    responses((status = 200, description = "Assistente reiniciado", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn reset_wizard(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let (view, _) = with_session(&app_state, user.0.id, |state| {
        wizard_service::reset(state);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.clear(user.0.id).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// PASSO 1: FORNECEDOR
// =====================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectSupplierPayload {
    pub supplier_id: Uuid,
}

// POST /api/ingestion/supplier
#[utoipa::path(
    post,
    path = "/api/ingestion/supplier",
    tag = "Ingestion",
    request_body = SelectSupplierPayload,
    responses((status = 200, description = "Fornecedor selecionado; assistente no passo 2", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn select_supplier(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SelectSupplierPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        let supplier = state
            .suppliers
            .iter()
            .find(|s| s.id == payload.supplier_id)
            .ok_or(AppError::SupplierNotFound)?
            .to_ref();
        wizard_service::select_supplier(state, supplier);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// DELETE /api/ingestion/supplier
#[utoipa::path(
    delete,
    path = "/api/ingestion/supplier",
    tag = "Ingestion",
    responses((status = 200, description = "Seleção limpa; assistente de volta ao passo 1", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn clear_supplier(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::clear_supplier(state);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// PASSO 2: DADOS DA FATURA
// =====================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMetaPayload {
    #[serde(default)]
    pub number: String,

    // Aceita YYYY-MM-DD ou M/D/YYYY; normalizamos ao gravar.
    #[serde(default)]
    pub issue_date: String,

    #[serde(default)]
    pub due_date: String,

    #[serde(default)]
    pub notes: String,
}

// PUT /api/ingestion/invoice-meta
// Campos parciais são permitidos: a validade do passo 2 é reavaliada a
// cada mutação e o aviso de datas invertidas nunca bloqueia.
#[utoipa::path(
    put,
    path = "/api/ingestion/invoice-meta",
    tag = "Ingestion",
    request_body = InvoiceMetaPayload,
    responses((status = 200, description = "Dados da fatura atualizados", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn set_invoice_meta(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InvoiceMetaPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::set_invoice_meta(
            state,
            &payload.number,
            &payload.issue_date,
            &payload.due_date,
            &payload.notes,
        );
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// PASSO 3: MÉTODO DE PAGAMENTO
// =====================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPayload {
    pub method: PaymentMethod,
}

// PUT /api/ingestion/payment-method
#[utoipa::path(
    put,
    path = "/api/ingestion/payment-method",
    tag = "Ingestion",
    request_body = PaymentMethodPayload,
    responses((status = 200, description = "Método de pagamento definido", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn set_payment_method(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<PaymentMethodPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::set_payment_method(state, payload.method);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// NAVEGAÇÃO
// =====================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigatePayload {
    pub step: WizardStep,
}

// POST /api/ingestion/navigate
// Transições proibidas (pular passo sem validar) não alteram nada: o
// cliente recebe o estado como está, sem erro.
#[utoipa::path(
    post,
    path = "/api/ingestion/navigate",
    tag = "Ingestion",
    request_body = NavigatePayload,
    responses((status = 200, description = "Estado após a (tentativa de) navegação", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn navigate(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NavigatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::goto_step(state, payload.step);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// PASSO 4: PRODUTOS
// =====================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub term: String,

    // true quando o usuário confirmou com Enter (ou o leitor enviou o
    // terminador de scan)
    #[serde(default)]
    pub enter: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub outcome: SearchOutcome,
    pub wizard: WizardView,
}

// POST /api/ingestion/items/search
#[utoipa::path(
    post,
    path = "/api/ingestion/items/search",
    tag = "Ingestion",
    request_body = SearchPayload,
    responses((status = 200, description = "Resultado da busca (pode ter adicionado um item)", body = SearchResponse)),
    security(("api_jwt" = []))
)]
pub async fn search_products(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SearchPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (response, draft) = with_session(&app_state, user.0.id, |state| {
        let outcome = wizard_service::search_products(state, &payload.term, payload.enter);
        Ok(SearchResponse {
            outcome,
            wizard: build_view(state),
        })
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(response)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    #[schema(example = "100")]
    pub code: String,
}

// POST /api/ingestion/items
#[utoipa::path(
    post,
    path = "/api/ingestion/items",
    tag = "Ingestion",
    request_body = AddItemPayload,
    responses(
        (status = 200, description = "Item adicionado (ou quantidade incrementada)", body = WizardView),
        (status = 404, description = "Código não existe no snapshot")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::add_from_inventory(state, payload.code.trim())?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProductPayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    pub code: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    // Sem quantidade informada, assumimos 1.
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub supplier_price: Decimal,

    // Sem preço de venda, sugerimos com a margem padrão (38%).
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub sale_price: Decimal,

    pub zone: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub min_stock: Decimal,

    #[schema(example = "UNIDADES")]
    pub unit_type: Option<String>,
}

// POST /api/ingestion/items/new
#[utoipa::path(
    post,
    path = "/api/ingestion/items/new",
    tag = "Ingestion",
    request_body = NewProductPayload,
    responses((status = 200, description = "Produto novo adicionado à fatura", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn add_new_product(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NewProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::add_new_product(
            state,
            NewProductInput {
                code: payload.code,
                name: payload.name,
                quantity: payload.quantity,
                supplier_price: payload.supplier_price,
                sale_price: payload.sale_price,
                zone: payload.zone,
                min_stock: payload.min_stock,
                unit_type: payload.unit_type,
            },
        );
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// POST /api/ingestion/items/{code}/unit-variant
#[utoipa::path(
    post,
    path = "/api/ingestion/items/{code}/unit-variant",
    tag = "Ingestion",
    params(("code" = String, Path, description = "Código do item empacotado")),
    responses(
        (status = 200, description = "Versão UNIDADES adicionada", body = WizardView),
        (status = 422, description = "Código longo demais ou já em UNIDADES")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_unit_variant(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::add_unit_variant(state, &code)?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    pub name: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub supplier_price: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub sale_price: Option<Decimal>,

    pub zone: Option<String>,
}

// PATCH /api/ingestion/items/{code}
#[utoipa::path(
    patch,
    path = "/api/ingestion/items/{code}",
    tag = "Ingestion",
    params(("code" = String, Path, description = "Código do item")),
    request_body = UpdateItemPayload,
    responses((status = 200, description = "Item atualizado", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::update_item(
            state,
            &code,
            LineItemPatch {
                name: payload.name,
                quantity: payload.quantity,
                supplier_price: payload.supplier_price,
                sale_price: payload.sale_price,
                zone: payload.zone,
            },
        )?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyMarginPayload {
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = 38)]
    pub margin_percent: Decimal,
}

// POST /api/ingestion/items/{code}/margin
#[utoipa::path(
    post,
    path = "/api/ingestion/items/{code}/margin",
    tag = "Ingestion",
    params(("code" = String, Path, description = "Código do item")),
    request_body = ApplyMarginPayload,
    responses((status = 200, description = "Degrau de margem aplicado", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn apply_margin(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
    Json(payload): Json<ApplyMarginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::apply_margin_tier(state, &code, payload.margin_percent)?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// POST /api/ingestion/items/{code}/suggested-price
#[utoipa::path(
    post,
    path = "/api/ingestion/items/{code}/suggested-price",
    tag = "Ingestion",
    params(("code" = String, Path, description = "Código do item")),
    responses((status = 200, description = "Preço sugerido (38%) aplicado", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn apply_suggested_price(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::apply_suggested_price(state, &code)?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// DELETE /api/ingestion/items/{code}
#[utoipa::path(
    delete,
    path = "/api/ingestion/items/{code}",
    tag = "Ingestion",
    params(("code" = String, Path, description = "Código do item")),
    responses((status = 200, description = "Item removido", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::remove_item(state, &code)?;
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// PASSO 5: RESUMO
// =====================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPayload {
    // String crua do campo: vírgulas e lixo são normalizados no serviço.
    #[schema(example = "12,50")]
    pub value: String,
}

// PUT /api/ingestion/discount
#[utoipa::path(
    put,
    path = "/api/ingestion/discount",
    tag = "Ingestion",
    request_body = DiscountPayload,
    responses((status = 200, description = "Desconto atualizado", body = WizardView)),
    security(("api_jwt" = []))
)]
pub async fn set_discount(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<DiscountPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (view, draft) = with_session(&app_state, user.0.id, |state| {
        wizard_service::set_discount(state, &payload.value);
        Ok(build_view(state))
    })
    .await?;

    app_state.draft_service.save(user.0.id, &draft).await;
    Ok((StatusCode::OK, Json(view)))
}

// =====================================================
// CÓDIGO SUGERIDO
// =====================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedCodeResponse {
    pub code: String,
}

// GET /api/ingestion/suggested-code
// A sugestão do banco é ajustada para a faixa manual (1001..9999) com os
// códigos já conhecidos pela sessão. Se o procedimento falhar, devolvemos
// vazio: o fluxo de produto novo abre mesmo assim.
#[utoipa::path(
    get,
    path = "/api/ingestion/suggested-code",
    tag = "Ingestion",
    responses((status = 200, description = "Próximo código sugerido", body = SuggestedCodeResponse)),
    security(("api_jwt" = []))
)]
pub async fn suggested_code(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let raw = match app_state.inventory_repo.suggest_next_code().await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Procedimento suggest_next_code falhou: {}", e);
            String::new()
        }
    };

    let sessions = app_state.sessions.lock().await;
    let state = sessions
        .get(&user.0.id)
        .ok_or(AppError::WizardSessionNotFound)?;
    let code = wizard_service::adjust_suggested_code(state, &raw);

    Ok((StatusCode::OK, Json(SuggestedCodeResponse { code })))
}

// =====================================================
// SUBMISSÃO
// =====================================================

// POST /api/ingestion/submit
// A proteção contra duplo clique é o controle desabilitado no cliente;
// não existe chave de idempotência no servidor (lacuna documentada).
#[utoipa::path(
    post,
    path = "/api/ingestion/submit",
    tag = "Ingestion",
    responses(
        (status = 201, description = "Fatura registrada; resumo dos efeitos no inventário", body = SubmissionSummary),
        (status = 422, description = "Assistente incompleto")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_invoice(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    // Clona o estado para não segurar o lock das sessões durante as
    // escritas remotas.
    let state_snapshot = {
        let sessions = app_state.sessions.lock().await;
        sessions
            .get(&user.0.id)
            .ok_or(AppError::WizardSessionNotFound)?
            .clone()
    };

    let summary = app_state
        .invoice_service
        .submit(&state_snapshot, &user.0)
        .await?;

    // Sucesso: limpa o rascunho e reinicia o estado, preservando a lista
    // de fornecedores e o snapshot carregados.
    app_state.draft_service.clear(user.0.id).await;
    {
        let mut sessions = app_state.sessions.lock().await;
        if let Some(state) = sessions.get_mut(&user.0.id) {
            wizard_service::reset(state);
        }
    }

    Ok((StatusCode::CREATED, Json(summary)))
}

// src/handlers/suppliers.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::supplier::Supplier,
};

// GET /api/suppliers
#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "Suppliers",
    responses(
        (status = 200, description = "Lista de fornecedores", body = [Supplier])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_suppliers(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let suppliers = app_state.supplier_repo.list_all().await?;
    Ok((StatusCode::OK, Json(suppliers)))
}

// ---
// Payload: CreateSupplier
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierPayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    #[schema(example = "PRV01")]
    pub code: String,

    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    #[schema(example = "ACME Ferretería")]
    pub company_name: String,

    pub salesperson: Option<String>,
    pub contact: Option<String>,
}

// POST /api/suppliers
// Também atende o modal "novo fornecedor" do passo 1: o fornecedor criado
// entra na lista da sessão ativa, se houver uma.
#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "Suppliers",
    request_body = CreateSupplierPayload,
    responses(
        (status = 201, description = "Fornecedor criado", body = Supplier),
        (status = 409, description = "Código já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateSupplierPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let supplier = app_state
        .supplier_repo
        .create(
            payload.code.trim(),
            payload.company_name.trim(),
            payload.salesperson.as_deref(),
            payload.contact.as_deref(),
        )
        .await?;

    {
        let mut sessions = app_state.sessions.lock().await;
        if let Some(state) = sessions.get_mut(&user.0.id) {
            state.suppliers.push(supplier.clone());
        }
    }

    Ok((StatusCode::CREATED, Json(supplier)))
}

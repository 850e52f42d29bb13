use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Nenhuma sessão do assistente ativa para este usuário")]
    WizardSessionNotFound,

    #[error("Fornecedor não encontrado")]
    SupplierNotFound,

    #[error("Código de fornecedor já existe: {0}")]
    SupplierCodeAlreadyExists(String),

    #[error("Nenhum fornecedor selecionado")]
    SupplierNotSelected,

    #[error("O assistente ainda tem passos pendentes: {0}")]
    WizardIncomplete(String),

    #[error("Produto não encontrado no inventário: {0}")]
    UnknownProductCode(String),

    #[error("Item não está na fatura: {0}")]
    LineItemNotFound(String),

    #[error("Não é possível derivar versão UNIDADES para o código {0}")]
    UnitVariantNotAllowed(String),

    #[error("A versão UNIDADES de {0} já está na fatura")]
    UnitVariantAlreadyAdded(String),

    #[error("Data inválida no formulário da fatura: {0}")]
    InvalidInvoiceDate(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::WizardSessionNotFound => (
                StatusCode::NOT_FOUND,
                "Inicie o assistente antes de enviar intenções.".to_string(),
            ),
            AppError::SupplierNotFound => {
                (StatusCode::NOT_FOUND, "Fornecedor não encontrado.".to_string())
            }
            AppError::SupplierCodeAlreadyExists(code) => (
                StatusCode::CONFLICT,
                format!("Já existe um fornecedor com o código '{}'.", code),
            ),
            AppError::SupplierNotSelected => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Selecione um fornecedor antes de continuar.".to_string(),
            ),
            AppError::WizardIncomplete(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            AppError::UnknownProductCode(code) => (
                StatusCode::NOT_FOUND,
                format!("Produto com código '{}' não encontrado no inventário.", code),
            ),
            AppError::LineItemNotFound(code) => (
                StatusCode::NOT_FOUND,
                format!("Item com código '{}' não está na fatura.", code),
            ),
            AppError::UnitVariantNotAllowed(code) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!(
                    "Não é possível derivar versão UNIDADES para o código '{}'.",
                    code
                ),
            ),
            AppError::UnitVariantAlreadyAdded(name) => (
                StatusCode::CONFLICT,
                format!("A versão UNIDADES de '{}' já está na fatura.", name),
            ),
            AppError::InvalidInvoiceDate(value) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Data inválida no formulário da fatura: '{}'.", value),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

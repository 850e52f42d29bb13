//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::AppState;
use crate::middleware::auth::auth_middleware;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Fornecedores (lista do passo 1 + modal de novo fornecedor)
    let supplier_routes = Router::new()
        .route("/"
               , get(handlers::suppliers::list_suppliers)
               .post(handlers::suppliers::create_supplier)
        );

    // O assistente de ingresso de faturas: uma rota por intenção da UI
    let ingestion_routes = Router::new()
        .route("/start", post(handlers::wizard::start_wizard))
        .route("/state", get(handlers::wizard::get_state))
        .route("/close", post(handlers::wizard::close_wizard))
        .route("/reset", post(handlers::wizard::reset_wizard))
        .route("/supplier"
               , post(handlers::wizard::select_supplier)
               .delete(handlers::wizard::clear_supplier)
        )
        .route("/invoice-meta", put(handlers::wizard::set_invoice_meta))
        .route("/payment-method", put(handlers::wizard::set_payment_method))
        .route("/navigate", post(handlers::wizard::navigate))
        .route("/items/search", post(handlers::wizard::search_products))
        .route("/items", post(handlers::wizard::add_item))
        .route("/items/new", post(handlers::wizard::add_new_product))
        .route("/items/{code}"
               , patch(handlers::wizard::update_item)
               .delete(handlers::wizard::remove_item)
        )
        .route("/items/{code}/margin", post(handlers::wizard::apply_margin))
        .route("/items/{code}/suggested-price", post(handlers::wizard::apply_suggested_price))
        .route("/items/{code}/unit-variant", post(handlers::wizard::add_unit_variant))
        .route("/discount", put(handlers::wizard::set_discount))
        .route("/suggested-code", get(handlers::wizard::suggested_code))
        .route("/submit", post(handlers::wizard::submit_invoice));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/suppliers", supplier_routes.layer(
            axum_middleware::from_fn_with_state(app_state.clone(), auth_middleware)
        ))
        .nest("/api/ingestion", ingestion_routes.layer(
            axum_middleware::from_fn_with_state(app_state.clone(), auth_middleware)
        ))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}

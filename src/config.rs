// src/config.rs

use std::{collections::HashMap, env, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::{
        DraftRepository, InventoryRepository, InvoiceRepository, SettingsRepository,
        SupplierRepository,
    },
    models::wizard::WizardState,
    services::{
        auth::AuthService,
        document_service::DocumentService,
        draft_service::DraftService,
        inventory_service::{InventoryGateway, InventoryService},
        invoice_service::InvoiceService,
        notifier_service::{TransferNotifier, WebhookNotifier},
    },
};

// Sessões do assistente em memória, uma por usuário autenticado.
// O rascunho persistido é o que sobrevive a reinícios do processo.
pub type WizardSessions = Arc<Mutex<HashMap<Uuid, WizardState>>>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub sessions: WizardSessions,
    pub auth_service: AuthService,
    pub draft_service: DraftService,
    pub inventory_service: InventoryService,
    pub invoice_service: InvoiceService,
    pub supplier_repo: SupplierRepository,
    pub inventory_repo: InventoryRepository,
}

impl AppState {
    // A assinatura retorna um Result: se a configuração falhar, quem decide
    // o que fazer é o main.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let fonts_dir = env::var("FONTS_DIR").unwrap_or_else(|_| "./fonts".to_string());

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let supplier_repo = SupplierRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let invoice_repo = InvoiceRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let draft_repo = DraftRepository::new(db_pool.clone());

        let gateway: Arc<dyn InventoryGateway> = Arc::new(inventory_repo.clone());
        let inventory_service = InventoryService::new(gateway);

        let notifier: Arc<dyn TransferNotifier> = Arc::new(WebhookNotifier::new(settings_repo));
        let document_service = DocumentService::new(fonts_dir);
        let invoice_service = InvoiceService::new(
            invoice_repo,
            inventory_service.clone(),
            document_service,
            notifier,
        );

        let auth_service = AuthService::new(jwt_secret.clone());
        let draft_service = DraftService::new(draft_repo);

        Ok(Self {
            db_pool,
            jwt_secret,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            auth_service,
            draft_service,
            inventory_service,
            invoice_service,
            supplier_repo,
            inventory_repo,
        })
    }
}

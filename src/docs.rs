// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Suppliers ---
        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,

        // --- INGESTION (assistente de faturas) ---
        handlers::wizard::start_wizard,
        handlers::wizard::get_state,
        handlers::wizard::close_wizard,
        handlers::wizard::reset_wizard,
        handlers::wizard::select_supplier,
        handlers::wizard::clear_supplier,
        handlers::wizard::set_invoice_meta,
        handlers::wizard::set_payment_method,
        handlers::wizard::navigate,
        handlers::wizard::search_products,
        handlers::wizard::add_item,
        handlers::wizard::add_new_product,
        handlers::wizard::add_unit_variant,
        handlers::wizard::update_item,
        handlers::wizard::apply_margin,
        handlers::wizard::apply_suggested_price,
        handlers::wizard::remove_item,
        handlers::wizard::set_discount,
        handlers::wizard::suggested_code,
        handlers::wizard::submit_invoice,
    ),
    components(
        schemas(
            // --- Suppliers ---
            models::supplier::Supplier,
            handlers::suppliers::CreateSupplierPayload,

            // --- Wizard (estado e projeções) ---
            models::wizard::WizardStep,
            models::wizard::PaymentMethod,
            models::wizard::SupplierRef,
            models::wizard::LineItem,
            models::wizard::InvoiceMetaForm,
            models::wizard::Totals,
            handlers::wizard::WizardView,
            handlers::wizard::StartWizardResponse,
            handlers::wizard::SearchResponse,
            handlers::wizard::SuggestedCodeResponse,
            services::wizard_service::SearchOutcome,

            // --- Wizard (payloads) ---
            handlers::wizard::SelectSupplierPayload,
            handlers::wizard::InvoiceMetaPayload,
            handlers::wizard::PaymentMethodPayload,
            handlers::wizard::NavigatePayload,
            handlers::wizard::SearchPayload,
            handlers::wizard::AddItemPayload,
            handlers::wizard::NewProductPayload,
            handlers::wizard::UpdateItemPayload,
            handlers::wizard::ApplyMarginPayload,
            handlers::wizard::DiscountPayload,

            // --- Inventário e submissão ---
            models::inventory::InventoryRecord,
            models::inventory::ReconcileAction,
            models::inventory::ReconcileResult,
            models::invoice::InvoiceHeader,
            services::invoice_service::SubmissionSummary,
        )
    ),
    tags(
        (name = "Suppliers", description = "Fornecedores"),
        (name = "Ingestion", description = "Assistente de ingresso de faturas de fornecedores")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

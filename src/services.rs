pub mod auth;
pub mod document_service;
pub mod draft_service;
pub mod inventory_service;
pub mod invoice_service;
pub mod notifier_service;
pub mod pricing;
pub mod wizard_service;

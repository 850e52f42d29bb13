pub mod draft_repo;
pub use draft_repo::DraftRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod supplier_repo;
pub use supplier_repo::SupplierRepository;

//! Business logic services for the Bundle Back-Office

pub mod bundle;
pub mod dashboard;
pub mod debt;
pub mod list;
pub mod payment;
pub mod purchase_order;
pub mod quotation;
pub mod supplier;

pub use bundle::BundleService;
pub use dashboard::DashboardService;
pub use debt::DebtService;
pub use list::ListService;
pub use payment::PaymentService;
pub use purchase_order::PurchaseOrderService;
pub use quotation::{spawn_expiry_sweeper, QuotationService};
pub use supplier::SupplierService;

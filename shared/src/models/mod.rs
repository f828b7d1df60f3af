//! Domain models for the Bundle Back-Office

mod bundle;
mod dashboard;
mod debt;
mod list;
mod payment;
mod purchase_order;
mod quotation;
mod supplier;

pub use bundle::*;
pub use dashboard::*;
pub use debt::*;
pub use list::*;
pub use payment::*;
pub use purchase_order::*;
pub use quotation::*;
pub use supplier::*;

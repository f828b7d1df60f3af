//! HTTP request handlers

pub mod bundle;
pub mod health;
pub mod list;
pub mod quotation;
pub mod reporting;
pub mod storefront;
pub mod supplier;

pub use bundle::*;
pub use health::*;
pub use list::*;
pub use quotation::*;
pub use reporting::*;
pub use storefront::*;
pub use supplier::*;

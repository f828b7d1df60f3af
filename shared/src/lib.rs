//! Shared types and models for the Bundle Back-Office
//!
//! This crate contains the domain model, the pricing engine and validation
//! helpers shared between the backend, the browser (via WASM), and tests.

pub mod models;
pub mod pricing;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::*;
pub use types::*;
pub use validation::*;

//! WebAssembly module for the Bundle Back-Office
//!
//! Provides client-side computation for:
//! - Quotation totals preview while discounts are being edited
//! - Supplier debt classification
//! - Scan code and tracking code validation at the counter

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::pricing::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[derive(Deserialize)]
struct PreviewRequest {
    #[serde(rename = "lineas")]
    lines: Vec<PricingLine>,
    #[serde(rename = "descuento_global", default)]
    global_discount: Decimal,
}

fn parse_amount(value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid amount {:?}: {}", value, e)))
}

/// Price a quotation draft; returns the totals as JSON
#[wasm_bindgen]
pub fn preview_totals(request_json: &str) -> Result<String, JsValue> {
    let request: PreviewRequest = serde_json::from_str(request_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid preview JSON: {}", e)))?;

    let totals = compute_totals(&request.lines, request.global_discount)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&totals).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Debt level label (NORMAL, ALTO, CRITICO) for an amount
#[wasm_bindgen]
pub fn classify_supplier_debt(amount: &str) -> Result<String, JsValue> {
    Ok(classify_debt(parse_amount(amount)?).as_str().to_string())
}

/// Amount still owed after `paid`; never negative
#[wasm_bindgen]
pub fn remaining_balance(total: &str, paid: &str) -> Result<String, JsValue> {
    Ok(outstanding_balance(parse_amount(total)?, parse_amount(paid)?).to_string())
}

#[wasm_bindgen]
pub fn is_valid_scan_code(code: &str) -> bool {
    validate_scan_code(code).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_tracking_code(code: &str) -> bool {
    validate_tracking_code(code).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_totals() {
        let json = r#"{
            "lineas": [
                {"precio_unitario": "500", "descuento_linea": "0"},
                {"precio_unitario": "500", "descuento_linea": "10"}
            ],
            "descuento_global": "5"
        }"#;
        let totals: QuotationTotals = serde_json::from_str(&preview_totals(json).unwrap()).unwrap();
        assert_eq!(totals.final_total, Decimal::from_str("902.50").unwrap());
        assert_eq!(totals.global_discount_amount, Decimal::from_str("47.50").unwrap());
    }

    #[test]
    fn test_classify_supplier_debt() {
        assert_eq!(classify_supplier_debt("5000").unwrap(), "NORMAL");
        assert_eq!(classify_supplier_debt("7500.50").unwrap(), "ALTO");
        assert_eq!(classify_supplier_debt("10000.01").unwrap(), "CRITICO");
    }

    #[test]
    fn test_remaining_balance() {
        assert_eq!(remaining_balance("902.50", "500").unwrap(), "402.50");
        assert_eq!(remaining_balance("902.50", "1000").unwrap(), "0");
    }

    #[test]
    fn test_code_validation() {
        assert!(is_valid_scan_code("SACO-00001234"));
        assert!(!is_valid_scan_code("SACO-12"));
        assert!(is_valid_tracking_code("PF123456-7890"));
        assert!(!is_valid_tracking_code("PF12-7890"));
    }
}

//! Validation utilities for the Bundle Back-Office
//!
//! Includes Peru-specific checks for customer contact details.

use rust_decimal::Decimal;

use crate::models::normalize_sizes;
use crate::pricing::{has_currency_scale, max_unit_price};

/// Prefix of every bundle scan code
pub const SCAN_CODE_PREFIX: &str = "SACO-";

/// Digits following the scan code prefix
pub const SCAN_CODE_DIGITS: usize = 8;

/// Prefix of every quotation tracking code
pub const TRACKING_CODE_PREFIX: &str = "PF";

/// Length of a public list share token
pub const SHARE_TOKEN_LEN: usize = 24;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate that a bundle base price is a positive, bounded cent amount
pub fn validate_base_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Base price must be greater than zero");
    }
    if !has_currency_scale(price) {
        return Err("Base price must have at most two decimals");
    }
    if price > max_unit_price() {
        return Err("Base price is too large");
    }
    Ok(())
}

/// Validate that a bundle declares at least one size
pub fn validate_sizes(sizes: &[String]) -> Result<(), &'static str> {
    if normalize_sizes(sizes).is_empty() {
        return Err("At least one size is required");
    }
    Ok(())
}

/// Validate scan code format: SACO-NNNNNNNN
pub fn validate_scan_code(code: &str) -> Result<(), &'static str> {
    let Some(digits) = code.strip_prefix(SCAN_CODE_PREFIX) else {
        return Err("Scan code must start with 'SACO-'");
    };
    if digits.len() != SCAN_CODE_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Scan code must end in 8 digits");
    }
    Ok(())
}

// ============================================================================
// Sales Validations
// ============================================================================

/// Validate tracking code format: PF######-####
pub fn validate_tracking_code(code: &str) -> Result<(), &'static str> {
    let Some(rest) = code.strip_prefix(TRACKING_CODE_PREFIX) else {
        return Err("Tracking code must start with 'PF'");
    };
    let parts: Vec<&str> = rest.split('-').collect();
    if parts.len() != 2 {
        return Err("Tracking code must be in format PF######-####");
    }
    if parts[0].len() != 6 || !parts[0].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid sequence in tracking code");
    }
    if parts[1].len() != 4 || !parts[1].chars().all(|c| c.is_ascii_digit()) {
        return Err("Invalid suffix in tracking code");
    }
    Ok(())
}

/// Largest payment or debt figure the ledger stores
pub fn max_ledger_amount() -> Decimal {
    Decimal::new(999_999_999_999_99, 2)
}

/// Validate a payment or debt figure: cent precision, within ledger range
pub fn validate_ledger_amount(amount: Decimal) -> Result<(), &'static str> {
    if !has_currency_scale(amount) {
        return Err("Amount must have at most two decimals");
    }
    if amount.abs() > max_ledger_amount() {
        return Err("Amount is too large");
    }
    Ok(())
}

/// Validate share token: 24 ASCII alphanumeric characters
pub fn validate_share_token(token: &str) -> Result<(), &'static str> {
    if token.len() != SHARE_TOKEN_LEN || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Share token must be 24 alphanumeric characters");
    }
    Ok(())
}

/// Validate customer name (required, not blank)
pub fn validate_customer_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Customer name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Customer name must be at most 200 characters");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

// ============================================================================
// Peru-Specific Validations
// ============================================================================

/// Validate Peruvian mobile number
/// Accepts: 987654321, 987 654 321, +51987654321
pub fn validate_peru_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Mobile numbers are 9 digits starting with 9
    if digits.len() == 9 && digits.starts_with('9') {
        return Ok(());
    }
    // With country code 51
    if digits.len() == 11 && digits.starts_with("519") {
        return Ok(());
    }

    Err("Invalid Peruvian mobile number format")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Inventory Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_base_price() {
        assert!(validate_base_price(Decimal::from(450)).is_ok());
        assert!(validate_base_price(Decimal::new(1, 2)).is_ok());
        assert!(validate_base_price(Decimal::ZERO).is_err());
        assert!(validate_base_price(Decimal::from(-10)).is_err());
        assert!(validate_base_price(Decimal::new(10_005, 3)).is_err());
        assert!(validate_base_price(Decimal::from(100_000_000_000i64)).is_err());
    }

    #[test]
    fn test_validate_sizes() {
        assert!(validate_sizes(&["S".to_string(), "M".to_string()]).is_ok());
        assert!(validate_sizes(&[]).is_err());
        assert!(validate_sizes(&["  ".to_string()]).is_err());
    }

    #[test]
    fn test_validate_scan_code_valid() {
        assert!(validate_scan_code("SACO-00000001").is_ok());
        assert!(validate_scan_code("SACO-12345678").is_ok());
    }

    #[test]
    fn test_validate_scan_code_invalid() {
        assert!(validate_scan_code("SACO-1234").is_err());
        assert!(validate_scan_code("SACK-12345678").is_err());
        assert!(validate_scan_code("SACO-1234567A").is_err());
        assert!(validate_scan_code("12345678").is_err());
    }

    // ========================================================================
    // Sales Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_tracking_code() {
        assert!(validate_tracking_code("PF000123-4567").is_ok());
        assert!(validate_tracking_code("PF123-4567").is_err());
        assert!(validate_tracking_code("PX000123-4567").is_err());
        assert!(validate_tracking_code("PF0001234567").is_err());
    }

    #[test]
    fn test_validate_ledger_amount() {
        assert!(validate_ledger_amount(Decimal::new(90250, 2)).is_ok());
        assert!(validate_ledger_amount(Decimal::new(1, 3)).is_err());
        assert!(validate_ledger_amount(Decimal::from(10_000_000_000_000i64)).is_err());
    }

    #[test]
    fn test_validate_share_token() {
        assert!(validate_share_token("aB3dE5fG7hJ9kL1mN2pQ4rS6").is_ok());
        assert!(validate_share_token("short").is_err());
        assert!(validate_share_token("aB3dE5fG7hJ9kL1mN2pQ4r-6").is_err());
    }

    #[test]
    fn test_validate_customer_name() {
        assert!(validate_customer_name("María Fernández").is_ok());
        assert!(validate_customer_name("   ").is_err());
        assert!(validate_customer_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("cliente@example.com").is_ok());
        assert!(validate_email("ventas.lima@tienda.com.pe").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    // ========================================================================
    // Peru-Specific Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_peru_phone_valid() {
        assert!(validate_peru_phone("987654321").is_ok());
        assert!(validate_peru_phone("987 654 321").is_ok());
        assert!(validate_peru_phone("+51987654321").is_ok());
    }

    #[test]
    fn test_validate_peru_phone_invalid() {
        assert!(validate_peru_phone("12345").is_err());
        assert!(validate_peru_phone("187654321").is_err());
        assert!(validate_peru_phone("+1987654321").is_err());
    }
}

//! Input sanitization and numeric field coercion
//!
//! All inbound text passes through `sanitize_text` before it reaches a SQL
//! statement. Numeric fields arrive as arbitrary JSON values and are coerced
//! here; coercion failure is a client error, never a silent default.

use crate::error::{AppError, Result};
use serde_json::Value;

/// Upper bound for product quantities
pub const MAX_QUANTITY: i64 = 9999;

/// Sanitize a text field: strip NUL bytes, truncate to `max_len` characters,
/// trim surrounding whitespace.
///
/// `None` and empty strings pass through unchanged; callers decide whether
/// empty is an error.
pub fn sanitize_text(input: Option<String>, max_len: usize) -> Option<String> {
    let text = input?;
    if text.is_empty() {
        return Some(text);
    }
    let cleaned: String = text.chars().filter(|c| *c != '\0').take(max_len).collect();
    Some(cleaned.trim().to_string())
}

/// Sanitize a required name field, rejecting values that are empty after
/// sanitization.
pub fn require_name(input: Option<String>, max_len: usize, what: &str) -> Result<String> {
    match sanitize_text(input, max_len) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AppError::Validation(format!("{} is required", what))),
    }
}

/// Coerce a JSON value to an integer quantity.
///
/// Absent fields default to 1. Integers, floats (truncated) and numeric
/// strings are accepted; anything else is a validation error.
pub fn parse_quantity(value: Option<&Value>) -> Result<i64> {
    let invalid = || AppError::Validation("Invalid quantity".to_string());
    match value {
        None => Ok(1),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.trunc() as i64)
            } else {
                Err(invalid())
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Coerce a product quantity and enforce the [1, MAX_QUANTITY] range.
pub fn parse_product_quantity(value: Option<&Value>) -> Result<i64> {
    let quantity = parse_quantity(value)?;
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(AppError::Validation(format!(
            "Quantity must be between 1 and {}",
            MAX_QUANTITY
        )));
    }
    Ok(quantity)
}

/// Coerce a JSON value to a non-negative price.
///
/// Absent fields default to 0.0. Numbers and numeric strings are accepted.
pub fn parse_price(value: Option<&Value>) -> Result<f64> {
    let invalid = || AppError::Validation("Invalid price".to_string());
    let price = match value {
        None => 0.0,
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_strips_nul_bytes_and_trims() {
        let out = sanitize_text(Some("  Mil\0k  ".to_string()), 200);
        assert_eq!(out.as_deref(), Some("Milk"));
    }

    #[test]
    fn sanitize_truncates_by_characters() {
        let out = sanitize_text(Some("äöüäöü".to_string()), 3);
        assert_eq!(out.as_deref(), Some("äöü"));
    }

    #[test]
    fn sanitize_passes_empty_through() {
        assert_eq!(sanitize_text(None, 10), None);
        assert_eq!(sanitize_text(Some(String::new()), 10).as_deref(), Some(""));
    }

    #[test]
    fn sanitize_can_produce_empty_from_whitespace() {
        let out = sanitize_text(Some("   ".to_string()), 10);
        assert_eq!(out.as_deref(), Some(""));
    }

    #[test]
    fn require_name_rejects_whitespace_only() {
        assert!(require_name(Some("   ".to_string()), 200, "Product name").is_err());
        assert!(require_name(None, 200, "Product name").is_err());
        assert_eq!(
            require_name(Some(" Milk ".to_string()), 200, "Product name").unwrap(),
            "Milk"
        );
    }

    #[test]
    fn quantity_defaults_to_one() {
        assert_eq!(parse_quantity(None).unwrap(), 1);
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity(Some(&json!(5))).unwrap(), 5);
        assert_eq!(parse_quantity(Some(&json!(3.9))).unwrap(), 3);
        assert_eq!(parse_quantity(Some(&json!("7"))).unwrap(), 7);
    }

    #[test]
    fn quantity_rejects_garbage() {
        assert!(parse_quantity(Some(&json!("abc"))).is_err());
        assert!(parse_quantity(Some(&json!(null))).is_err());
        assert!(parse_quantity(Some(&json!([1]))).is_err());
    }

    #[test]
    fn product_quantity_enforces_range() {
        assert!(parse_product_quantity(Some(&json!(0))).is_err());
        assert!(parse_product_quantity(Some(&json!(10000))).is_err());
        assert_eq!(parse_product_quantity(Some(&json!(9999))).unwrap(), 9999);
        assert_eq!(parse_product_quantity(Some(&json!(1))).unwrap(), 1);
    }

    #[test]
    fn price_defaults_to_zero() {
        assert_eq!(parse_price(None).unwrap(), 0.0);
    }

    #[test]
    fn price_accepts_numbers_and_strings() {
        assert_eq!(parse_price(Some(&json!(2.49))).unwrap(), 2.49);
        assert_eq!(parse_price(Some(&json!("1.99"))).unwrap(), 1.99);
    }

    #[test]
    fn price_rejects_negative_and_garbage() {
        assert!(parse_price(Some(&json!(-1.0))).is_err());
        assert!(parse_price(Some(&json!("cheap"))).is_err());
        assert!(parse_price(Some(&json!(null))).is_err());
    }
}

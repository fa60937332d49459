// src/handlers/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::inventory::{fits_scale, PRICE_SCALE, QUANTITY_SCALE};

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

// ---
// Textos (o length(min = 1) do validator aceita "   ")
// ---

pub(crate) fn validate_name(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        return Err(error("blank", "validation.name_required"));
    }
    Ok(())
}

pub(crate) fn validate_code(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        return Err(error("blank", "validation.code_required"));
    }
    Ok(())
}

// ---
// Decimais: precisam caber nas colunas NUMERIC sem arredondar
// ---

/// Quantidade movimentada: > 0 e no máximo 3 casas.
pub(crate) fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = error("range", "validation.positive");
        err.add_param("exclusive_min".into(), &0.0);
        return Err(err);
    }
    if !fits_scale(*val, QUANTITY_SCALE) {
        let mut err = error("precision", "validation.quantity_precision");
        err.add_param("max_decimals".into(), &QUANTITY_SCALE);
        return Err(err);
    }
    Ok(())
}

/// Saldo inicial: >= 0 e no máximo 3 casas.
pub(crate) fn validate_stock_quantity(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = error("range", "validation.not_negative");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    if !fits_scale(*val, QUANTITY_SCALE) {
        let mut err = error("precision", "validation.quantity_precision");
        err.add_param("max_decimals".into(), &QUANTITY_SCALE);
        return Err(err);
    }
    Ok(())
}

/// Preço: >= 0 e no máximo 2 casas.
pub(crate) fn validate_price(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = error("range", "validation.not_negative");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    if !fits_scale(*val, PRICE_SCALE) {
        let mut err = error("precision", "validation.price_precision");
        err.add_param("max_decimals".into(), &PRICE_SCALE);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ValidationError) -> String {
        err.message.map(|m| m.to_string()).unwrap_or_default()
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        assert!(validate_name("Centro").is_ok());
        assert_eq!(message(validate_name("   ").unwrap_err()), "validation.name_required");
        assert_eq!(message(validate_code("\t").unwrap_err()), "validation.code_required");
    }

    #[test]
    fn positive_rejects_zero_negative_and_extra_decimals() {
        assert!(validate_positive(&Decimal::ONE).is_ok());
        assert!(validate_positive(&Decimal::new(1, 3)).is_ok());
        assert_eq!(message(validate_positive(&Decimal::ZERO).unwrap_err()), "validation.positive");
        assert!(validate_positive(&Decimal::new(-1, 0)).is_err());
        assert_eq!(
            message(validate_positive(&Decimal::new(5, 4)).unwrap_err()),
            "validation.quantity_precision"
        );
    }

    #[test]
    fn price_allows_cents_only() {
        assert!(validate_price(&Decimal::new(1990, 2)).is_ok());
        assert!(validate_price(&Decimal::ZERO).is_ok());
        assert_eq!(
            message(validate_price(&Decimal::new(19_999, 3)).unwrap_err()),
            "validation.price_precision"
        );
        assert_eq!(message(validate_price(&Decimal::new(-1, 2)).unwrap_err()), "validation.not_negative");
    }

    #[test]
    fn stock_quantity_allows_zero_but_not_extra_decimals() {
        assert!(validate_stock_quantity(&Decimal::ZERO).is_ok());
        assert!(validate_stock_quantity(&Decimal::new(1_500, 3)).is_ok());
        assert!(validate_stock_quantity(&Decimal::new(5, 4)).is_err());
    }
}

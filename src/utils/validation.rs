//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is non-zero
pub fn validate_non_zero_amount(amount: &BigDecimal) -> CashbookResult<()> {
    if *amount == BigDecimal::from(0) {
        Err(CashbookError::Validation(
            "Amount must be non-zero".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a source id is usable for correlation
pub fn validate_source_id(source_id: &str) -> CashbookResult<()> {
    if source_id.trim().is_empty() {
        return Err(CashbookError::Validation(
            "Source id cannot be empty".to_string(),
        ));
    }

    if source_id.len() > 100 {
        return Err(CashbookError::Validation(
            "Source id cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a movement description is valid
pub fn validate_description(description: &str) -> CashbookResult<()> {
    if description.trim().is_empty() {
        return Err(CashbookError::Validation(
            "Description cannot be empty when provided".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(CashbookError::Validation(
            "Description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Strict movement validator: on top of the default rules, the sign of the
/// amount must match the direction its source implies.
pub struct StrictMovementValidator;

impl MovementValidator for StrictMovementValidator {
    fn validate_movement(
        &self,
        source: &TransactionSource,
        amount: &BigDecimal,
        description: Option<&str>,
    ) -> CashbookResult<()> {
        validate_non_zero_amount(amount)?;

        if let Some(description) = description {
            validate_description(description)?;
        }

        let zero = BigDecimal::from(0);
        match source {
            TransactionSource::SalePayment => {
                if *amount < zero {
                    return Err(CashbookError::Validation(
                        "Sale payments must be positive inflows".to_string(),
                    ));
                }
            }
            TransactionSource::PurchasePayment | TransactionSource::ExpensePayment => {
                if *amount > zero {
                    return Err(CashbookError::Validation(
                        "Purchase and expense payments must be negative outflows".to_string(),
                    ));
                }
            }
            // Adjustment deltas may go either way: a set correction can
            // lower the balance.
            TransactionSource::OpeningBalanceAddition { .. } => {}
        }

        Ok(())
    }
}

use thiserror::Error;

use crate::engine::types::MarketOrder;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("instrument id cannot be empty")]
    EmptyInstrumentId,
    #[error("quantity must be greater than zero, got {quantity}")]
    NonPositiveQuantity { quantity: u64 },
    #[error("price must be a positive finite number, got {price}")]
    InvalidPrice { price: f64 },
}

pub fn validate_instrument_id(instrument_id: &str) -> Result<(), ValidationError> {
    if instrument_id.is_empty() {
        return Err(ValidationError::EmptyInstrumentId);
    }
    Ok(())
}

pub fn validate_quote_params(instrument_id: &str, quantity: u64) -> Result<(), ValidationError> {
    validate_instrument_id(instrument_id)?;
    if quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity { quantity });
    }
    Ok(())
}

/// Checks an observed order before it is logged or merged.
pub fn validate_order(order: &MarketOrder) -> Result<(), ValidationError> {
    validate_instrument_id(&order.instrument_id)?;
    if !(order.price.is_finite() && order.price > 0.0) {
        return Err(ValidationError::InvalidPrice { price: order.price });
    }
    if order.quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity { quantity: 0 });
    }
    Ok(())
}

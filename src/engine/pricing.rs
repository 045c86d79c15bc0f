//! Pure price computations over an instrument's order list.
//!
//! Nothing here locks or touches the cache; callers hand in a snapshot.
//! Both functions return `0.0` when there is nothing to price.

use ordered_float::OrderedFloat;

use crate::engine::types::MarketOrder;

/// Lowest price among orders that can each fill `quantity` on their own.
pub fn best_price(orders: &[MarketOrder], quantity: u64) -> f64 {
    orders
        .iter()
        .filter(|order| order.quantity >= quantity)
        .map(|order| OrderedFloat(order.price))
        .min()
        .map_or(0.0, OrderedFloat::into_inner)
}

/// Quantity-weighted mean price across every order.
pub fn volume_weighted_average_price(orders: &[MarketOrder]) -> f64 {
    // Volume is summed in f64: a handful of large u64 quantities overflows u64
    let (notional, volume) = orders
        .iter()
        .fold((0.0_f64, 0.0_f64), |(notional, volume), order| {
            (notional + order.notional(), volume + order.quantity as f64)
        });

    if volume == 0.0 {
        return 0.0;
    }
    notional / volume
}

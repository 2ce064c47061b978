//! Position ladder math
//!
//! Pure, side-effect-free functions over a strategy config and fill history.
//! Everything the state machine decides on a tick is computed here, which
//! keeps the trigger logic deterministic and unit-testable.

use crate::bot::Fill;
use crate::config::{ProfitCurrency, StrategyConfig, TakeProfitBasis};

/// Price at which the next safety order triggers.
///
/// Deviation for safety order `i` (1-indexed) is
/// `price_deviation_percent * step_scale^(i-1)`, compounded step by step from
/// the base order's fill price. The trigger is never re-based on the moving
/// average entry price.
pub fn next_safety_trigger_price(
    config: &StrategyConfig,
    base_fill_price: f64,
    safety_orders_filled: u32,
) -> f64 {
    let mut price = base_fill_price;
    for i in 1..=safety_orders_filled + 1 {
        let deviation = config.price_deviation_percent * config.step_scale.powi(i as i32 - 1);
        price *= 1.0 - deviation / 100.0;
    }
    price
}

/// Base-currency quantity of safety order `i` (1-indexed) at its trigger price.
pub fn next_safety_order_quantity(config: &StrategyConfig, i: u32, trigger_price: f64) -> f64 {
    let volume = config.safety_order_size * config.volume_scale.powi(i as i32 - 1);
    volume / trigger_price
}

/// Quantity-weighted mean fill price; zero for an empty position.
pub fn average_entry_price(fills: &[Fill]) -> f64 {
    let total_quantity: f64 = fills.iter().map(|f| f.quantity).sum();
    if total_quantity <= 0.0 {
        return 0.0;
    }
    let total_cost: f64 = fills.iter().map(|f| f.price * f.quantity).sum();
    total_cost / total_quantity
}

/// Quote-currency capital spent across all fills.
pub fn invested(fills: &[Fill]) -> f64 {
    fills.iter().map(|f| f.price * f.quantity).sum()
}

/// Unrealized PnL in percent. Positive when the current price exceeds the
/// average entry (long-only ladder).
pub fn unrealized_pnl_percent(
    average_entry_price: f64,
    current_price: f64,
    currency: ProfitCurrency,
) -> f64 {
    if average_entry_price <= 0.0 || current_price <= 0.0 {
        return 0.0;
    }
    match currency {
        ProfitCurrency::Quote => {
            (current_price - average_entry_price) / average_entry_price * 100.0
        }
        ProfitCurrency::Base => (1.0 - average_entry_price / current_price) * 100.0,
    }
}

/// Price at which the take-profit exit triggers.
pub fn take_profit_target_price(
    config: &StrategyConfig,
    average_entry_price: f64,
    base_fill_price: f64,
) -> f64 {
    let basis = match config.take_profit_basis {
        TakeProfitBasis::TotalVolume => average_entry_price,
        TakeProfitBasis::BaseOnly => base_fill_price,
    };
    basis * (1.0 + config.take_profit_percent / 100.0)
}

/// Price at which the stop-loss exit triggers. Only meaningful when
/// `stop_loss_enabled` is set on the config.
pub fn stop_loss_target_price(config: &StrategyConfig, average_entry_price: f64) -> f64 {
    average_entry_price * (1.0 - config.stop_loss_percent / 100.0)
}

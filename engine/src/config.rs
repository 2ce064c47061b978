//! DCA strategy configuration

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Price basis for the take-profit target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeProfitBasis {
    /// Relative to the volume-weighted average entry price
    #[default]
    TotalVolume,
    /// Relative to the base order fill price alone
    BaseOnly,
}

/// Currency the realized profit is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitCurrency {
    /// Profit in quote units (e.g. USDT)
    #[default]
    Quote,
    /// Profit in base units (e.g. BTC)
    Base,
}

/// What to do with the position when the stop-loss fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopAction {
    /// Market-close the accumulated position
    #[default]
    Close,
    /// Halt the ladder but leave the position untouched
    Continue,
}

/// How the base order is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Market order at the current price
    #[default]
    Market,
    /// Limit order at the current price
    Limit,
}

/// Immutable DCA strategy parameters, fixed at bot creation time.
///
/// Unknown fields in incoming payloads are rejected; field aliases accept the
/// legacy payload names (`base_order`, `take_profit`, `loop_enabled`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyConfig {
    /// Quote-currency size of the base order
    #[serde(alias = "base_order")]
    pub base_order_size: f64,
    /// Quote-currency size of the first safety order
    #[serde(alias = "safety_order")]
    pub safety_order_size: f64,
    /// Maximum number of safety orders in the ladder
    pub max_safety_orders: u32,
    /// Multiplies each successive safety order size
    pub volume_scale: f64,
    /// Multiplies each successive price-deviation step
    pub step_scale: f64,
    /// Price deviation (percent) that triggers the first safety order
    #[serde(alias = "price_deviation")]
    pub price_deviation_percent: f64,
    /// Take-profit threshold in percent
    #[serde(alias = "take_profit")]
    pub take_profit_percent: f64,
    /// Basis the take-profit target is computed from
    pub take_profit_basis: TakeProfitBasis,
    /// Currency profit is measured in
    pub profit_currency: ProfitCurrency,
    /// Position handling on stop-loss
    pub stop_action: StopAction,
    /// Whether the stop-loss is evaluated at all
    pub stop_loss_enabled: bool,
    /// Stop-loss threshold in percent below average entry
    #[serde(alias = "stop_loss")]
    pub stop_loss_percent: f64,
    /// Restart the ladder automatically after a take-profit cycle
    #[serde(alias = "loop_enabled")]
    pub continuous_mode: bool,
    /// How the base order is placed
    pub entry_type: EntryType,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_order_size: 20.0,
            safety_order_size: 40.0,
            max_safety_orders: 15,
            volume_scale: 1.05,
            step_scale: 1.0,
            price_deviation_percent: 2.0,
            take_profit_percent: 1.5,
            take_profit_basis: TakeProfitBasis::TotalVolume,
            profit_currency: ProfitCurrency::Quote,
            stop_action: StopAction::Close,
            stop_loss_enabled: false,
            stop_loss_percent: 5.0,
            continuous_mode: true,
            entry_type: EntryType::Market,
        }
    }
}

impl StrategyConfig {
    /// Validate all parameters. Called before any capital is reserved.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
            Ok(())
        }

        positive("base_order_size", self.base_order_size)?;
        positive("take_profit_percent", self.take_profit_percent)?;
        positive("volume_scale", self.volume_scale)?;
        positive("step_scale", self.step_scale)?;
        if self.max_safety_orders > 0 {
            positive("safety_order_size", self.safety_order_size)?;
            positive("price_deviation_percent", self.price_deviation_percent)?;
            if self.price_deviation_percent >= 100.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "price_deviation_percent must be below 100, got {}",
                    self.price_deviation_percent
                )));
            }
        }
        if self.stop_loss_enabled {
            positive("stop_loss_percent", self.stop_loss_percent)?;
        }
        Ok(())
    }

    /// Quote-currency cost of the fully-filled ladder: the base order plus
    /// every potential safety order. This is the amount reserved at creation.
    pub fn max_ladder_cost(&self) -> f64 {
        let mut cost = self.base_order_size;
        for i in 1..=self.max_safety_orders {
            cost += self.safety_order_size * self.volume_scale.powi(i as i32 - 1);
        }
        cost
    }
}

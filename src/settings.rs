use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::ledger::catalog::{FeeSchedule, RewardSchedule, SwapTerms};
use crate::models::amount::Amount;

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Http {
    pub bind: String,
}

/// Reward amounts in display units (e.g. `1.0` Fair); converted to cents
/// when the schedule snapshot is taken.
#[derive(Clone, Debug, Deserialize)]
pub struct Rewards {
    pub daily_check_in: f64,
    pub mining: f64,
    pub ad_bonus: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fees {
    pub fair_fee: f64,
    pub fair_min_send: f64,
    pub usdt_fee: f64,
    pub usdt_min_send: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Swap {
    pub fairx_to_fair_rate: f64,
    pub min_amount: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Features {
    pub ads_enabled: bool,
    pub maintenance: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    pub http: Http,
    pub rewards: Rewards,
    pub fees: Fees,
    pub swap: Swap,
    pub features: Features,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config.toml"))
            .build()?;

        config.try_deserialize()
    }

    pub fn reward_schedule(&self) -> RewardSchedule {
        RewardSchedule {
            daily_check_in: Amount::from_units(self.rewards.daily_check_in),
            mining: Amount::from_units(self.rewards.mining),
            ad_bonus: Amount::from_units(self.rewards.ad_bonus),
        }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            fair_fee: Amount::from_units(self.fees.fair_fee),
            fair_min_send: Amount::from_units(self.fees.fair_min_send),
            usdt_fee: Amount::from_units(self.fees.usdt_fee),
            usdt_min_send: Amount::from_units(self.fees.usdt_min_send),
        }
    }

    pub fn swap_terms(&self) -> SwapTerms {
        SwapTerms {
            fairx_to_fair_rate: self.swap.fairx_to_fair_rate,
            min_amount: Amount::from_units(self.swap.min_amount),
        }
    }
}

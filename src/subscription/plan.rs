//! Subscription plans, currencies and the price list.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::choice::Choice;

/// Invoice currency. Each has its own price list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Uah,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rub => "RUB",
            Self::Uah => "UAH",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Rub => "₽",
            Self::Uah => "₴",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUB" => Ok(Self::Rub),
            "UAH" => Ok(Self::Uah),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Month,
    Quarter,
    Year,
}

impl SubscriptionPlan {
    /// Length of the entitlement granted by one settlement.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Month => Duration::days(30),
            Self::Quarter => Duration::days(90),
            Self::Year => Duration::days(365),
        }
    }

    pub fn price(&self, currency: Currency) -> Decimal {
        match (currency, self) {
            (Currency::Rub, Self::Month) => dec!(299),
            (Currency::Rub, Self::Quarter) => dec!(799),
            (Currency::Rub, Self::Year) => dec!(2999),
            (Currency::Uah, Self::Month) => dec!(120),
            (Currency::Uah, Self::Quarter) => dec!(320),
            (Currency::Uah, Self::Year) => dec!(1200),
        }
    }

    /// Price in the currency's minor unit (kopecks, kopiyky), as payment
    /// providers expect it.
    pub fn price_minor_units(&self, currency: Currency) -> i64 {
        let minor = (self.price(currency) * dec!(100)).round();
        i64::try_from(minor).unwrap_or(i64::MAX)
    }

    /// Button label with the price, e.g. `1 month - 299 ₽`.
    pub fn priced_label(&self, currency: Currency) -> String {
        format!(
            "{} - {} {}",
            self.label(),
            self.price(currency),
            currency.symbol()
        )
    }
}

impl Choice for SubscriptionPlan {
    const FIELD: &'static str = "subscribe";
    const ALL: &'static [Self] = &[Self::Month, Self::Quarter, Self::Year];

    fn key(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Month => "1 month",
            Self::Quarter => "3 months",
            Self::Year => "1 year",
        }
    }
}

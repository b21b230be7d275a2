//! Service plans and their Stripe wiring.
//!
//! The portal does not call Stripe. It only carries the configuration contract:
//! which Stripe price backs each plan, and the publishable key checkout pages
//! would need.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, Price};

/// Errors raised while validating Stripe identifiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("stripe price id must start with `price_`: {0}")]
    InvalidPriceId(String),

    #[error("stripe publishable key must start with `pk_`")]
    InvalidPublishableKey,

    #[error("unknown plan: {0}")]
    UnknownPlan(String),
}

/// Service plans offered on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    Weekly,
    Biweekly,
    TwiceWeekly,
    OneTime,
}

impl PlanId {
    /// All plans, in display order.
    pub const ALL: [Self; 4] = [Self::Weekly, Self::Biweekly, Self::TwiceWeekly, Self::OneTime];

    /// Snake-case identifier used in URLs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::TwiceWeekly => "twice_weekly",
            Self::OneTime => "one_time",
        }
    }

    /// Suffix of the `STRIPE_PRICE_<PLAN>` override variable.
    #[must_use]
    pub const fn env_suffix(self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Biweekly => "BIWEEKLY",
            Self::TwiceWeekly => "TWICE_WEEKLY",
            Self::OneTime => "ONE_TIME",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| BillingError::UnknownPlan(s.to_owned()))
    }
}

/// How often a plan bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Week,
    Once,
}

/// A Stripe price identifier (`price_...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StripePriceId(String);

impl StripePriceId {
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidPriceId`] unless the id starts with `price_`
    /// and has something after it.
    pub fn parse(id: &str) -> Result<Self, BillingError> {
        let id = id.trim();
        match id.strip_prefix("price_") {
            Some(rest) if !rest.is_empty() => Ok(Self(id.to_owned())),
            _ => Err(BillingError::InvalidPriceId(id.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StripePriceId {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StripePriceId> for String {
    fn from(id: StripePriceId) -> Self {
        id.0
    }
}

/// A Stripe publishable key (`pk_live_...` or `pk_test_...`).
///
/// Publishable keys are meant for browsers, so this is not treated as a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StripePublishableKey(String);

impl StripePublishableKey {
    /// # Errors
    ///
    /// Returns [`BillingError::InvalidPublishableKey`] unless the key starts with `pk_`.
    pub fn parse(key: &str) -> Result<Self, BillingError> {
        let key = key.trim();
        match key.strip_prefix("pk_") {
            Some(rest) if !rest.is_empty() => Ok(Self(key.to_owned())),
            _ => Err(BillingError::InvalidPublishableKey),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a test-mode key.
    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        self.0.starts_with("pk_test_")
    }
}

/// A purchasable plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    pub description: &'static str,
    pub price: Price,
    pub interval: BillingInterval,
    pub stripe_price_id: StripePriceId,
}

impl Plan {
    /// Price with its billing period, e.g. `$25.00 / week`.
    #[must_use]
    pub fn price_label(&self) -> String {
        match self.interval {
            BillingInterval::Week => format!("{} / week", self.price.display()),
            BillingInterval::Once => self.price.display(),
        }
    }
}

struct PlanDefaults {
    id: PlanId,
    name: &'static str,
    description: &'static str,
    cents: i64,
    interval: BillingInterval,
    stripe_price_id: &'static str,
}

const DEFAULT_PLANS: [PlanDefaults; 4] = [
    PlanDefaults {
        id: PlanId::Weekly,
        name: "Weekly",
        description: "One visit every week. Our most popular plan.",
        cents: 2_500,
        interval: BillingInterval::Week,
        stripe_price_id: "price_1PYardWeekly",
    },
    PlanDefaults {
        id: PlanId::Biweekly,
        name: "Bi-Weekly",
        description: "One visit every other week, billed weekly.",
        cents: 1_500,
        interval: BillingInterval::Week,
        stripe_price_id: "price_1PYardBiweekly",
    },
    PlanDefaults {
        id: PlanId::TwiceWeekly,
        name: "Twice Weekly",
        description: "Two visits every week for multi-dog households.",
        cents: 4_000,
        interval: BillingInterval::Week,
        stripe_price_id: "price_1PYardTwiceWeekly",
    },
    PlanDefaults {
        id: PlanId::OneTime,
        name: "One-Time Cleanup",
        description: "A single deep clean of the whole yard.",
        cents: 9_900,
        interval: BillingInterval::Once,
        stripe_price_id: "price_1PYardOneTime",
    },
];

/// The plan catalog with its Stripe configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingCatalog {
    plans: Vec<Plan>,
    publishable_key: Option<StripePublishableKey>,
}

impl Default for BillingCatalog {
    fn default() -> Self {
        let plans = DEFAULT_PLANS
            .iter()
            .map(|d| Plan {
                id: d.id,
                name: d.name,
                description: d.description,
                price: Price::from_cents(d.cents, CurrencyCode::USD),
                interval: d.interval,
                stripe_price_id: StripePriceId(d.stripe_price_id.to_owned()),
            })
            .collect();
        Self {
            plans,
            publishable_key: None,
        }
    }
}

impl BillingCatalog {
    /// Catalog with the compiled-in Stripe price ids.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the Stripe price backing `plan`.
    #[must_use]
    pub fn with_price_id(mut self, plan: PlanId, price_id: StripePriceId) -> Self {
        if let Some(entry) = self.plans.iter_mut().find(|p| p.id == plan) {
            entry.stripe_price_id = price_id;
        }
        self
    }

    /// Attach the publishable key.
    #[must_use]
    pub fn with_publishable_key(mut self, key: StripePublishableKey) -> Self {
        self.publishable_key = Some(key);
        self
    }

    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub const fn publishable_key(&self) -> Option<&StripePublishableKey> {
        self.publishable_key.as_ref()
    }
}

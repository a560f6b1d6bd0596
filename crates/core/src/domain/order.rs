use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Admin API global id for a numeric order id from a webhook body.
    pub fn from_numeric(id: u64) -> Self {
        Self(format!("gid://shopify/Order/{id}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: CustomerId,
    pub first_name: Option<String>,
}

/// Read-only view of the newest order still awaiting the customer's answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub name: String,
    pub customer: Option<CustomerRef>,
    pub tags: Vec<String>,
}

impl PendingOrder {
    /// Order name without the platform's leading `#`.
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('#')
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        self.customer.as_ref().map(|customer| &customer.id)
    }

    pub fn customer_first_name(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|customer| customer.first_name.as_deref())
            .filter(|name| !name.trim().is_empty())
    }
}

pub fn parse_amount(raw: &str) -> Result<Decimal, DomainError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| DomainError::InvalidAmount { raw: raw.to_string() })
}

/// Rounds to whole currency units, halves away from zero.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let whole = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    format!("{whole} {currency}")
}

/// `percent` of `total`; totals too large for the multiplication are rejected.
pub fn advance_payment(total: Decimal, percent: Decimal) -> Result<Decimal, DomainError> {
    total
        .checked_mul(percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| DomainError::InvalidAmount { raw: total.to_string() })
}

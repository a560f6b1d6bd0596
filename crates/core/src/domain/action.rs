use serde::{Deserialize, Serialize};

/// Quick-reply buttons offered by the order confirmation template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerAction {
    ConfirmOrder,
    CancelOrder,
    PaymentDetails,
    NeedInformation,
    FreeText(String),
}

impl CustomerAction {
    /// Exact, case-sensitive match on the button label; anything else is free text.
    pub fn parse(reply: &str) -> Self {
        match reply {
            "Confirm Order" => Self::ConfirmOrder,
            "Cancel Order" => Self::CancelOrder,
            "Get payment Details" => Self::PaymentDetails,
            "Need Information" => Self::NeedInformation,
            _ => Self::FreeText(reply.to_string()),
        }
    }

    pub fn action_key(&self) -> &'static str {
        match self {
            Self::ConfirmOrder => "order.confirm",
            Self::CancelOrder => "order.cancel",
            Self::PaymentDetails => "payment.details",
            Self::NeedInformation => "assistant.information",
            Self::FreeText(_) => "human.escalation",
        }
    }

    /// Actions that act on the pending order and fall back to a human without one.
    pub fn requires_order(&self) -> bool {
        matches!(self, Self::ConfirmOrder | Self::CancelOrder)
    }
}

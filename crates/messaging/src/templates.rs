use codbot_core::config::PaymentConfig;

pub const HUMAN_HANDOFF_TEXT: &str =
    "Thank you for your message. A representative will get back to you shortly.";

/// Every reply the chat dispatcher can send back to a customer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    OrderConfirmed { order_name: String },
    OrderCancelled { order_name: String },
    PaymentDetails { bank_name: String, account_title: String, account_number: String },
    Assistant { text: String },
    HumanHandoff,
}

impl Reply {
    pub fn payment_details(payment: &PaymentConfig) -> Self {
        Self::PaymentDetails {
            bank_name: payment.bank_name.clone(),
            account_title: payment.account_title.clone(),
            account_number: payment.account_number.clone(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::OrderConfirmed { order_name } => {
                format!("Thank you! Your order #{order_name} has been confirmed.")
            }
            Self::OrderCancelled { order_name } => {
                format!("Your order #{order_name} has been cancelled as requested.")
            }
            Self::PaymentDetails { bank_name, account_title, account_number } => format!(
                "Thank you for confirming! You can send the advance payment to the following bank account:\n\n\
                 Bank: {bank_name}\n\
                 Account Title: {account_title}\n\
                 Account Number: {account_number}\n\n\
                 Please send a screenshot of the receipt to this number once completed."
            ),
            Self::Assistant { text } => text.clone(),
            Self::HumanHandoff => HUMAN_HANDOFF_TEXT.to_string(),
        }
    }
}

/// Positional parameters of the cash-on-delivery confirmation template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderNotification {
    pub customer_name: String,
    pub order_name: String,
    pub product_name: String,
    pub order_amount: String,
    pub advance_payment: String,
    pub shipping_address: String,
}

impl OrderNotification {
    pub fn params(&self) -> Vec<String> {
        vec![
            self.customer_name.clone(),
            self.order_name.clone(),
            self.product_name.clone(),
            self.order_amount.clone(),
            self.advance_payment.clone(),
            self.shipping_address.clone(),
        ]
    }
}

use serde::{Deserialize, Serialize};

/// Static store facts handed to the assistant prompt. Serialized in
/// camelCase because the prompt embeds it as JSON; read from TOML in snake_case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct KnowledgeBase {
    pub store_name: String,
    pub location: String,
    pub specialty: String,
    pub payment_methods: String,
    #[serde(default)]
    pub current_campaigns: Vec<Campaign>,
    pub gold_price_estimate: GoldPriceEstimate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub name: String,
    pub details: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct GoldPriceEstimate {
    pub rate_per_gram_24k: u32,
    pub grams_for_small_ring: u32,
    pub grams_for_large_ring: u32,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self {
            store_name: "Ringshing.com".to_string(),
            location: "Block, Ground floor, Pace/ B1, 96-B MM Alam Rd, Block B1 Block B 1 Gulberg III, Lahore, 54660".to_string(),
            specialty: "Premium Moissanite and Diamond Jewellery".to_string(),
            payment_methods: "Cash on Delivery (with 1% advance) and Bank Deposit.".to_string(),
            current_campaigns: vec![
                Campaign {
                    name: "Summer Sale".to_string(),
                    details: "15% off on all necklaces until the end of July.".to_string(),
                },
                Campaign {
                    name: "New Customer Welcome".to_string(),
                    details: "A special 10% discount for your next purchase.".to_string(),
                },
            ],
            gold_price_estimate: GoldPriceEstimate {
                rate_per_gram_24k: 21_500,
                grams_for_small_ring: 4,
                grams_for_large_ring: 6,
            },
        }
    }
}

impl KnowledgeBase {
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"storeName\":\"{}\"}}", self.store_name))
    }
}

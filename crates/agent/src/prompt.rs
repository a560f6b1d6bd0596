use tera::{Context, Tera};

use codbot_core::KnowledgeBase;

use crate::guardrails::BOUNDARY_REPLY;
use crate::llm::LlmError;

const PERSONA_TEMPLATE: &str = "persona.txt.tera";
const PERSONA_NAME: &str = "Sana";
pub const DEFAULT_CUSTOMER_NAME: &str = "Valued Customer";

/// Per-message inputs to the persona prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptContext {
    pub customer_name: Option<String>,
    pub order_name: Option<String>,
    pub customer_message: String,
}

#[derive(Clone, Debug)]
pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    pub fn new() -> Result<Self, LlmError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            PERSONA_TEMPLATE,
            include_str!("../../../templates/prompts/persona.txt.tera"),
        )
        .map_err(|error| LlmError::Prompt(error.to_string()))?;

        Ok(Self { tera })
    }

    pub fn render(
        &self,
        knowledge_base: &KnowledgeBase,
        prompt: &PromptContext,
    ) -> Result<String, LlmError> {
        let customer_name = prompt
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CUSTOMER_NAME);

        let mut context = Context::new();
        context.insert("persona_name", PERSONA_NAME);
        context.insert("store_name", &knowledge_base.store_name);
        context.insert("boundary_reply", BOUNDARY_REPLY);
        context.insert("knowledge_base", &knowledge_base.to_prompt_json());
        context.insert("customer_name", customer_name);
        context.insert("order_name", &prompt.order_name);
        context.insert("customer_message", &prompt.customer_message);

        self.tera
            .render(PERSONA_TEMPLATE, &context)
            .map_err(|error| LlmError::Prompt(error.to_string()))
    }
}

//! Generative Responder - LLM-backed answers for "Need Information" replies
//!
//! This crate provides the assistant side of codbot:
//! - Builds the persona prompt from the store knowledge base and order context
//! - Calls the generative text endpoint (Gemini `generateContent`)
//! - Falls back to a fixed escalation phrase when no candidate comes back
//! - Flags replies that hand the conversation to a human
//!
//! # Architecture
//!
//! 1. **Prompt** (`prompt`) - persona rules + knowledge base + context → prompt text
//! 2. **Completion** (`llm`) - prompt → first candidate text, if any
//! 3. **Guardrails** (`guardrails`) - reply → answer or escalate
//! 4. **Runtime** (`runtime`) - ties the three together for the dispatcher
//!
//! # Key Types
//!
//! - `GenerativeResponder` - Entry point used by the chat webhook
//! - `LlmClient` - Pluggable trait implemented by `GeminiClient` and test fakes
//! - `EscalationPolicy` - Detects the human-representative marker
//!
//! The model never mutates orders. Tagging for human follow-up is decided by the
//! caller from the `AssistantReply::escalate` flag.

pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;

pub use guardrails::{EscalationPolicy, GuardrailDecision};
pub use llm::{GeminiClient, LlmClient, LlmError};
pub use prompt::{PromptBuilder, PromptContext};
pub use runtime::{AssistantReply, GenerativeResponder};

//! WhatsApp messaging through the Gupshup gateway
//!
//! This crate provides the messaging interface for codbot:
//! - **Gateway** (`gateway`) - outbound text and template sends (form-encoded HTTP)
//! - **Events** (`events`) - inbound chat webhook payload parsing
//! - **Templates** (`templates`) - fixed customer-facing reply texts and the
//!   positional parameters of the order confirmation template
//!
//! # Architecture
//!
//! ```text
//! Gupshup webhook → events::parse_inbound → dispatcher → templates::Reply
//!                                                           ↓
//!                                      MessagingGateway::send_text
//! ```
//!
//! # Key Types
//!
//! - `MessagingGateway` - Trait implemented by `GupshupClient` and test fakes
//! - `InboundEvent` - Classified chat webhook delivery
//! - `Reply` - Closed set of replies the dispatcher can produce

pub mod events;
pub mod gateway;
pub mod templates;

pub use events::{parse_inbound, InboundEvent, InboundMessage, InboundParseError};
pub use gateway::{GatewayError, GatewayResponse, GupshupClient, MessagingGateway};
pub use templates::{OrderNotification, Reply};

pub mod config;
pub mod domain;
pub mod errors;
pub mod knowledge;
pub mod phone;
pub mod signature;

pub use domain::action::CustomerAction;
pub use domain::conversation::{Conversation, Direction, Message, MessageId};
pub use domain::order::{CustomerId, CustomerRef, OrderId, PendingOrder};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use knowledge::KnowledgeBase;
pub use phone::{normalize_phone, PhoneNormalizer};

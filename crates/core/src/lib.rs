//! Shared conversation model and collaborator interfaces.

pub mod clock;
pub mod ids;
pub mod knowledge;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use knowledge::{
    InMemoryKnowledgeBases, KnowledgeBase, KnowledgeBaseEntry, KnowledgeBaseError,
    KnowledgeBaseResolver,
};
pub use types::*;

pub mod format;
pub mod llm;
pub mod reveal;
pub mod select;

pub use format::format_response;
pub use llm::{
    CandidateFetch, ChatError, ChatOpts, ConversationTurn, Model, ModelClient, Role,
};
pub use reveal::{RevealScheduler, RevealStep};
pub use select::choose_default;

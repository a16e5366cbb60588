//! Chatbot module - answers student questions through a chain of providers.

pub mod journal;
pub mod knowledge;
pub mod pipeline;
pub mod provider;
pub mod search;
pub mod telegram;


pub use journal::Journal;
pub use knowledge::KnowledgeStore;
pub use pipeline::{escalation_message, system_prompt, ProviderStage, ReplyPipeline};
pub use provider::{CompletionProvider, InvocationError, OpenAiCompatible};
pub use telegram::TelegramClient;

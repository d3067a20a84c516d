// src/answers/mod.rs
//! Where form answers come from: the cache first, the language model second.

pub mod answerer;
pub mod cache;
pub mod llm_client;
pub mod matching;
pub mod prompts;

pub use answerer::{Answerer, QuestionAnswerer, COVER_LETTER_QUESTION};
pub use cache::{sanitize_text, CachedAnswer, QuestionCache, QuestionKind};
pub use llm_client::{ChatClient, LlmClientConfig, LlmError, OpenAiChatClient};

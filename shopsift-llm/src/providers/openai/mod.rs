//! OpenAI chat-completions provider.

pub mod client;
pub mod extractor;
pub mod types;

pub use client::OpenAIClient;
pub use extractor::OpenAIKeywordExtractor;

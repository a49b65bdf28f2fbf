//! OpenRouter chat-completions provider.

mod client;
mod streaming;
mod types;

pub use client::OpenRouterClient;
pub use streaming::{SseChunkParser, SseEvent};

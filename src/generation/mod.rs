// Prompt rendering and chat completion

pub mod openai;
pub mod prompt;

pub use openai::{ApiKey, ChatReply, GeneratorOutput, OpenAiChatGenerator, Usage};
pub use prompt::{ChatMessage, ChatPromptBuilder, DEFAULT_TEMPLATE, Role};

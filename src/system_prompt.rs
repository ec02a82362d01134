//! System instruction and request assembly
//!
//! Every generation request carries the same instruction, sampling
//! parameters and safety policy; only the conversation turns vary.

use crate::llm::{GenerationConfig, LlmMessage, LlmRequest, SafetySetting};
use crate::transcript::Message;

/// Persona sent as the system instruction
pub const SYSTEM_INSTRUCTION: &str = "You are a friendly chatbot. Respond with short, informal messages, but maintain formal writing style (e.g., correct punctuation, grammar). Keep your responses concise. Be polite, do not forget to ask the other person.";

/// Build the request for one submission: the prior transcript in order,
/// followed by the new user text.
pub fn build_request(history: &[Message], prompt: &str) -> LlmRequest {
    let mut messages: Vec<LlmMessage> = history.iter().map(LlmMessage::from).collect();
    messages.push(LlmMessage::user(prompt));

    LlmRequest {
        system: Some(SYSTEM_INSTRUCTION.to_string()),
        messages,
        generation: GenerationConfig::chat(),
        safety: SafetySetting::chat_policy(),
    }
}

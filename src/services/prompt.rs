// src/services/prompt.rs
use std::fmt::Write;

use crate::models::{ChatMessage, RetrievalMatch};

pub const SYSTEM_PROMPT: &str = include_str!("../../prompts/system_prompt.md");

pub const RETRIEVAL_HEADER: &str = "Returned results from vector db (done automatically)";

/// Appends the retrieved reviews to the student's question, keeping the
/// order the index returned them in.
pub fn augment(question: &str, matches: &[RetrievalMatch]) -> String {
    let mut prompt = String::with_capacity(question.len() + RETRIEVAL_HEADER.len() + matches.len() * 256);
    prompt.push_str(question);
    prompt.push_str("\n\n");
    prompt.push_str(RETRIEVAL_HEADER);

    for m in matches {
        // Writing into a String cannot fail.
        let _ = write!(
            prompt,
            "\n\nProfessor: {}\nReview: {}\nSubject: {}\nStars: {}",
            m.id, m.review, m.subject, m.stars
        );
    }

    prompt
}

/// System instruction, then the earlier turns untouched, then the augmented
/// form of the newest question.
pub fn outgoing_messages(earlier: &[ChatMessage], augmented: String) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(earlier.len() + 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend_from_slice(earlier);
    messages.push(ChatMessage::user(augmented));
    messages
}

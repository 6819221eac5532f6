//! Maps the call transcript onto the message list sent to the completion backend.

use crate::protocol::{Role, Turn};

/// The directive used when no `system_prompt.md` is configured.
pub const DEFAULT_SYSTEM_DIRECTIVE: &str = "## Objective
You are an AI voice agent engaging in a human-like voice conversation with a user. You will respond based on your given instruction and the provided transcript and be as human-like as possible

## Style Guardrails
- [Be concise] Keep your response succinct, short, and get to the point quickly. Address one question or action item at a time. Do not pack everything you want to say into one utterance.
- [Do not repeat] Do not repeat what is in the transcript. Rephrase if you have to reiterate a point. Use varied sentence structures and vocabulary to ensure each response is unique and personalized.
- [Be conversational] Speak like a human as though you are speaking to a close friend -- use everyday language and keep it human-like.

## Role
Task: As an AI friend, you are to have a chat with the user about how his or her day went. Your role involves giving advice, listening, and acting as a close friend.

Conversational Style: Communicate concisely and conversationally. Aim for responses in short, clear prose, ideally under 10 words. This succinct approach helps in maintaining clarity and focus during your interaction with your friend.

Personality: Your approach should be empathetic, understanding, and informal. Do not repeat what is in the transcript.";

/// Default number of transcript turns kept in the prompt.
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// A backend-neutral chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// Builds the ordered message list for one generation.
///
/// The directive always comes first. Only the most recent `max_turns` turns
/// are kept so a long call cannot grow the request without bound.
pub fn build_prompt(directive: &str, history: &[Turn], max_turns: usize) -> Vec<PromptMessage> {
    let skip = history.len().saturating_sub(max_turns);
    let mut messages = Vec::with_capacity(history.len() - skip + 1);
    messages.push(PromptMessage {
        role: PromptRole::System,
        content: directive.to_string(),
    });
    messages.extend(history[skip..].iter().map(|turn| PromptMessage {
        role: match turn.role {
            Role::Agent => PromptRole::Assistant,
            Role::User => PromptRole::User,
        },
        content: turn.content.clone(),
    }));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_comes_first_and_roles_map() {
        let history = vec![
            Turn::new(Role::Agent, "How was your day?"),
            Turn::new(Role::User, "Long."),
        ];
        let messages = build_prompt("be nice", &history, 10);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, PromptRole::System);
        assert_eq!(messages[0].content, "be nice");
        assert_eq!(messages[1].role, PromptRole::Assistant);
        assert_eq!(messages[1].content, "How was your day?");
        assert_eq!(messages[2].role, PromptRole::User);
        assert_eq!(messages[2].content, "Long.");
    }

    #[test]
    fn test_empty_history_yields_directive_only() {
        let messages = build_prompt(DEFAULT_SYSTEM_DIRECTIVE, &[], 10);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("## Objective"));
    }

    #[test]
    fn test_oldest_turns_are_dropped_first() {
        let history: Vec<Turn> = (0..5)
            .map(|i| Turn::new(Role::User, format!("turn {i}")))
            .collect();
        let messages = build_prompt("d", &history, 2);

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["d", "turn 3", "turn 4"]);
    }
}

//! Prompt construction for the automated party
//!
//! Two prompts exist: the per-turn prompt, which asks for the next message as
//! a JSON object, and the evaluation prompt, which asks for a short free-text
//! assessment once the conversation is over.

use crate::state_machine::Conversation;
use serde::Deserialize;
use thiserror::Error;

/// System message sent with every turn request
pub const SYSTEM_PROMPT: &str =
    "You are a chatbot designed to help the user practice reflective listening skills.";

/// Fixed instruction text for turn generation
pub const INSTRUCTIONS: &str = r#"Given the conversational context, react to the user messages as a human would, i.e. incrementally open up if the user applies reflective listening, otherwise respond neutrally or even defensively if appropriate.
In reflective listening, the listener basically just repeats or mirrors what the speaker has said. The listener might also validate the speaker's experience or feelings.
The listener should avoid giving their opinion, problem solving and sympathizing

The output should be a valid json which can be parsed:
<output format>:
{"agent_response": "your response"}"#;

/// Framing for the end-of-conversation evaluation
const EVALUATION_PREAMBLE: &str = "Please write a very short and specific evaluation. The <user> is a human training their reflective listening skills against a chatbot. The chatbot is programmed to open up if the user utilized reflective listening and react neutrally or even hostilely otherwise:";

/// Token cap for the evaluation; it is meant to be a few sentences
pub const EVALUATION_MAX_TOKENS: u32 = 150;

/// Build the prompt for the automated party's next message
pub fn build_reply_prompt(conv: &Conversation) -> String {
    format!(
        "\nInstructions:\n{INSTRUCTIONS}\n\nNumber of message left for agent:\n{remaining}\n\nContext: \n{context}\n\nConversation so far:\n<start>\n{conversation}",
        remaining = conv.remaining_automated_turns(),
        context = conv.true_context(),
        conversation = conv.render_transcript(),
    )
}

/// Build the evaluation prompt over the full transcript
pub fn build_evaluation_prompt(conv: &Conversation) -> String {
    format!(
        "{EVALUATION_PREAMBLE} Context: {} Conversation: {}",
        conv.true_context(),
        conv.render_transcript()
    )
}

/// Backend output that does not match the expected reply shape
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Response has no agent_response field")]
    MissingField,
    #[error("agent_response is empty")]
    EmptyReply,
}

#[derive(Debug, Deserialize)]
struct AgentReply {
    agent_response: Option<String>,
}

/// Extract `agent_response` from the backend's structured output.
///
/// Models occasionally wrap the object in a markdown code fence; that wrapper
/// is stripped before parsing.
pub fn parse_agent_response(raw: &str) -> Result<String, ParseError> {
    let body = strip_code_fence(raw.trim());
    let reply: AgentReply =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let text = reply.agent_response.ok_or(ParseError::MissingField)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::EmptyReply);
    }
    Ok(text.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

//! Ollama reasoning client
//!
//! Asks a local Ollama chat endpoint to recommend a disposition for the
//! call. The system prompt pins the model to the three canonical actions
//! and the JSON shape the decision parser prefers; whatever comes back is
//! still treated as untrusted text by the parser.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use callscreen_core::error::{Result, ScreenError};
use callscreen_core::ports::ReasoningPort;
use callscreen_core::types::ReasoningContext;

const SYSTEM_PROMPT: &str = "You are an AI call routing assistant. Analyze incoming calls and \
decide the best action: 'forward' to route the call, 'voicemail' to record a message, or \
'ask_question' to gather more information. Respond with JSON format: \
{\"action\": \"forward|voicemail|ask_question\", \"reason\": \"explanation\", \"parameters\": {}}.";

/// Client for an Ollama `/api/chat` endpoint
pub struct OllamaReasoningClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaReasoningClient {
    /// Create a client for the given Ollama host and model
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScreenError::reasoning(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Render the user prompt for one orchestration cycle
    fn build_prompt(context: &ReasoningContext) -> String {
        let mut prompt = format!("Incoming call transcription: '{}'", context.transcript);
        prompt.push_str(&format!(
            "\n\nContext: caller {} dialed {}, clarification attempts so far: {}",
            context.caller_number, context.called_number, context.attempt_count
        ));
        if let Some(notes) = &context.notes {
            prompt.push_str(&format!("\nNotes: {}", notes));
        }
        prompt.push_str("\n\nWhat action should be taken with this call?");
        prompt
    }
}

#[async_trait]
impl ReasoningPort for OllamaReasoningClient {
    async fn recommend(&self, context: &ReasoningContext) -> Result<String> {
        let prompt = Self::build_prompt(context);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            stream: false,
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScreenError::reasoning(format!("request to {} failed: {}", url, e)))?
            .error_for_status()
            .map_err(|e| ScreenError::reasoning(format!("model endpoint error: {}", e)))?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScreenError::reasoning(format!("malformed model response: {}", e)))?;

        debug!("Ollama recommendation: {}", chat.message.content);
        Ok(chat.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ReasoningContext {
        ReasoningContext {
            caller_number: "+15550100".to_string(),
            called_number: "+15550200".to_string(),
            transcript: "I need to speak with sales".to_string(),
            attempt_count: 1,
            notes: Some("office hours 9-17".to_string()),
        }
    }

    #[test]
    fn test_prompt_includes_transcript_and_context() {
        let prompt = OllamaReasoningClient::build_prompt(&context());
        assert!(prompt.contains("'I need to speak with sales'"));
        assert!(prompt.contains("+15550100"));
        assert!(prompt.contains("attempts so far: 1"));
        assert!(prompt.contains("office hours 9-17"));
        assert!(prompt.ends_with("What action should be taken with this call?"));
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "llama3",
            messages: vec![ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            }],
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = OllamaReasoningClient::new(
            "http://localhost:11434/",
            "llama3",
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}

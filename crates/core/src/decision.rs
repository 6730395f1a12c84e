//! Decision parser
//!
//! Converts the reasoning service's raw output into a validated
//! [`Decision`]. The parser never fails: structured JSON is preferred,
//! free-form text falls back to keyword matching, and anything
//! unrecognizable becomes a clarifying question. That no-throw guarantee
//! is what lets the orchestrator treat reasoning flakiness as a degraded
//! path instead of a failure path.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ActionConfig;
use crate::types::Decision;

/// Parser for raw reasoning output
#[derive(Debug, Clone)]
pub struct DecisionParser {
    actions: ActionConfig,
}

impl DecisionParser {
    /// Create a parser over the configured action directory
    pub fn new(actions: ActionConfig) -> Self {
        Self { actions }
    }

    /// Parse raw reasoning output into a validated decision.
    ///
    /// Forward decisions are only produced for destinations that resolve
    /// against the configured directory; anything else is downgraded to a
    /// clarifying question rather than silently executed.
    pub fn parse(&self, raw: &str) -> Decision {
        if let Some(decision) = self.parse_structured(raw) {
            debug!("Parsed structured decision: {:?}", decision.action);
            return decision;
        }
        self.parse_keywords(raw)
    }

    /// Deterministic decision used when the reasoning service times out or
    /// errors: gather more information from the caller.
    pub fn fallback(&self) -> Decision {
        Decision::ask_question(self.actions.reasoning_unavailable_question.clone())
            .with_reasoning("reasoning service unavailable, gathering more information")
    }

    /// Try to interpret the output as the structured JSON shape
    /// `{"action": ..., "reason": ..., "parameters": {...}}`, tolerating
    /// surrounding prose or code fences.
    fn parse_structured(&self, raw: &str) -> Option<Decision> {
        let candidate = extract_json_object(raw)?;
        let value: Value = serde_json::from_str(candidate).ok()?;
        let action = value.get("action")?.as_str()?.trim().to_lowercase();

        let parameters = value.get("parameters").cloned().unwrap_or(Value::Null);
        let reasoning = string_field(&value, &["reason", "reasoning"]);
        let confidence = value.get("confidence").and_then(Value::as_f64);

        let mut decision = match action.as_str() {
            "forward" | "transfer" => {
                let token = string_field(&parameters, &["destination", "extension"])
                    .or_else(|| string_field(&value, &["destination", "extension"]));
                match token
                    .as_deref()
                    .and_then(|t| self.actions.resolve_destination(t))
                {
                    Some(extension) => Decision::forward(extension),
                    None => {
                        warn!(
                            "Forward decision with unknown destination {:?}; downgrading to ask_question",
                            token
                        );
                        Decision::ask_question(self.actions.default_question.clone())
                    }
                }
            }
            "voicemail" => Decision::voicemail(),
            "ask_question" | "question" | "ask" => {
                let prompt = string_field(&parameters, &["question", "prompt", "prompt_text"])
                    .or_else(|| string_field(&value, &["question", "prompt", "prompt_text"]))
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| self.actions.default_question.clone());
                Decision::ask_question(prompt)
            }
            other => {
                warn!("Unknown action '{}' in reasoning output; asking for clarification", other);
                Decision::ask_question(self.actions.default_question.clone())
            }
        };

        if let Some(reasoning) = reasoning {
            decision = decision.with_reasoning(reasoning);
        }
        if let Some(confidence) = confidence {
            decision = decision.with_confidence(confidence);
        }
        Some(decision)
    }

    /// Keyword fallback for free-form text
    fn parse_keywords(&self, raw: &str) -> Decision {
        let lowered = raw.to_lowercase();

        if lowered.contains("forward") || lowered.contains("transfer") {
            if let Some(extension) = self.find_destination_mention(&lowered) {
                return Decision::forward(extension)
                    .with_reasoning("call should be forwarded based on content");
            }
            warn!("Forward keyword without a recognizable destination; asking for clarification");
            return Decision::ask_question(self.actions.default_question.clone());
        }

        if lowered.contains("voicemail") || lowered.contains("record") || lowered.contains("message")
        {
            return Decision::voicemail().with_reasoning("caller should leave a voicemail");
        }

        Decision::ask_question(self.actions.default_question.clone())
            .with_reasoning("need more information from caller")
    }

    /// Scan free-form text for a configured destination name or extension.
    /// Longer names win so "sales support" is not shadowed by "sales".
    fn find_destination_mention(&self, lowered: &str) -> Option<String> {
        let mut best: Option<(usize, String)> = None;
        for (name, extension) in &self.actions.destinations {
            let name = name.to_lowercase();
            if lowered.contains(&name) && best.as_ref().map_or(true, |(len, _)| name.len() > *len)
            {
                best = Some((name.len(), extension.clone()));
            }
        }
        if let Some((_, extension)) = best {
            return Some(extension);
        }

        self.actions
            .destinations
            .values()
            .find(|extension| lowered.contains(extension.as_str()))
            .cloned()
    }
}

/// Slice out the outermost JSON object from text that may wrap it in prose
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(key))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionKind;

    fn parser() -> DecisionParser {
        let mut actions = ActionConfig::default();
        actions.destinations.insert("sales".to_string(), "100".to_string());
        actions.destinations.insert("billing".to_string(), "200".to_string());
        DecisionParser::new(actions)
    }

    #[test]
    fn test_structured_forward_resolves_destination() {
        let decision = parser().parse(
            r#"{"action": "forward", "reason": "caller wants sales", "parameters": {"destination": "sales"}}"#,
        );
        assert_eq!(decision.action, ActionKind::Forward);
        assert_eq!(decision.destination.as_deref(), Some("100"));
        assert_eq!(decision.reasoning.as_deref(), Some("caller wants sales"));
    }

    #[test]
    fn test_structured_forward_with_unknown_destination_downgrades() {
        let decision = parser()
            .parse(r#"{"action": "forward", "parameters": {"destination": "warehouse"}}"#);
        assert_eq!(decision.action, ActionKind::AskQuestion);
        assert!(decision.destination.is_none());
    }

    #[test]
    fn test_structured_forward_without_destination_downgrades() {
        let decision = parser().parse(r#"{"action": "forward"}"#);
        assert_eq!(decision.action, ActionKind::AskQuestion);
    }

    #[test]
    fn test_structured_question_uses_supplied_prompt() {
        let decision = parser().parse(
            r#"{"action": "ask_question", "parameters": {"question": "Which department do you need?"}}"#,
        );
        assert_eq!(decision.action, ActionKind::AskQuestion);
        assert_eq!(
            decision.prompt_text.as_deref(),
            Some("Which department do you need?")
        );
    }

    #[test]
    fn test_json_embedded_in_prose_is_found() {
        let decision = parser().parse(
            "Sure, here is my decision:\n```json\n{\"action\": \"voicemail\", \"confidence\": 0.9}\n```",
        );
        assert_eq!(decision.action, ActionKind::Voicemail);
        assert_eq!(decision.confidence, Some(0.9));
    }

    #[test]
    fn test_keyword_forward() {
        let decision = parser().parse("forward to sales");
        assert_eq!(decision.action, ActionKind::Forward);
        assert_eq!(decision.destination.as_deref(), Some("100"));
    }

    #[test]
    fn test_keyword_forward_without_destination_downgrades() {
        let decision = parser().parse("this should be transferred somewhere");
        assert_eq!(decision.action, ActionKind::AskQuestion);
    }

    #[test]
    fn test_keyword_voicemail() {
        let decision = parser().parse("leave a voicemail");
        assert_eq!(decision.action, ActionKind::Voicemail);
    }

    #[test]
    fn test_keyword_ask_question() {
        let decision = parser().parse("ask them more");
        assert_eq!(decision.action, ActionKind::AskQuestion);
        assert_eq!(
            decision.prompt_text.as_deref(),
            Some(ActionConfig::default().default_question.as_str())
        );
    }

    #[test]
    fn test_unknown_json_action_downgrades() {
        let decision = parser().parse(r#"{"action": "escalate"}"#);
        assert_eq!(decision.action, ActionKind::AskQuestion);
    }

    #[test]
    fn test_parse_never_panics_and_always_yields_a_canonical_action() {
        let inputs = [
            "",
            "   ",
            "{",
            "}{",
            "null",
            "{\"action\": 42}",
            "{\"action\": \"forward\", \"parameters\": {\"destination\": 7}}",
            "☎️☎️☎️",
            "lorem ipsum dolor sit amet",
        ];
        for input in inputs {
            let decision = parser().parse(input);
            assert!(matches!(
                decision.action,
                ActionKind::Forward | ActionKind::Voicemail | ActionKind::AskQuestion
            ));
            if decision.action == ActionKind::AskQuestion {
                assert!(decision.prompt_text.is_some());
            }
        }
    }

    #[test]
    fn test_fallback_uses_reasoning_unavailable_prompt() {
        let decision = parser().fallback();
        assert_eq!(decision.action, ActionKind::AskQuestion);
        assert_eq!(
            decision.prompt_text.as_deref(),
            Some(ActionConfig::default().reasoning_unavailable_question.as_str())
        );
    }

    #[test]
    fn test_confidence_out_of_range_is_clamped() {
        let decision = parser().parse(r#"{"action": "voicemail", "confidence": 3.5}"#);
        assert_eq!(decision.confidence, Some(1.0));
    }
}

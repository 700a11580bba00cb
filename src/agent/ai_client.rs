//! Reasoning client over the OpenAI chat-completions API.
//!
//! The agent uses free-text reasoning calls for decision support only.
//! Replies are decoded through [`decode_json_block`], which tolerates
//! surrounding prose but insists on a schema-valid JSON object; callers
//! treat decode failure as a typed error and fall back deterministically.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::agent::types::AgentError;

pub struct AIClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AIClient {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, api_key, model, max_tokens: 2000, temperature: 0.3 }
    }

    /// One chat-completion round trip. `json_mode` asks the API for a JSON
    /// object response; context gathering uses plain text.
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
    ) -> Result<String, AgentError> {
        let mut payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        if json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || is_quota_message(&error_text) {
                return Err(AgentError::RateLimited(format!("{}: {}", status, error_text)));
            }
            return Err(AgentError::AiAnalysis(format!("API error {}: {}", status, error_text)));
        }

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::AiAnalysis("no content in completion".to_string()))?;

        debug!("Reasoning call returned {} chars", content.len());
        Ok(content.to_string())
    }
}

fn is_quota_message(text: &str) -> bool {
    text.contains("quota")
        || text.contains("insufficient_quota")
        || text.contains("RESOURCE_EXHAUSTED")
}

/// Extract the first well-formed `{...}` block from free text. String
/// literals and escapes are respected so braces inside them don't
/// unbalance the scan.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strict schema-validated decode of the first JSON block in a reply.
pub fn decode_json_block<T: DeserializeOwned>(text: &str) -> Result<T, AgentError> {
    let block = extract_json_block(text)
        .ok_or_else(|| AgentError::AiAnalysis("no JSON object in reply".to_string()))?;
    Ok(serde_json::from_str(block)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn extracts_block_surrounded_by_prose() {
        let text = r#"Sure! Here is my decision: {"name": "a", "count": 2} hope that helps."#;
        assert_eq!(extract_json_block(text), Some(r#"{"name": "a", "count": 2}"#));
    }

    #[test]
    fn handles_nested_objects_and_braces_in_strings() {
        let text = r#"prefix {"name": "has } brace", "count": 1, "inner": {"x": 1}} suffix"#;
        let block = extract_json_block(text).unwrap();
        let value: serde_json::Value = serde_json::from_str(block).unwrap();
        assert_eq!(value["inner"]["x"], 1);
    }

    #[test]
    fn returns_none_without_an_object() {
        assert!(extract_json_block("no structured data here").is_none());
        assert!(extract_json_block("unterminated { object").is_none());
    }

    #[test]
    fn decode_enforces_the_schema() {
        let ok: Sample = decode_json_block(r#"x {"name": "a", "count": 2} y"#).unwrap();
        assert_eq!(ok, Sample { name: "a".to_string(), count: 2 });

        let err = decode_json_block::<Sample>(r#"{"name": "a"}"#);
        assert!(err.is_err());
    }
}

//! LLM Connector - local Ollama model
//!
//! Used for the chat fallback and for "сгенерируй текст" commands. The HTTP
//! transport is only compiled with the `net` feature; without it every call
//! reports the model as unavailable.

use super::{LlmChat, ToolError};
use crate::config::LlmConfig;
use serde::Serialize;
use serde_json::Value;

/// Body of `POST /api/generate`
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub system: &'a str,
    pub stream: bool,
}

pub struct OllamaChat {
    config: LlmConfig,
}

impl OllamaChat {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, prompt: &'a str, model: &'a str) -> GenerateRequest<'a> {
        let model = if model.trim().is_empty() {
            self.config.default_model.as_str()
        } else {
            model
        };

        GenerateRequest {
            model,
            prompt,
            system: &self.config.system_prompt,
            stream: false,
        }
    }

    #[cfg(feature = "net")]
    fn post(&self, body: &GenerateRequest<'_>) -> Result<Value, ToolError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ToolError::Model(e.to_string()))?;

        client
            .post(self.endpoint())
            .json(body)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<Value>())
            .map_err(|e| ToolError::Model(format!("{} ({})", e, body.model)))
    }

    #[cfg(not(feature = "net"))]
    fn post(&self, body: &GenerateRequest<'_>) -> Result<Value, ToolError> {
        log::warn!("llm: built without the net feature, {} unreachable", self.endpoint());
        Err(ToolError::Model(format!(
            "{}: сборка без функции net",
            body.model
        )))
    }
}

impl LlmChat for OllamaChat {
    fn generate(&self, prompt: &str, model: &str) -> Result<String, ToolError> {
        let body = self.request(prompt, model);
        log::debug!("llm: generate with {}", body.model);

        let reply = self.post(&body)?;
        let text = extract_text(&reply);
        if text.is_empty() {
            return Err(ToolError::Model("модель не вернула текст".to_string()));
        }
        Ok(text)
    }
}

/// `response` from /api/generate or `message.content` from /api/chat
pub fn extract_text(reply: &Value) -> String {
    reply
        .get("response")
        .and_then(Value::as_str)
        .or_else(|| reply.pointer("/message/content").and_then(Value::as_str))
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text() {
        assert_eq!(extract_text(&json!({"response": " Привет! "})), "Привет!");
        assert_eq!(
            extract_text(&json!({"message": {"role": "assistant", "content": "Ок"}})),
            "Ок"
        );
        assert_eq!(extract_text(&json!({"done": true})), "");
    }

    #[test]
    fn test_request_falls_back_to_default_model() {
        let chat = OllamaChat::new(LlmConfig::default());
        let body = chat.request("привет", "");

        assert_eq!(body.model, "llama3.1:8b");
        assert!(!body.stream);
        assert_eq!(chat.endpoint(), "http://127.0.0.1:11434/api/generate");

        let json = serde_json::to_value(chat.request("привет", "qwen2:7b")).unwrap();
        assert_eq!(json["model"], "qwen2:7b");
        assert_eq!(json["stream"], false);
    }
}

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends one chat completion and returns the first choice's message content.
///
/// There is no retry here. Callers bound the call with their own timeout and fall back locally.
pub async fn complete(
	cfg: &bazaar_config::ReasoningProviderConfig,
	system: &str,
	prompt: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": prompt },
		],
	});

	if let (Some(max_tokens), Some(obj)) = (cfg.max_tokens, body.as_object_mut()) {
		obj.insert("max_tokens".to_string(), Value::from(max_tokens));
	}

	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

fn parse_completion_content(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})?;

	if content.trim().is_empty() {
		return Err(Error::InvalidResponse {
			message: "Completion response content is empty.".to_string(),
		});
	}

	Ok(content.to_string())
}

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub qualifier: Qualifier,
	#[serde(default)]
	pub repair: Repair,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub reasoning: ReasoningProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReasoningProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	/// Optional completion cap forwarded as `max_tokens`.
	pub max_tokens: Option<u32>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Candidate count used when the caller does not pass `k`.
	pub default_k: u32,
	/// Upper bound for a caller supplied `k`.
	pub max_k: u32,
	/// Never more than three.
	pub max_recommendations: u32,
	pub max_justification_chars: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_k: 10, max_k: 50, max_recommendations: 3, max_justification_chars: 400 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Qualifier {
	pub min_preferences: u32,
	pub max_preferences: u32,
}
impl Default for Qualifier {
	fn default() -> Self {
		Self { min_preferences: 2, max_preferences: 8 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Repair {
	pub enabled: bool,
	pub interval_seconds: u64,
}
impl Default for Repair {
	fn default() -> Self {
		Self { enabled: true, interval_seconds: 900 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true, api_auth_token: None, admin_auth_token: None }
	}
}

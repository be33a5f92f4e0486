pub mod embedding;
pub mod reasoning;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use bazaar_config::{EmbeddingProviderConfig, ReasoningProviderConfig};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns text into fixed-length vectors.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Stateless text completion: a system instruction and a user prompt in, text out.
pub trait ReasoningProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a ReasoningProviderConfig,
		system: &'a str,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub reasoning: Arc<dyn ReasoningProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		reasoning: Arc<dyn ReasoningProvider>,
	) -> Self {
		Self { embedding, reasoning }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(HttpProviders);

		Self { embedding: provider.clone(), reasoning: provider }
	}
}

/// OpenAI-compatible HTTP providers.
struct HttpProviders;
impl EmbeddingProvider for HttpProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ReasoningProvider for HttpProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a ReasoningProviderConfig,
		system: &'a str,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(reasoning::complete(cfg, system, prompt))
	}
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

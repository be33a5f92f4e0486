//! Deterministic provider doubles.

use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use bazaar_config::{EmbeddingProviderConfig, ReasoningProviderConfig};
use bazaar_providers::{BoxFuture, EmbeddingProvider, Error, ReasoningProvider, Result};

/// Hashed bag-of-words embedding. Texts sharing words land close together.
pub struct HashEmbedding {
	delay: Option<Duration>,
	calls: AtomicUsize,
}
impl HashEmbedding {
	pub fn new() -> Self {
		Self { delay: None, calls: AtomicUsize::new(0) }
	}

	/// Sleeps before every answer.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl Default for HashEmbedding {
	fn default() -> Self {
		Self::new()
	}
}
impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			Ok(texts.iter().map(|text| hash_embedding(text, cfg.dimensions as usize)).collect())
		})
	}
}

/// Always fails, as an unreachable embedding service would.
pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		_: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			Err(Error::InvalidResponse { message: "Embedding service unavailable.".to_string() })
		})
	}
}

type Responder = dyn Fn(&str, &str) -> Result<String> + Send + Sync;

/// Reasoning double backed by a closure over `(system, prompt)`.
pub struct FnReasoner {
	respond: Box<Responder>,
	delay: Option<Duration>,
	calls: AtomicUsize,
}
impl FnReasoner {
	pub fn new<F>(respond: F) -> Self
	where
		F: Fn(&str, &str) -> Result<String> + Send + Sync + 'static,
	{
		Self { respond: Box::new(respond), delay: None, calls: AtomicUsize::new(0) }
	}

	/// A reasoner that always fails.
	pub fn failing() -> Self {
		Self::new(|_, _| {
			Err(Error::InvalidResponse { message: "Reasoning service unavailable.".to_string() })
		})
	}

	/// Sleeps before every answer.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ReasoningProvider for FnReasoner {
	fn complete<'a>(
		&'a self,
		_: &'a ReasoningProviderConfig,
		system: &'a str,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			(self.respond)(system, prompt)
		})
	}
}

/// Unit-length vector of `dim` components built from the lowercase words of `text`.
pub fn hash_embedding(text: &str, dim: usize) -> Vec<f32> {
	let mut vec = vec![0.0_f32; dim];

	if dim == 0 {
		return vec;
	}

	for word in text
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|word| !word.is_empty())
		.map(str::to_lowercase)
	{
		let hash = blake3::hash(word.as_bytes());
		let bytes = hash.as_bytes();
		let mut slot = [0_u8; 8];

		slot.copy_from_slice(&bytes[..8]);

		let index = (u64::from_le_bytes(slot) % dim as u64) as usize;
		let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

		vec[index] += sign;
	}

	let norm = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > f32::EPSILON {
		for value in &mut vec {
			*value /= norm;
		}
	}

	vec
}

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Postgres, Providers, Qdrant, Qualifier,
	ReasoningProviderConfig, Repair, Search, Security, Service, Storage,
};

use std::{fs, path::Path};

/// The pipeline never returns more recommendations than this.
pub const MAX_RECOMMENDATIONS: u32 = 3;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.reasoning.timeout_ms", cfg.providers.reasoning.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}
	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("reasoning", &cfg.providers.reasoning.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !cfg.providers.reasoning.temperature.is_finite()
		|| cfg.providers.reasoning.temperature < 0.0
	{
		return Err(Error::Validation {
			message: "providers.reasoning.temperature must be a finite number of zero or greater."
				.to_string(),
		});
	}
	if cfg.search.max_k == 0 {
		return Err(Error::Validation {
			message: "search.max_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_k == 0 || cfg.search.default_k > cfg.search.max_k {
		return Err(Error::Validation {
			message: "search.default_k must be in the range 1-search.max_k.".to_string(),
		});
	}
	if !(1..=MAX_RECOMMENDATIONS).contains(&cfg.search.max_recommendations) {
		return Err(Error::Validation {
			message: "search.max_recommendations must be in the range 1-3.".to_string(),
		});
	}
	if cfg.search.max_justification_chars == 0 {
		return Err(Error::Validation {
			message: "search.max_justification_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.qualifier.min_preferences < 2 {
		return Err(Error::Validation {
			message: "qualifier.min_preferences must be at least 2.".to_string(),
		});
	}
	if cfg.qualifier.max_preferences < cfg.qualifier.min_preferences {
		return Err(Error::Validation {
			message: "qualifier.max_preferences must not be less than qualifier.min_preferences."
				.to_string(),
		});
	}
	if cfg.repair.enabled && cfg.repair.interval_seconds == 0 {
		return Err(Error::Validation {
			message: "repair.interval_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}
	if cfg.providers.reasoning.max_tokens == Some(0) {
		cfg.providers.reasoning.max_tokens = None;
	}
}

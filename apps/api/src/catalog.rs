//! Model Catalog Client — fetches the provider's model list and owns the
//! process-wide catalog cache.
//!
//! The cache holds the most recent successful fetch and is replaced whole, so
//! concurrent readers never observe a partial catalog. Free-tier
//! classification lives here and only here; default-model selection and the
//! listing endpoint both consume it.

use std::sync::{Arc, PoisonError, RwLock};

use axum::{extract::State, Json};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::state::AppState;

const CATALOG_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {status}")]
    Status { status: u16 },
}

/// Per-dimension price strings as the provider reports them. Fields the
/// provider omits stay absent; absence is meaningful to the free-tier check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelPricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cache_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cache_write: Option<String>,
}

/// One selectable backend model as reported by the provider catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub pricing: ModelPricing,
    /// Computed by `is_free_model` after each fetch, never taken from the wire.
    #[serde(default)]
    pub is_free: bool,
}

#[derive(Debug, Deserialize)]
struct ModelListing {
    #[serde(default)]
    data: Vec<ModelDescriptor>,
}

/// Best-effort free-tier classification: a free marker in the id or name,
/// every price field absent or zero, or a description that says so.
pub fn is_free_model(model: &ModelDescriptor) -> bool {
    let id = model.id.to_lowercase();
    if id.ends_with(":free") || id.contains("(free)") {
        return true;
    }
    if let Some(name) = &model.name {
        let name = name.to_lowercase();
        if name.ends_with(":free") || name.contains("(free)") {
            return true;
        }
    }
    if pricing_is_zero(&model.pricing) {
        return true;
    }
    model
        .description
        .as_deref()
        .map(|d| {
            let d = d.to_lowercase();
            d.contains("free of charge") || d.contains("available for free")
        })
        .unwrap_or(false)
}

fn pricing_is_zero(pricing: &ModelPricing) -> bool {
    [
        &pricing.prompt,
        &pricing.completion,
        &pricing.request,
        &pricing.image,
        &pricing.web_search,
        &pricing.internal_reasoning,
        &pricing.input_cache_read,
        &pricing.input_cache_write,
    ]
    .into_iter()
    .all(|field| matches!(field.as_deref(), None | Some("0") | Some("0.0")))
}

fn first_free(models: &[ModelDescriptor]) -> Option<&ModelDescriptor> {
    models.iter().find(|m| m.is_free)
}

/// Client for the provider's model catalog. Cheap to clone; clones share the
/// underlying connection pool and the catalog cache.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    api_key: String,
    cache: Arc<RwLock<Option<Arc<Vec<ModelDescriptor>>>>>,
}

impl CatalogClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(CATALOG_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetches the model list from the provider, classifies free-tier models,
    /// and replaces the cache with the fresh catalog.
    pub async fn list_models(&self) -> Result<Arc<Vec<ModelDescriptor>>, CatalogError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model catalog returned {status}: {body}");
            return Err(CatalogError::Status {
                status: status.as_u16(),
            });
        }

        let listing: ModelListing = response.json().await?;

        let mut models = listing.data;
        for model in &mut models {
            model.is_free = is_free_model(model);
        }
        info!(
            "Model catalog refreshed: {} models, {} free",
            models.len(),
            models.iter().filter(|m| m.is_free).count()
        );

        let models = Arc::new(models);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some(models.clone());

        Ok(models)
    }

    /// Picks the default model for requests that name none: the first
    /// free-tier entry of the cached catalog, refreshing once when the cache
    /// is cold. Returns `None` when the catalog is unreachable or lists no
    /// free model; callers degrade to the configured default instead of
    /// failing the analysis.
    pub async fn default_model(&self) -> Option<String> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let models = match cached {
            Some(models) => models,
            None => match self.list_models().await {
                Ok(models) => models,
                Err(e) => {
                    warn!("Model catalog unavailable for default selection: {e}");
                    return None;
                }
            },
        };

        let picked = first_free(&models).map(|m| m.id.clone());
        if let Some(id) = &picked {
            debug!("Default model resolved from catalog: {id}");
        }
        picked
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handler
// ────────────────────────────────────────────────────────────────────────────

/// GET /models
///
/// Returns the provider's current catalog with free-tier flags computed.
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelDescriptor>>, AppError> {
    let models = state.catalog.list_models().await?;
    Ok(Json(models.as_ref().clone()))
}

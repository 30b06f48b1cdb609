//! Template catalog adapter.
//!
//! A [`TemplateSource`] fetches the raw template list; [`TemplateCatalog`]
//! wraps it with sanitizing, transient-failure retries and an optional
//! process-lifetime cache.

use crate::config::Config;
use crate::error::WorkflowError;
use crate::llm::schema::string_or_number;
use crate::retry::{self, RetryPolicy};
use crate::types::Template;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Anything that can list meme templates.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch the current template list.
    async fn fetch_templates(&self) -> Result<Vec<Template>, WorkflowError>;
}

/// Imgflip `get_memes` client.
pub struct ImgflipCatalog {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ImgflipCatalog {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Map a failed send onto a workflow error; timeouts and connection
    /// failures stay retryable.
    fn request_error(&self, e: &reqwest::Error) -> WorkflowError {
        if e.is_timeout() {
            WorkflowError::Timeout {
                operation: "template catalog fetch".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            // `is_retryable` keys on "connect" for status-less provider errors
            WorkflowError::Provider {
                message: format!("Template catalog connection failed: {e}"),
                status_code: None,
            }
        } else {
            WorkflowError::Provider {
                message: format!("Template catalog request failed: {e}"),
                status_code: None,
            }
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct GetMemesResponse {
    success: bool,
    data: Option<GetMemesData>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GetMemesData {
    memes: Vec<RawTemplate>,
}

#[derive(Deserialize)]
struct RawTemplate {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    box_count: i64,
}

/// Decode an Imgflip `get_memes` body into templates (unsanitized).
pub fn parse_get_memes(body: &str) -> Result<Vec<Template>, WorkflowError> {
    let resp: GetMemesResponse =
        serde_json::from_str(body).map_err(|e| WorkflowError::Provider {
            message: format!("Malformed template list: {e}"),
            status_code: None,
        })?;

    if !resp.success {
        return Err(WorkflowError::Provider {
            message: format!(
                "Template provider refused request: {}",
                resp.error_message.unwrap_or_else(|| "unknown error".to_string())
            ),
            status_code: None,
        });
    }

    let memes = resp.data.map(|d| d.memes).unwrap_or_default();
    Ok(memes
        .into_iter()
        .map(|raw| Template {
            id: raw.id,
            name: raw.name.trim().to_string(),
            box_count: usize::try_from(raw.box_count).unwrap_or(0),
            example_url: raw.url,
        })
        .collect())
}

#[async_trait]
impl TemplateSource for ImgflipCatalog {
    fn name(&self) -> &str {
        "imgflip"
    }

    async fn fetch_templates(&self) -> Result<Vec<Template>, WorkflowError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| WorkflowError::Provider {
            message: format!("Failed to read template list: {e}"),
            status_code: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            return Err(WorkflowError::Provider {
                message: format!("Template catalog HTTP {status}: {body}"),
                status_code: Some(status.as_u16()),
            });
        }

        parse_get_memes(&body)
    }
}

/// Drop unusable entries and duplicate ids; fail if nothing is left.
pub fn sanitize(templates: Vec<Template>) -> Result<Vec<Template>, WorkflowError> {
    let total = templates.len();
    let mut seen = HashSet::new();
    let usable: Vec<Template> = templates
        .into_iter()
        .filter(|t| !t.id.is_empty() && !t.name.is_empty() && t.box_count >= 1)
        .filter(|t| seen.insert(t.id.clone()))
        .collect();

    if usable.len() < total {
        tracing::warn!(
            "Dropped {} malformed or duplicate templates from catalog",
            total - usable.len()
        );
    }

    if usable.is_empty() {
        return Err(WorkflowError::Provider {
            message: "Template catalog is empty or malformed".to_string(),
            status_code: None,
        });
    }
    Ok(usable)
}

/// Resolve a template by exact id, then by case-insensitive name.
pub fn find_template<'a>(templates: &'a [Template], id_or_name: &str) -> Option<&'a Template> {
    let needle = id_or_name.trim();
    if needle.is_empty() {
        return None;
    }
    templates.iter().find(|t| t.id == needle).or_else(|| {
        let lowered = needle.to_lowercase();
        templates.iter().find(|t| t.name.to_lowercase() == lowered)
    })
}

/// Cached, retrying view of a [`TemplateSource`].
pub struct TemplateCatalog {
    source: Box<dyn TemplateSource>,
    cache_enabled: bool,
    cache: OnceCell<Vec<Template>>,
    retry: RetryPolicy,
}

impl TemplateCatalog {
    pub fn new(source: Box<dyn TemplateSource>) -> Self {
        Self {
            source,
            cache_enabled: true,
            cache: OnceCell::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Imgflip-backed catalog configured from `[catalog]` and `[limits]`.
    pub fn from_config(config: &Config) -> Self {
        let source = ImgflipCatalog::new(
            &config.catalog.endpoint,
            Duration::from_millis(config.limits.catalog_timeout_ms),
        );
        Self::new(Box::new(source))
            .with_cache(config.catalog.cache)
            .with_retry(RetryPolicy::new(
                config.workflow.max_retries_per_stage,
                config.workflow.retry_delay_ms,
            ))
    }

    /// List the available templates.
    ///
    /// With caching enabled only the first successful fetch hits the network;
    /// failed fetches are not cached.
    pub async fn list_templates(&self) -> Result<Vec<Template>, WorkflowError> {
        if !self.cache_enabled {
            return self.fetch_with_retry().await;
        }
        let cached = self
            .cache
            .get_or_try_init(|| self.fetch_with_retry())
            .await?;
        Ok(cached.clone())
    }

    async fn fetch_with_retry(&self) -> Result<Vec<Template>, WorkflowError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.source.fetch_templates().await.and_then(sanitize) {
                Ok(templates) => {
                    tracing::debug!(
                        "Fetched {} templates from {}",
                        templates.len(),
                        self.source.name()
                    );
                    return Ok(templates);
                }
                Err(e) if retry::is_retryable(&e) && attempt < self.retry.max_attempts() => {
                    let delay = self.retry.delay_before(attempt);
                    tracing::warn!(
                        "Template fetch failed ({e}); retry {attempt}/{} in {delay:?}",
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

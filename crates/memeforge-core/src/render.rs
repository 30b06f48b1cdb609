//! Caption renderer adapter.
//!
//! Turns `(template_id, box_texts)` into a hosted image URL. Failures are
//! classified into [`RenderError`] variants so the workflow can tell a
//! retryable hiccup from a credential or request problem.

use crate::config::RendererConfig;
use crate::error::{ConfigError, RenderError, WorkflowError};
use crate::llm::resolve_env_var;
use crate::types::Template;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Anything that can composite captions onto a template.
#[async_trait]
pub trait CaptionRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Render `box_texts` onto `template_id` and return the image reference.
    async fn render(&self, template_id: &str, box_texts: &[String]) -> Result<String, RenderError>;
}

/// Reject a render request whose text count does not match the template.
///
/// This is checked locally so a mismatch is never sent upstream.
pub fn check_box_count(template: &Template, box_texts: &[String]) -> Result<(), WorkflowError> {
    if box_texts.len() != template.box_count {
        return Err(WorkflowError::Validation(format!(
            "template '{}' expects {} text boxes, got {}",
            template.name,
            template.box_count,
            box_texts.len()
        )));
    }
    Ok(())
}

/// Imgflip `caption_image` client.
pub struct ImgflipRenderer {
    endpoint: String,
    username: String,
    password: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for ImgflipRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgflipRenderer")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ImgflipRenderer {
    pub fn new(endpoint: &str, username: &str, password: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Build from `[renderer]`, resolving `${ENV_VAR}` credentials.
    pub fn from_config(config: &RendererConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let username = resolve_env_var(&config.username).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Renderer username not set ({}). Set IMGFLIP_USERNAME or renderer.username.",
                config.username
            ))
        })?;
        let password = resolve_env_var(&config.password).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Renderer password not set ({}). Set IMGFLIP_PASSWORD or renderer.password.",
                config.password
            ))
        })?;
        Ok(Self::new(&config.endpoint, &username, &password, timeout))
    }

    fn form(&self, template_id: &str, box_texts: &[String]) -> Vec<(String, String)> {
        build_form(template_id, &self.username, &self.password, box_texts)
    }
}

/// Form fields for a `caption_image` call.
///
/// Up to two boxes use the `text0`/`text1` fields; more boxes need the
/// `boxes[i][text]` layout.
pub fn build_form(
    template_id: &str,
    username: &str,
    password: &str,
    box_texts: &[String],
) -> Vec<(String, String)> {
    let mut form = vec![
        ("template_id".to_string(), template_id.to_string()),
        ("username".to_string(), username.to_string()),
        ("password".to_string(), password.to_string()),
    ];

    if box_texts.len() <= 2 {
        for (i, text) in box_texts.iter().enumerate() {
            form.push((format!("text{i}"), text.clone()));
        }
    } else {
        for (i, text) in box_texts.iter().enumerate() {
            form.push((format!("boxes[{i}][text]"), text.clone()));
        }
    }
    form
}

/// Classify an upstream failure from its HTTP status and message.
pub fn classify_failure(status: Option<u16>, message: &str) -> RenderError {
    if let Some(code) = status {
        match code {
            401 | 403 => return RenderError::Auth(message.to_string()),
            429 | 500..=599 => {
                return RenderError::Transient {
                    message: message.to_string(),
                    status_code: Some(code),
                }
            }
            _ => {}
        }
    }

    let lowered = message.to_lowercase();
    if lowered.contains("username")
        || lowered.contains("password")
        || lowered.contains("credential")
        || lowered.contains("login")
    {
        RenderError::Auth(message.to_string())
    } else if lowered.contains("timed out")
        || lowered.contains("timeout")
        || lowered.contains("rate limit")
        || lowered.contains("try again")
    {
        RenderError::Transient {
            message: message.to_string(),
            status_code: status,
        }
    } else if lowered.contains("template") {
        RenderError::InvalidTemplate(message.to_string())
    } else if lowered.contains("box") || lowered.contains("text") {
        RenderError::InvalidBoxCount(message.to_string())
    } else {
        RenderError::Unknown(message.to_string())
    }
}

#[derive(Deserialize)]
struct CaptionResponse {
    success: bool,
    data: Option<CaptionData>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct CaptionData {
    url: String,
}

/// Decode a `caption_image` body into the image URL or a classified error.
pub fn parse_caption_response(status: Option<u16>, body: &str) -> Result<String, RenderError> {
    let resp: CaptionResponse = serde_json::from_str(body)
        .map_err(|e| classify_failure(status, &format!("malformed renderer response: {e}")))?;

    if !resp.success {
        let message = resp
            .error_message
            .unwrap_or_else(|| "renderer reported failure".to_string());
        return Err(classify_failure(status, &message));
    }

    resp.data
        .map(|d| d.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RenderError::Unknown("renderer returned no image URL".to_string()))
}

#[async_trait]
impl CaptionRenderer for ImgflipRenderer {
    fn name(&self) -> &str {
        "imgflip"
    }

    async fn render(&self, template_id: &str, box_texts: &[String]) -> Result<String, RenderError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .form(&self.form(template_id, box_texts))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    RenderError::Transient {
                        message: e.to_string(),
                        status_code: None,
                    }
                } else {
                    RenderError::Unknown(format!("renderer request failed: {e}"))
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| RenderError::Transient {
            message: format!("failed to read renderer response: {e}"),
            status_code: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            return Err(classify_failure(
                Some(status.as_u16()),
                &format!("HTTP {status}: {body}"),
            ));
        }

        parse_caption_response(Some(status.as_u16()), &body)
    }
}

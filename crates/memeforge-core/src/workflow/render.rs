//! Stage 4: render the chosen captions.

use crate::error::{RenderError, WorkflowError};
use crate::render::{check_box_count, CaptionRenderer};
use crate::retry::RetryPolicy;
use crate::types::{Stage, Template};

#[derive(Debug)]
pub(crate) struct Rendering {
    pub image_ref: String,
    pub attempts: u32,
}

#[derive(Debug)]
pub(crate) struct RenderFailure {
    pub error: WorkflowError,
    pub attempts: u32,
}

/// Render with local validation and transient-failure retries.
///
/// Only [`RenderError::Transient`] is retried; the renderer is called at most
/// `retry.max_attempts()` times before the stage gives up with
/// [`WorkflowError::ExhaustedRetries`].
pub(crate) async fn render_with_retry(
    renderer: &dyn CaptionRenderer,
    template: &Template,
    box_texts: &[String],
    retry: &RetryPolicy,
) -> Result<Rendering, RenderFailure> {
    check_box_count(template, box_texts).map_err(|error| RenderFailure { error, attempts: 0 })?;

    let mut attempts = 0;
    loop {
        attempts += 1;
        match renderer.render(&template.id, box_texts).await {
            Ok(image_ref) => {
                tracing::info!("Rendered meme via {}: {image_ref}", renderer.name());
                return Ok(Rendering {
                    image_ref,
                    attempts,
                });
            }
            Err(e @ RenderError::Transient { .. }) => {
                if attempts >= retry.max_attempts() {
                    return Err(RenderFailure {
                        error: WorkflowError::ExhaustedRetries {
                            stage: Stage::Rendered,
                            attempts,
                            last_error: e.to_string(),
                        },
                        attempts,
                    });
                }
                let delay = retry.delay_before(attempts);
                tracing::warn!(
                    "Render attempt {attempts} failed ({e}); retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(RenderFailure {
                    error: WorkflowError::Render(e),
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fails transiently a fixed number of times, noting when each call arrived.
    struct FlakyRenderer {
        failures: u32,
        calls: Mutex<Vec<Instant>>,
    }

    impl FlakyRenderer {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Time slept between consecutive calls.
        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().unwrap();
            calls.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait]
    impl CaptionRenderer for FlakyRenderer {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn render(&self, _template_id: &str, _box_texts: &[String]) -> Result<String, RenderError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() as u32 <= self.failures {
                Err(RenderError::Transient {
                    message: "HTTP 503".to_string(),
                    status_code: Some(503),
                })
            } else {
                Ok("https://i.imgflip.com/ok.jpg".to_string())
            }
        }
    }

    fn drake() -> (Template, Vec<String>) {
        (
            Template::new("181913649", "Drake Hotline Bling", 2),
            vec!["Manual deploys".to_string(), "CI pipelines".to_string()],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_grow_strictly_between_attempts() {
        let (template, texts) = drake();
        let renderer = FlakyRenderer::new(u32::MAX);
        let policy = RetryPolicy::new(5, 1875);

        let failure = render_with_retry(&renderer, &template, &texts, &policy)
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 6);
        assert!(matches!(
            failure.error,
            WorkflowError::ExhaustedRetries { attempts: 6, .. }
        ));
        let gaps = renderer.gaps();
        assert_eq!(gaps, policy.schedule());
        assert!(gaps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_backoff() {
        let (template, texts) = drake();
        let renderer = FlakyRenderer::new(2);
        let policy = RetryPolicy::new(3, 1000);

        let rendering = render_with_retry(&renderer, &template, &texts, &policy)
            .await
            .unwrap();

        assert_eq!(rendering.attempts, 3);
        assert_eq!(
            renderer.gaps(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn box_count_mismatch_never_calls_renderer() {
        let (template, _) = drake();
        let renderer = FlakyRenderer::new(0);

        let failure = render_with_retry(
            &renderer,
            &template,
            &["only one".to_string()],
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 0);
        assert!(matches!(failure.error, WorkflowError::Validation(_)));
        assert!(renderer.gaps().is_empty());
    }
}

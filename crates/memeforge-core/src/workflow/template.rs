//! Stage 1: pick a template.

use super::prompts::{correct_template_prompt, template_prompt, Rejection};
use super::repair::{complete_validated, RepairPolicy};
use super::schema::TemplateChoice;
use super::WorkflowOptions;
use crate::catalog::find_template;
use crate::llm::{LlmClient, StructuredPrompt};
use crate::types::Template;

/// Result of the template stage.
#[derive(Debug, Clone)]
pub(crate) struct TemplatePick {
    pub template: Template,
    pub rationale: Option<String>,
    /// Why the default was used instead of the model's choice
    pub fallback: Option<String>,
    pub attempts: u32,
}

/// Deterministic default: the preferred template if it is in the catalog,
/// else the first 2-box template, else the first template.
pub fn fallback_template<'a>(
    templates: &'a [Template],
    preferred: Option<&str>,
) -> Option<&'a Template> {
    preferred
        .and_then(|id| find_template(templates, id))
        .or_else(|| templates.iter().find(|t| t.box_count == 2))
        .or_else(|| templates.first())
}

/// Ask the model for a template, repairing unknown ids, then fall back.
///
/// Returns `None` only when `templates` is empty.
pub(crate) async fn select_template(
    llm: &LlmClient,
    idea: &str,
    templates: &[Template],
    options: &WorkflowOptions,
) -> Option<TemplatePick> {
    let shown = &templates[..templates.len().min(options.max_prompt_templates.max(1))];
    let valid_ids: Vec<&str> = shown.iter().map(|t| t.id.as_str()).collect();

    let policy = RepairPolicy {
        max_corrections: options.template_retries,
        validate: |choice: TemplateChoice| {
            find_template(templates, &choice.template_id)
                .map(|t| (t.clone(), choice.rationale.clone()))
                .ok_or_else(|| format!("'{}' is not in the template list", choice.template_id))
        },
        correct: |prev: &StructuredPrompt, rejection: &Rejection| {
            correct_template_prompt(prev, rejection, &valid_ids)
        },
    };

    let prompt = template_prompt(idea, shown);
    match complete_validated(llm, &prompt, &policy).await {
        Ok(repaired) => {
            let (template, rationale) = repaired.value;
            tracing::info!("Selected template {} ({})", template.name, template.id);
            Some(TemplatePick {
                template,
                rationale,
                fallback: None,
                attempts: repaired.attempts,
            })
        }
        Err(failure) => {
            let template = fallback_template(templates, options.default_template_id.as_deref())?;
            let reason = format!("model gave no usable template: {}", failure.error);
            tracing::warn!("Falling back to template {} ({reason})", template.name);
            Some(TemplatePick {
                template: template.clone(),
                rationale: None,
                fallback: Some(reason),
                attempts: failure.attempts,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Template> {
        vec![
            Template::new("87743020", "Two Buttons", 3),
            Template::new("181913649", "Drake Hotline Bling", 2),
            Template::new("112126428", "Distracted Boyfriend", 3),
        ]
    }

    #[test]
    fn test_fallback_prefers_configured_default() {
        let templates = catalog();
        let t = fallback_template(&templates, Some("112126428")).unwrap();
        assert_eq!(t.name, "Distracted Boyfriend");
    }

    #[test]
    fn test_fallback_ignores_unknown_default() {
        let templates = catalog();
        let t = fallback_template(&templates, Some("nope")).unwrap();
        assert_eq!(t.id, "181913649");
    }

    #[test]
    fn test_fallback_first_when_no_two_box_template() {
        let templates = vec![
            Template::new("1", "Four Panel", 4),
            Template::new("2", "Single", 1),
        ];
        assert_eq!(fallback_template(&templates, None).unwrap().id, "1");
    }

    #[test]
    fn test_fallback_is_always_a_catalog_member() {
        let pool = catalog();
        for n in 1..=pool.len() {
            let templates = &pool[..n];
            for preferred in [None, Some("181913649"), Some("garbage")] {
                let t = fallback_template(templates, preferred).unwrap();
                assert!(templates.contains(t));
            }
        }
        assert!(fallback_template(&[], None).is_none());
    }
}

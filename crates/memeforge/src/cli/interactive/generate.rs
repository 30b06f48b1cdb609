//! Guided meme generation.
//!
//! Walks the user through: idea → LLM provider → Imgflip login → candidate
//! count → local save → confirmation → generation. Builds a `GenerateArgs`
//! and delegates to `cli::generate::execute()`.

use crate::cli::generate::GenerateArgs;
use console::Style;
use dialoguer::{Confirm, Input, Select};
use memeforge_core::config::MAX_CANDIDATES;
use memeforge_core::Config;
use std::path::{Path, PathBuf};

use super::setup::{ensure_renderer_login, select_llm_provider, RendererLogin};
use super::theme::memeforge_theme;

/// Walk the user through one meme.
pub async fn guided_generate(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    let theme = memeforge_theme();

    // ── Step 1: Idea ────────────────────────────────────────────────────────

    let idea = loop {
        let Some(raw) = super::handle_interrupt(
            Input::<String>::with_theme(&theme)
                .with_prompt("What's the meme about?")
                .allow_empty(true)
                .interact_text(),
        )?
        else {
            return Ok(());
        };

        let idea = raw.trim().to_string();
        if !idea.is_empty() {
            break idea;
        }
        let warn = Style::new().for_stderr().yellow();
        eprintln!("  {}", warn.apply_to("Give it at least a few words."));
    };

    // ── Step 2: LLM provider ────────────────────────────────────────────────

    let Some(llm) = select_llm_provider(config, config_path)? else {
        return Ok(());
    };

    // ── Step 3: Imgflip login ───────────────────────────────────────────────

    let renderer_credentials = match ensure_renderer_login(config, config_path)? {
        Some(RendererLogin::Configured) => None,
        Some(RendererLogin::Session { username, password }) => Some((username, password)),
        None => return Ok(()),
    };

    // ── Step 4: Candidate count ─────────────────────────────────────────────

    let counts = candidate_counts();
    let labels: Vec<String> = counts.iter().map(|n| candidate_label(*n)).collect();
    let default = counts
        .iter()
        .position(|n| *n == config.workflow.num_candidates)
        .unwrap_or(0);

    let Some(count_choice) = Select::with_theme(&theme)
        .with_prompt("How many caption candidates?")
        .items(&labels)
        .default(default)
        .interact_opt()?
    else {
        return Ok(());
    };
    let candidates = counts[count_choice];

    // ── Step 5: Local save ──────────────────────────────────────────────────

    let save = match Confirm::with_theme(&theme)
        .with_prompt("Download the finished meme?")
        .default(false)
        .interact_opt()?
    {
        Some(true) => match prompt_save_path(&theme)? {
            Some(path) => Some(path),
            None => return Ok(()),
        },
        Some(false) => None,
        None => return Ok(()),
    };

    // ── Step 6: Confirmation ────────────────────────────────────────────────

    eprintln!();
    let bold = Style::new().for_stderr().bold();
    let dim = Style::new().for_stderr().dim();
    eprintln!("  {}", bold.apply_to(format!("Ready to forge: \"{idea}\"")));
    let save_label = save
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "no".to_string());
    eprintln!(
        "  {}",
        dim.apply_to(format!(
            "LLM: {} ({}) | Candidates: {candidates} | Save: {save_label}",
            llm.provider, llm.model
        ))
    );
    eprintln!();

    let confirm = Confirm::with_theme(&theme)
        .with_prompt("Generate?")
        .default(true)
        .interact_opt()?;
    if !matches!(confirm, Some(true)) {
        return Ok(());
    }

    // ── Step 7: Build GenerateArgs and delegate ─────────────────────────────

    let args = GenerateArgs {
        idea,
        llm: Some(llm.provider),
        llm_model: Some(llm.model),
        candidates: Some(candidates),
        save,
        api_key: llm.api_key,
        renderer_credentials,
        ..GenerateArgs::default()
    };

    if let Err(e) = crate::cli::generate::execute(args, config.clone()).await {
        let err = Style::new().for_stderr().red();
        eprintln!();
        eprintln!("  {} {e:#}", err.apply_to("✗"));
    }

    // ── Post-generation menu ────────────────────────────────────────────────

    eprintln!();
    let post_items = &["Make another meme", "Back to main menu"];
    let post_choice = Select::with_theme(&theme)
        .with_prompt("What next?")
        .items(post_items)
        .default(0)
        .interact_opt()?;

    if matches!(post_choice, Some(0)) {
        Box::pin(guided_generate(config, config_path)).await?;
    }

    Ok(())
}

/// Candidate counts offered in the menu.
fn candidate_counts() -> Vec<usize> {
    (1..=MAX_CANDIDATES.min(4)).collect()
}

fn candidate_label(n: usize) -> String {
    match n {
        1 => "1 (fastest, no judging)".to_string(),
        2 => "2 (default)".to_string(),
        n => n.to_string(),
    }
}

/// Prompt for where to save the image. `None` on interrupt.
fn prompt_save_path(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<Option<PathBuf>> {
    let Some(path) = super::handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Save to (file or folder)")
            .default("./memes/".to_string())
            .interact_text(),
    )?
    else {
        return Ok(None);
    };
    Ok(Some(PathBuf::from(shellexpand::tilde(&path).into_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_menu_starts_at_one_and_respects_limit() {
        let counts = candidate_counts();
        assert_eq!(counts.first(), Some(&1));
        assert!(counts.iter().all(|n| *n <= MAX_CANDIDATES));
        assert!(counts.contains(&Config::default().workflow.num_candidates));
    }

    #[test]
    fn candidate_labels_mark_special_counts() {
        assert!(candidate_label(1).contains("no judging"));
        assert!(candidate_label(2).contains("default"));
        assert_eq!(candidate_label(3), "3");
    }
}

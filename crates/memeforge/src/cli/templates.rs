//! The `memeforge templates` command: browse the template catalog.

use clap::Args;
use memeforge_core::{Config, Template, TemplateCatalog};

/// Arguments for the `templates` command.
#[derive(Args, Debug, Clone)]
pub struct TemplatesArgs {
    /// Only show templates with exactly this many text boxes
    #[arg(long)]
    pub boxes: Option<usize>,

    /// Case-insensitive substring match on the template name
    #[arg(short, long)]
    pub search: Option<String>,

    /// Maximum number of templates to show (0 = all)
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Print the matching templates as a JSON array
    #[arg(long)]
    pub json: bool,
}

impl Default for TemplatesArgs {
    fn default() -> Self {
        Self {
            boxes: None,
            search: None,
            limit: 20,
            json: false,
        }
    }
}

/// Apply the box-count, search, and limit filters, keeping catalog order.
pub fn filter_templates<'a>(templates: &'a [Template], args: &TemplatesArgs) -> Vec<&'a Template> {
    let needle = args
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let matching = templates
        .iter()
        .filter(|t| args.boxes.map_or(true, |n| t.box_count == n))
        .filter(|t| {
            needle
                .as_deref()
                .map_or(true, |needle| t.name.to_lowercase().contains(needle))
        });

    if args.limit == 0 {
        matching.collect()
    } else {
        matching.take(args.limit).collect()
    }
}

/// Execute the templates command.
pub async fn execute(args: TemplatesArgs, config: &Config) -> anyhow::Result<()> {
    let catalog = TemplateCatalog::from_config(config);
    let templates = catalog.list_templates().await?;
    let shown = filter_templates(&templates, &args);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        eprintln!("No templates match.");
        return Ok(());
    }

    println!("{:<12} {:<5} NAME", "ID", "BOXES");
    for template in &shown {
        println!("{:<12} {:<5} {}", template.id, template.box_count, template.name);
    }
    eprintln!(
        "\n{} of {} templates shown",
        shown.len(),
        templates.len()
    );
    Ok(())
}

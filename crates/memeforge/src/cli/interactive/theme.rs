//! Dialoguer theme and entry banner for interactive mode.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// A `ColorfulTheme` in MemeForge's colors: magenta prompts, green answers.
pub fn memeforge_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().magenta(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().magenta(),
        active_item_style: Style::new().for_stderr().magenta(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// Banner lines, framed with box-drawing characters.
fn banner_lines() -> Vec<String> {
    let version_line = format!("MemeForge v{}", memeforge_core::VERSION);
    let tagline = "One idea in, one meme out";
    let inner_width = version_line.len().max(tagline.len()) + 6;

    vec![
        format!("  ╔{:═<width$}╗", "", width = inner_width),
        format!("  ║{:^width$}║", version_line, width = inner_width),
        format!("  ║{:^width$}║", tagline, width = inner_width),
        format!("  ╚{:═<width$}╝", "", width = inner_width),
    ]
}

/// Print the banner to stderr so stdout stays clean for run reports.
pub fn print_banner() {
    let magenta = Style::new().for_stderr().magenta();

    eprintln!();
    for line in banner_lines() {
        eprintln!("{}", magenta.apply_to(line));
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_rows_share_a_width() {
        let lines = banner_lines();
        assert_eq!(lines.len(), 4);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines[1].contains(memeforge_core::VERSION));
    }
}

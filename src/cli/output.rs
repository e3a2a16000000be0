//! CLI output formatting utilities.

use crate::agent::ToolCallRecord;
use crate::media::Artifact;
use crate::menu::{format_price, MenuItem};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    pub fn menu_item(item: &MenuItem) {
        println!(
            "  {} {} {} {}",
            style("*").cyan(),
            style(&item.name).bold(),
            style(format_price(item.price)).green(),
            style(content_preview(&item.description, 80)).dim()
        );
    }

    pub fn tool_call(call: &ToolCallRecord) {
        let icon = if call.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "  {} {} {}",
            icon,
            style(&call.name).bold(),
            style(content_preview(&call.arguments, 60)).dim()
        );
    }

    pub fn artifact(artifact: &Artifact) {
        println!(
            "  {} {} {}",
            style("*").cyan(),
            style(artifact.kind.as_str()).bold(),
            artifact.path.display()
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
pub(crate) fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_counts_chars() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("line\nbreak", 20), "line break");
        assert_eq!(content_preview("Phở bò tái chín", 8), "Phở b...");
    }
}

//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use chatprobe_common::{ResultSummary, Verdict};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Print a serializable document in a machine-readable format. Returns
/// false for the human-readable formats, which the caller renders itself.
pub fn print_document<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> bool {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
            true
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value).unwrap_or_default());
            true
        }
        OutputFormat::Table | OutputFormat::Plain => false,
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            print_document(items, format);
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Verdict as shown in tables
pub fn verdict_cell(verdict: Verdict) -> String {
    match verdict {
        Verdict::Pass => "✓ PASS".to_string(),
        Verdict::Fail => "✗ FAIL".to_string(),
        Verdict::Unvalidated => "- skipped".to_string(),
    }
}

/// Print the end-of-run pass/fail summary
pub fn print_summary(summary: &ResultSummary) {
    match (summary.pass_percentage(), summary.fail_percentage()) {
        (Some(pass), Some(fail)) => {
            let pass = format!("Pass: {} ({:.1}%)", summary.pass_count, pass);
            let fail = format!("Fail: {} ({:.1}%)", summary.fail_count, fail);
            println!(
                "{}, {}, Skipped: {}",
                pass.green().bold(),
                if summary.fail_count > 0 {
                    fail.red().bold()
                } else {
                    fail.normal()
                },
                summary.skipped_count
            );
        }
        _ => print_warning(&summary.to_string()),
    }
}

/// Shorten long answers for table cells
pub fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ⏎ ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

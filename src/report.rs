/*!
 * Summary tables for generated prompts
 */

use std::path::Path;
use std::time::Duration;

use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::formatter::OutputFormat;
use crate::matcher::relative_path;
use crate::types::SelectedFileRecord;

/// Per-file line and character counts
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct FileReportInfo {
    #[tabled(rename = "File")]
    pub path: String,
    #[tabled(rename = "Lines")]
    pub lines: usize,
    #[tabled(rename = "Chars")]
    pub chars: usize,
}

/// Statistics for one generated prompt
#[derive(Debug, Clone)]
pub struct PromptReport {
    pub format: OutputFormat,
    pub duration: Duration,
    pub files: Vec<FileReportInfo>,
    /// Characters in the final prompt
    pub prompt_chars: usize,
    /// Tokens in the final prompt, when the tokenizer is available
    pub prompt_tokens: Option<usize>,
}

impl PromptReport {
    /// Collect counts for records read under `root`
    pub fn new(
        records: &[SelectedFileRecord],
        root: &Path,
        prompt: &str,
        format: OutputFormat,
        duration: Duration,
    ) -> Self {
        let files = records
            .iter()
            .map(|record| FileReportInfo {
                path: relative_path(Path::new(&record.path), root),
                lines: record.content.lines().count(),
                chars: record.content.chars().count(),
            })
            .collect();

        Self {
            format,
            duration,
            files,
            prompt_chars: prompt.chars().count(),
            prompt_tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Option<usize>) -> Self {
        self.prompt_tokens = tokens;
        self
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.lines).sum()
    }
}

/// Format a number with human-readable units
pub fn format_number(num: usize) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

/// Render the per-file table followed by totals
pub fn render_report(report: &PromptReport) -> String {
    let mut table = Table::new(&report.files);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()));

    let tokens = report
        .prompt_tokens
        .map(format_number)
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "{}\n{} files, {} lines, {} chars, {} tokens ({} format, {:.2?})",
        table,
        report.files.len(),
        format_number(report.total_lines()),
        format_number(report.prompt_chars),
        tokens,
        report.format,
        report.duration
    )
}

//! Terminal output for the command-line interface.
//!
//! Colored status lines, a per-source progress bar driven by [`RunEvent`]s,
//! and table/plain renderings of records and run summaries.

use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::aggregator::{RunEvent, RunState, RunSummary};
use crate::models::Record;
use crate::utils::CacheStats;

/// Get the current terminal width.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a terminal. Progress is drawn there.
pub fn is_stderr_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Icon for a provider, by id or display name.
pub fn source_icon(source: &str) -> &'static str {
    match source.to_lowercase().as_str() {
        "arxiv" => "📝",
        "semantic" | "semantic scholar" => "🧠",
        "openalex" => "🔗",
        "crossref" => "📚",
        "pubmed" => "🏥",
        _ => "📄",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// A status message prefixed with its colored icon.
pub fn status_line(status: Status, msg: &str) -> String {
    let icon = status_icon(status);
    match status {
        Status::Success => format!("{} {}", icon.green().bold(), msg),
        Status::Error => format!("{} {}", icon.red().bold(), msg),
        Status::Warning => format!("{} {}", icon.yellow().bold(), msg),
        Status::Info => format!("{} {}", icon.cyan().bold(), msg),
        Status::Search => format!("{} {}", icon.yellow(), msg),
    }
}

/// Print a styled status message to stderr.
pub fn print_status(status: Status, msg: &str) {
    eprintln!("{}", status_line(status, msg));
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(terminal_width().min(80)).dimmed());
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, unicode_width::UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    // Longest prefix that fits alongside the ellipsis
    let mut current_width = 0;
    let mut end_idx = 0;
    for (i, (_, w)) in char_widths.iter().enumerate() {
        if current_width + w > max_width - 3 {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated)
}

/// Per-source progress bar for one search run.
///
/// Cheap to clone; every clone drives the same bar, so one can be moved into
/// an [`Aggregator`](crate::aggregator::Aggregator) observer.
#[derive(Debug, Clone)]
pub struct SearchProgress {
    bar: ProgressBar,
}

impl SearchProgress {
    /// A bar for `total` sources, drawn on stderr
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {msg} {wide_bar:.cyan/blue} {pos}/{len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .progress_chars("█▓░");
        bar.set_style(style);
        bar.set_message("🔬 Searching");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A bar that draws nothing, for quiet or non-interactive output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update the bar for one run event
    pub fn handle(&self, event: &RunEvent) {
        match event {
            RunEvent::Started { source } => {
                self.bar
                    .set_message(format!("{} {}", source_icon(source), source));
            }
            RunEvent::CacheHit { source, records } => {
                self.bar.println(status_line(
                    Status::Info,
                    &format!("{}: {} records (cached)", source, records),
                ));
                self.bar.inc(1);
            }
            RunEvent::Fetched { source, records } => {
                self.bar.println(status_line(
                    Status::Success,
                    &format!("{}: {} records", source, records),
                ));
                self.bar.inc(1);
            }
            RunEvent::Failed { source, error } => {
                self.bar
                    .println(status_line(Status::Error, &format!("{}: {}", source, error)));
                self.bar.inc(1);
            }
            RunEvent::Finished { .. } => self.bar.finish_and_clear(),
        }
    }

    /// Position of the bar, i.e. the number of sources that finished
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar, e.g. after the run was cancelled
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Render records as a table sized to `width` columns.
pub fn records_table(records: &[Record], width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width.min(u16::MAX as usize) as u16)
        .set_header(vec!["#", "Title", "Authors", "Year", "Venue", "Cites", "Source", "DOI"]);

    for (i, record) in records.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(truncate_with_ellipsis(&record.title, 80)).add_attribute(Attribute::Bold),
            Cell::new(truncate_with_ellipsis(&record.authors, 40)),
            Cell::new(&record.year),
            Cell::new(truncate_with_ellipsis(&record.venue, 30)),
            Cell::new(record.citation_count).set_alignment(CellAlignment::Right),
            Cell::new(&record.source),
            Cell::new(&record.doi),
        ]);
    }

    table
}

/// Render one record as indented plain text.
pub fn record_plain(record: &Record) -> String {
    format!(
        "{} ({})\n  Authors: {}\n  Venue:   {}\n  Source:  {} | Citations: {}\n  DOI:     {}\n  URL:     {}\n  License: {}",
        record.title,
        record.year,
        record.authors,
        record.venue,
        record.source,
        record.citation_count,
        record.doi,
        record.url,
        record.license
    )
}

/// Human-readable lines describing a run summary.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::new();

    let headline = format!(
        "{} unique records, {} duplicates dropped, {} filtered out",
        format_number(summary.records_yielded),
        format_number(summary.duplicates_dropped),
        format_number(summary.filtered_out)
    );
    lines.push(status_line(Status::Search, &headline));

    if !summary.successful.is_empty() {
        let mut msg = format!("Succeeded: {}", summary.successful.join(", "));
        if summary.cache_hits > 0 {
            msg.push_str(&format!(" ({} from cache)", summary.cache_hits));
        }
        lines.push(status_line(Status::Success, &msg));
    }

    for name in &summary.failed {
        let reason = summary.failure_reason(name).unwrap_or("unknown error");
        lines.push(status_line(
            Status::Error,
            &format!("Failed: {} ({})", name, reason),
        ));
    }

    if summary.state == RunState::Cancelled {
        lines.push(status_line(Status::Warning, "Run was cancelled"));
    }

    lines
}

/// Render cache statistics as a two-column table.
pub fn cache_stats_table(stats: &CacheStats) -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_header(vec!["Setting", "Value"]);

    table.add_row(vec![
        Cell::new("Enabled"),
        Cell::new(if stats.enabled { "yes" } else { "no" }),
    ]);
    table.add_row(vec![
        Cell::new("Directory"),
        Cell::new(stats.cache_dir.display()),
    ]);
    table.add_row(vec![Cell::new("Entries"), Cell::new(stats.entries)]);
    table.add_row(vec![Cell::new("Expired"), Cell::new(stats.expired)]);
    table.add_row(vec![
        Cell::new("Size"),
        Cell::new(format!("{} KB", format_number(stats.size_kb as usize))),
    ]);
    table.add_row(vec![
        Cell::new("TTL"),
        Cell::new(format!("{} h", stats.ttl.as_secs() / 3600)),
    ]);

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordBuilder;

    #[test]
    fn test_source_icon() {
        assert_eq!(source_icon("arxiv"), "📝");
        assert_eq!(source_icon("Semantic Scholar"), "🧠");
        assert_eq!(source_icon("unknown"), "📄");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("Hello", 10), "Hello");
        assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
        assert_eq!(truncate_with_ellipsis("Hello", 3), "...");
        // Wide characters count double
        assert_eq!(truncate_with_ellipsis("図形ニューラル", 7), "図形...");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1000000), "1,000,000");
        assert_eq!(format_number(123), "123");
    }

    #[test]
    fn test_hidden_progress_counts_finished_sources() {
        let progress = SearchProgress::hidden();
        progress.handle(&RunEvent::Started { source: "arXiv".into() });
        progress.handle(&RunEvent::Fetched { source: "arXiv".into(), records: 3 });
        progress.handle(&RunEvent::Started { source: "OpenAlex".into() });
        progress.handle(&RunEvent::Failed {
            source: "OpenAlex".into(),
            error: "Request timed out".into(),
        });
        assert_eq!(progress.position(), 2);
    }

    #[test]
    fn test_records_table_has_one_row_per_record() {
        let records = vec![
            RecordBuilder::new("Graph Attention Networks", "arXiv")
                .year(2017)
                .doi("10.48550/arXiv.1710.10903")
                .build(),
            RecordBuilder::new("Untitled", "OpenAlex").build(),
        ];

        let rendered = records_table(&records, 200).to_string();
        assert!(rendered.contains("Graph Attention Networks"));
        assert!(rendered.contains("10.48550/arXiv.1710.10903"));
        assert!(rendered.contains("OpenAlex"));
        assert_eq!(records_table(&records, 200).row_count(), 2);
    }

    #[test]
    fn test_summary_lines_list_failures() {
        let mut summary = RunSummary::running();
        summary.record_success("arXiv", true);
        summary.record_failure("CrossRef", "Rate limit exceeded");
        summary.records_yielded = 4;
        summary.complete();

        let lines = summary_lines(&summary);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("arXiv"));
        assert!(lines[1].contains("1 from cache"));
        assert!(lines[2].contains("CrossRef"));
        assert!(lines[2].contains("Rate limit exceeded"));
    }

    #[test]
    fn test_record_plain_shows_sentinels() {
        let record = RecordBuilder::new("Lonely", "CrossRef").build();
        let text = record_plain(&record);
        assert!(text.starts_with("Lonely ("));
        assert!(text.contains("Source:  CrossRef"));
    }
}

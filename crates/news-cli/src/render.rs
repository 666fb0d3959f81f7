//! Terminal rendering of pipeline results

use news_core::{ExecutionOutcome, ObservabilityStatus, Topic, ValidationError};
use std::io::{self, Write};

pub(crate) const TITLE: &str = "📰 AI News Crew";
pub(crate) const WELCOME: &str = "Welcome to AI News Crew - your intelligent research and reporting assistant.\n\
Enter a topic below and our AI crew will conduct thorough research and generate a comprehensive report.";
pub(crate) const PROMPT_HINT: &str = "What would you like to research? (e.g., AI LLMs, Climate Change, Quantum Computing)";
pub(crate) const RESEARCHING: &str = "🔍 AI crew is researching your topic... This may take a few minutes.";
pub(crate) const SUCCESS: &str = "✅ Research completed successfully!";
pub(crate) const REPORT_HEADING: &str = "📋 Research Report";
pub(crate) const RULE: &str = "---";

pub(crate) fn banner(out: &mut impl Write, status: &ObservabilityStatus, styled: bool) -> io::Result<()> {
    writeln!(out, "{TITLE}")?;
    writeln!(out)?;
    writeln!(out, "{WELCOME}")?;
    writeln!(out)?;
    status_line(out, status, styled)?;
    writeln!(out, "Commands: /save [PATH], /status, /quit")?;
    writeln!(out)?;
    writeln!(out, "{PROMPT_HINT}")
}

/// Observability indicator, in its colour when `styled`
pub(crate) fn status_line(out: &mut impl Write, status: &ObservabilityStatus, styled: bool) -> io::Result<()> {
    match ansi_colour(status.colour()).filter(|_| styled) {
        Some(colour) => writeln!(out, "{colour}{status}\x1b[0m"),
        None => writeln!(out, "{status}"),
    }
}

/// Truecolor escape for a `#rrggbb` colour
fn ansi_colour(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(format!("\x1b[38;2;{};{};{}m", channel(0)?, channel(2)?, channel(4)?))
}

/// Render an outcome in full: report body on success, title/message/hint on
/// failure.
pub(crate) fn outcome(out: &mut impl Write, outcome: &ExecutionOutcome) -> io::Result<()> {
    match outcome {
        ExecutionOutcome::Success(report) => {
            writeln!(out, "{SUCCESS}")?;
            writeln!(out)?;
            writeln!(out, "{REPORT_HEADING}")?;
            writeln!(out, "{RULE}")?;
            writeln!(out, "{}", report.as_markdown())
        }
        ExecutionOutcome::Failure(failure) => {
            if failure.category.is_execution_failure() {
                writeln!(out, "❌ {failure}")?;
                writeln!(out, "ℹ️ {}", failure.hint())
            } else {
                writeln!(out, "❌ {}", failure.message)
            }
        }
    }
}

pub(crate) fn validation(out: &mut impl Write, result: &Result<Topic, ValidationError>) -> io::Result<()> {
    match result {
        Ok(topic) => writeln!(out, "✅ Topic accepted: {topic}"),
        Err(e) => writeln!(out, "❌ {e}"),
    }
}

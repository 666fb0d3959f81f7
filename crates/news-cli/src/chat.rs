//! Interactive chat loop
//!
//! One line is one topic. While a submission is in flight the loop awaits
//! it and reads nothing else; lines typed meanwhile are discarded once it
//! returns, so they never start another run.

use crate::render;
use anyhow::Context;
use news_core::{ExecutionOutcome, Report, RequestPipeline};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// How long input must stay quiet before typeahead counts as drained
const TYPEAHEAD_WINDOW: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    Topic(String),
    Save(Option<PathBuf>),
    Status,
    Quit,
    Unknown(String),
    Blank,
}

impl ChatCommand {
    pub(crate) fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Blank;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Topic(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (command, None),
        };
        match name {
            "save" => Self::Save(arg.filter(|a| !a.is_empty()).map(PathBuf::from)),
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Chat state kept by the front end between submissions
#[derive(Debug)]
pub(crate) struct ChatSession {
    last_report: Option<Report>,
    styled: bool,
    typeahead_window: Option<Duration>,
}

impl ChatSession {
    pub(crate) fn new() -> Self {
        Self {
            last_report: None,
            styled: false,
            typeahead_window: Some(TYPEAHEAD_WINDOW),
        }
    }

    /// Colour the observability indicator
    #[must_use]
    pub(crate) fn with_styling(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    /// Run lines typed during a submission instead of discarding them
    #[cfg(test)]
    #[must_use]
    pub(crate) fn keep_typeahead(mut self) -> Self {
        self.typeahead_window = None;
        self
    }

    #[cfg(test)]
    pub(crate) fn last_report(&self) -> Option<&Report> {
        self.last_report.as_ref()
    }

    /// Run until `/quit` or end of input
    pub(crate) async fn run<R, W>(
        &mut self,
        pipeline: &mut RequestPipeline,
        input: R,
        out: &mut W,
        current_year: i32,
    ) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        render::banner(out, &pipeline.observability_status(), self.styled)?;
        let mut lines = input.lines();

        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next_line().await.context("reading input")? else {
                break;
            };

            match ChatCommand::parse(&line) {
                ChatCommand::Blank => {}
                ChatCommand::Quit => break,
                ChatCommand::Status => {
                    render::status_line(out, &pipeline.observability_status(), self.styled)?;
                }
                ChatCommand::Unknown(name) => {
                    writeln!(out, "Unknown command /{name}. Commands: /save [PATH], /status, /quit")?;
                }
                ChatCommand::Save(path) => self.save(pipeline, path.as_deref(), out)?,
                ChatCommand::Topic(topic) => {
                    if let Err(e) = pipeline.validate(&topic) {
                        writeln!(out, "❌ {e}")?;
                        continue;
                    }
                    writeln!(out, "{}", render::RESEARCHING)?;
                    out.flush()?;
                    let outcome = pipeline.submit(&topic, current_year).await;
                    render::outcome(out, &outcome)?;
                    if let ExecutionOutcome::Success(report) = outcome {
                        self.last_report = Some(report);
                    }

                    if let Some(window) = self.typeahead_window {
                        let (discarded, eof) = discard_typeahead(&mut lines, window).await?;
                        if discarded > 0 {
                            writeln!(out, "Ignored {discarded} line(s) typed while researching.")?;
                        }
                        if eof {
                            break;
                        }
                    }
                }
            }
        }

        writeln!(out, "Goodbye!")?;
        Ok(())
    }

    fn save<W: Write>(
        &self,
        pipeline: &RequestPipeline,
        path: Option<&Path>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(report) = &self.last_report else {
            writeln!(out, "No report to save yet.")?;
            return Ok(());
        };

        let export = report.export(&pipeline.session_id());
        let target = export_target(path, &export.file_name);
        match std::fs::write(&target, &export.bytes) {
            Ok(()) => writeln!(out, "💾 Saved report to {}", target.display())?,
            Err(e) => {
                tracing::warn!("Failed to save report: {}", e);
                writeln!(out, "❌ Could not save report to {}: {e}", target.display())?;
            }
        }
        Ok(())
    }
}

/// Drop lines that are already waiting; returns how many and whether input
/// ended.
async fn discard_typeahead<R>(lines: &mut Lines<R>, window: Duration) -> anyhow::Result<(usize, bool)>
where
    R: AsyncBufRead + Unpin,
{
    let mut discarded = 0;
    loop {
        // next_line is cancel safe: a line arriving after the window is kept
        let Ok(line) = tokio::time::timeout(window, lines.next_line()).await else {
            return Ok((discarded, false));
        };
        match line.context("reading input")? {
            Some(_) => discarded += 1,
            None => return Ok((discarded, true)),
        }
    }
}

/// Resolve where an export goes: a directory gets the suggested file name.
pub(crate) fn export_target(path: Option<&Path>, file_name: &str) -> PathBuf {
    match path {
        None => PathBuf::from(file_name),
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(file) => file.to_path_buf(),
    }
}

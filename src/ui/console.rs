//! Interactive console front end.
//!
//! Reads one command per line, drives the [`ProcessingWorkflow`] and prints the
//! resulting view through a [`ConsoleScreen`].

use crate::metrics::SessionMetrics;
use crate::models::{FileCandidate, ImputationMethod, ParameterError};
use crate::services::client::{ImputationApi, UploadRequest};
use crate::state::{ProcessingWorkflow, WorkflowEvent};
use crate::ui::view::{DisplaySink, Element, format_file_size, render, view_for};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

pub const HELP: &str = "\
Commands:
  select <path>         choose a spreadsheet (.xlsx or .xls, up to 10MB)
  remove                clear the selected file
  method <name>         imputation method: auto, bayesian, rf, pmm
  iterations <n>        number of imputation iterations
  submit                send the selected file for processing
  download [dir]        save the processed file (default: configured download dir)
  reset                 start over with a new file
  status                show the current state
  help                  show this message
  quit                  exit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Select(Utf8PathBuf),
    Remove,
    Method(ImputationMethod),
    /// Raw text; validated by the session so a bad value keeps the old one
    Iterations(String),
    Submit,
    Download(Option<Utf8PathBuf>),
    Reset,
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error(transparent)]
    InvalidParameter(#[from] ParameterError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let required = |name: &'static str| {
            if rest.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(rest)
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "select" | "open" => Ok(Command::Select(Utf8PathBuf::from(required("select")?))),
            "remove" => Ok(Command::Remove),
            "method" => Ok(Command::Method(required("method")?.parse()?)),
            "iterations" => Ok(Command::Iterations(required("iterations")?.to_string())),
            "submit" | "process" => Ok(Command::Submit),
            "download" => Ok(Command::Download(
                (!rest.is_empty()).then(|| Utf8PathBuf::from(rest)),
            )),
            "reset" | "new" => Ok(Command::Reset),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// A [`DisplaySink`] that remembers what is shown and prints it as text.
#[derive(Debug, Default)]
pub struct ConsoleScreen {
    visible: BTreeSet<Element>,
    texts: BTreeMap<Element, String>,
}

impl DisplaySink for ConsoleScreen {
    fn set_text(&mut self, element: Element, text: &str) {
        self.texts.insert(element, text.to_string());
    }

    fn show(&mut self, element: Element) {
        self.visible.insert(element);
    }

    fn hide(&mut self, element: Element) {
        self.visible.remove(&element);
    }
}

impl ConsoleScreen {
    fn text(&self, element: Element) -> &str {
        self.texts.get(&element).map(String::as_str).unwrap_or("")
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.visible.contains(&Element::ErrorBanner) {
            lines.push(format!("Error: {}", self.text(Element::ErrorBanner)));
        }
        if self.visible.contains(&Element::UploadSection) {
            lines.push("No file selected. Use `select <path>` to choose a spreadsheet.".to_string());
        }
        if self.visible.contains(&Element::FileInfo) {
            lines.push(format!(
                "Selected: {} ({})",
                self.text(Element::FileName),
                self.text(Element::FileSize)
            ));
            lines.push(format!("Parameters: {}", self.text(Element::Parameters)));
            lines.push("Use `submit` to process or `remove` to clear.".to_string());
        }
        if self.visible.contains(&Element::Processing) {
            lines.push(format!(
                "Processing {} ({})...",
                self.text(Element::FileName),
                self.text(Element::Parameters)
            ));
        }
        if self.visible.contains(&Element::ResultSection) {
            lines.push(format!(
                "Processing complete: {} missing values filled ({} rows x {} columns)",
                self.text(Element::MissingCount),
                self.text(Element::TotalRows),
                self.text(Element::TotalCols)
            ));
            lines.push("Use `download [dir]` to save or `reset` to start over.".to_string());
        }

        lines
    }
}

/// Line-oriented controller over one workflow.
pub struct ConsoleController<A: ImputationApi> {
    workflow: ProcessingWorkflow,
    api: A,
    download_dir: Utf8PathBuf,
    metrics: Arc<SessionMetrics>,
    screen: ConsoleScreen,
    events_rx: broadcast::Receiver<WorkflowEvent>,
}

impl<A: ImputationApi> ConsoleController<A> {
    pub fn new(
        workflow: ProcessingWorkflow,
        api: A,
        download_dir: Utf8PathBuf,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let events_rx = workflow.subscribe();
        Self {
            workflow,
            api,
            download_dir,
            metrics,
            screen: ConsoleScreen::default(),
            events_rx,
        }
    }

    pub fn workflow(&self) -> &ProcessingWorkflow {
        &self.workflow
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_line(out, "Type `help` for a list of commands.").await?;
        self.write_screen(out).await?;

        let mut lines = input.lines();
        loop {
            out.write_all(b"> ").await?;
            out.flush().await?;

            let Some(line) = lines.next_line().await.context("Failed to read command")? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let keep_going = match line.parse::<Command>() {
                Ok(command) => self.execute(command, out).await?,
                Err(e) => {
                    write_line(out, &format!("{}. Type `help` for a list of commands.", e)).await?;
                    true
                }
            };
            self.drain_events();

            if !keep_going {
                break;
            }
        }

        out.flush().await?;
        Ok(())
    }

    /// Run one command. Returns `false` when the session should end.
    pub async fn execute<W: AsyncWrite + Unpin>(&mut self, command: Command, out: &mut W) -> Result<bool> {
        match command {
            Command::Select(path) => match FileCandidate::from_path(&path).await {
                Ok(candidate) => match self.workflow.select_candidate(candidate) {
                    Ok(_) => self.write_screen(out).await?,
                    Err(e) => write_line(out, &format!("Error: {}", e)).await?,
                },
                Err(e) => write_line(out, &format!("Error: cannot open {}: {}", path, e)).await?,
            },
            Command::Remove => {
                let result = self.workflow.remove();
                self.report(result, out).await?;
            }
            Command::Method(method) => {
                self.workflow.session_mut().set_method(method);
                write_line(out, &format!("Method set to {}", method)).await?;
            }
            Command::Iterations(text) => match self.workflow.session_mut().set_iterations_text(&text) {
                Ok(()) => {
                    let iterations = self.workflow.session().params().iterations();
                    write_line(out, &format!("Iterations set to {}", iterations)).await?;
                }
                Err(e) => write_line(out, &format!("Error: {}", e)).await?,
            },
            Command::Submit => self.submit(out).await?,
            Command::Download(dir) => self.download(dir, out).await?,
            Command::Reset => {
                let result = self.workflow.reset();
                self.report(result, out).await?;
            }
            Command::Status => self.write_screen(out).await?,
            Command::Help => write_line(out, HELP).await?,
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }

    async fn submit<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> Result<()> {
        let pending = match self.workflow.begin_submit() {
            Ok(pending) => pending,
            Err(e) => return write_line(out, &format!("Error: {}", e)).await,
        };
        self.metrics.record_events(&pending.events);
        self.write_screen(out).await?;
        out.flush().await?;

        let started = Instant::now();
        let outcome = match UploadRequest::build(&pending.file, pending.params).await {
            Ok(request) => self.api.upload(request).await,
            Err(e) => Err(e),
        };
        self.metrics.record_processing_time(started.elapsed());

        let events = self.workflow.complete(outcome)?;
        self.metrics.record_events(&events);
        self.write_screen(out).await
    }

    async fn download<W: AsyncWrite + Unpin>(&mut self, dir: Option<Utf8PathBuf>, out: &mut W) -> Result<()> {
        let dir = dir.unwrap_or_else(|| self.download_dir.clone());

        let artifact = match self.workflow.download(&self.api).await {
            Ok(artifact) => artifact,
            Err(e) => return write_line(out, &format!("Error: {}", e)).await,
        };

        match artifact.save_to(&dir).await {
            Ok(path) => {
                self.metrics.record_download(artifact.bytes.len());
                write_line(
                    out,
                    &format!("Saved {} ({})", path, format_file_size(artifact.bytes.len() as u64)),
                )
                .await
            }
            Err(e) => write_line(out, &format!("Error: {}", e)).await,
        }
    }

    async fn report<T, E, W>(&mut self, result: Result<T, E>, out: &mut W) -> Result<()>
    where
        E: std::fmt::Display,
        W: AsyncWrite + Unpin,
    {
        match result {
            Ok(_) => self.write_screen(out).await,
            Err(e) => write_line(out, &format!("Error: {}", e)).await,
        }
    }

    async fn write_screen<W: AsyncWrite + Unpin>(&mut self, out: &mut W) -> Result<()> {
        render(&view_for(&self.workflow.snapshot()), &mut self.screen);
        for line in self.screen.lines() {
            write_line(out, &line).await?;
        }
        Ok(())
    }

    fn drain_events(&mut self) {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => tracing::debug!("Workflow event: {:?}", event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log skipped {} workflow events", skipped);
                }
                Err(_) => break,
            }
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}

// Workflow state machine
//
// ProcessingWorkflow owns the upload session, the current result and the
// transition rules between them. Every transition returns the events it caused
// and also broadcasts them so views can follow along without polling.

pub mod session;

pub use session::UploadSession;

use crate::models::{FileCandidate, ImputationMethod, ProcessingResult, RequestParameters, SelectedFile, Stats};
use crate::services::client::{ImputationApi, SubmissionError, UploadOutcome, UploadRequest};
use crate::services::payload::{DownloadError, DownloadableArtifact, materialize};
use crate::services::validation::{FileValidator, ValidationError};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Where the workflow is.
///
/// `Failed` is transient: a failed submission passes through it on the way
/// back to `FileSelected`, which is where the workflow comes to rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Idle,
    FileSelected,
    Processing,
    ResultReady,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::FileSelected => "FileSelected",
            WorkflowState::Processing => "Processing",
            WorkflowState::ResultReady => "ResultReady",
            WorkflowState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Events emitted by workflow transitions
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    StateChanged {
        from: WorkflowState,
        to: WorkflowState,
    },

    FileSelected {
        name: String,
        size_bytes: u64,
    },

    FileRemoved {
        name: String,
    },

    SubmissionStarted {
        name: String,
        method: ImputationMethod,
        iterations: u32,
    },

    ProcessingSucceeded {
        payload_kind: &'static str,
        stats: Stats,
    },

    ProcessingFailed {
        message: String,
    },

    /// Everything was cleared by an explicit reset
    StateReset,
}

/// A transition that is not allowed from the current state.
///
/// The state is left untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("A file is being processed; wait for it to finish")]
    Busy,

    #[error("Please select a file first")]
    NoFileSelected,

    #[error("No submission is in progress")]
    NotProcessing,

    #[error("Cannot {action} while {state}")]
    NotAllowed {
        action: &'static str,
        state: WorkflowState,
    },
}

/// Why a selection did not happen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// A submission that has entered `Processing` and is waiting for its outcome.
#[derive(Clone, Debug)]
pub struct PendingSubmission {
    pub file: SelectedFile,
    pub params: RequestParameters,
    pub events: Vec<WorkflowEvent>,
}

/// Read-only copy of what a view needs.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub file_name: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub params: RequestParameters,
    pub stats: Option<Stats>,
    pub last_error: Option<String>,
}

/// The upload/process/download state machine.
///
/// ```text
/// Idle --select--> FileSelected --submit--> Processing --success--> ResultReady
///                  ^    |                       |                      |
///                  |    +--remove--> Idle        +--failure--> FileSelected
///                  +---------------- reset (any state but Processing) --> Idle
/// ```
///
/// Only one submission can be in flight. While `Processing`, `select`,
/// `remove`, `reset` and a second `submit` are refused with
/// [`WorkflowError::Busy`].
pub struct ProcessingWorkflow {
    state: WorkflowState,
    session: UploadSession,
    /// Present exactly when `state == ResultReady`
    result: Option<(ProcessingResult, Stats)>,
    last_error: Option<String>,
    validator: FileValidator,
    events_tx: broadcast::Sender<WorkflowEvent>,
}

impl ProcessingWorkflow {
    pub fn new(params: RequestParameters) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            state: WorkflowState::Idle,
            session: UploadSession::new(params),
            result: None,
            last_error: None,
            validator: FileValidator::new(),
            events_tx,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.session.file()
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref().map(|(result, _)| result)
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.result.as_ref().map(|(_, stats)| stats)
    }

    /// Message of the most recent failed submission, until the next transition.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// Parameters can be edited in any state; they are read at submission time.
    pub fn session_mut(&mut self) -> &mut UploadSession {
        &mut self.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.state,
            file_name: self.session.file().map(|f| f.name().to_string()),
            file_size_bytes: self.session.file().map(|f| f.size_bytes()),
            params: self.session.params(),
            stats: self.stats().copied(),
            last_error: self.last_error.clone(),
        }
    }

    /// Validate a candidate and select it.
    ///
    /// The busy guard runs before validation, so nothing is inspected while a
    /// submission is in flight. A rejected candidate leaves the state as it was.
    pub fn select_candidate(&mut self, candidate: FileCandidate) -> Result<Vec<WorkflowEvent>, SelectError> {
        self.ensure_not_processing()?;
        let file = self.validator.validate(candidate).inspect_err(|e| {
            tracing::warn!("File rejected: {}", e);
        })?;
        Ok(self.select(file)?)
    }

    /// Put an already validated file into the slot.
    ///
    /// Allowed from every state except `Processing`; a previous file or result
    /// is discarded.
    pub fn select(&mut self, file: SelectedFile) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        self.ensure_not_processing()?;

        let mut events = Vec::new();
        let event = WorkflowEvent::FileSelected {
            name: file.name().to_string(),
            size_bytes: file.size_bytes(),
        };

        if let Some(previous) = self.session.replace_file(file) {
            tracing::debug!("Replacing previously selected file {}", previous.name());
        }
        self.result = None;
        self.last_error = None;
        self.transition(WorkflowState::FileSelected, &mut events);
        events.push(event);

        Ok(self.emit(events))
    }

    /// `FileSelected -> Idle`
    pub fn remove(&mut self) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        match self.state {
            WorkflowState::FileSelected => {}
            WorkflowState::Processing => return Err(WorkflowError::Busy),
            WorkflowState::Idle => return Err(WorkflowError::NoFileSelected),
            state => {
                return Err(WorkflowError::NotAllowed {
                    action: "remove the file",
                    state,
                });
            }
        }

        let mut events = Vec::new();
        let removed = self.session.take_file();
        self.last_error = None;
        self.transition(WorkflowState::Idle, &mut events);
        if let Some(file) = removed {
            events.push(WorkflowEvent::FileRemoved {
                name: file.name().to_string(),
            });
        }

        Ok(self.emit(events))
    }

    /// `FileSelected -> Processing`
    ///
    /// Returns what must be sent; pass the outcome to [`Self::complete`].
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, WorkflowError> {
        match self.state {
            WorkflowState::FileSelected => {}
            WorkflowState::Processing => {
                tracing::warn!("Ignoring submit while a submission is in flight");
                return Err(WorkflowError::Busy);
            }
            WorkflowState::Idle => return Err(WorkflowError::NoFileSelected),
            state => {
                return Err(WorkflowError::NotAllowed {
                    action: "submit",
                    state,
                });
            }
        }

        let file = self
            .session
            .file()
            .cloned()
            .ok_or(WorkflowError::NoFileSelected)?;
        let params = self.session.params();

        let mut events = Vec::new();
        self.last_error = None;
        self.transition(WorkflowState::Processing, &mut events);
        events.push(WorkflowEvent::SubmissionStarted {
            name: file.name().to_string(),
            method: params.method(),
            iterations: params.iterations(),
        });

        Ok(PendingSubmission {
            file,
            params,
            events: self.emit(events),
        })
    }

    /// Apply the outcome of the in-flight submission.
    ///
    /// Success moves to `ResultReady`. Any failure passes through `Failed`
    /// and lands back on `FileSelected` with the file kept for a retry.
    pub fn complete(
        &mut self,
        outcome: Result<UploadOutcome, SubmissionError>,
    ) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        if self.state != WorkflowState::Processing {
            return Err(WorkflowError::NotProcessing);
        }

        let mut events = Vec::new();
        match outcome {
            Ok(UploadOutcome { result, stats }) => {
                tracing::info!("Processing finished ({} payload): {}", result.kind(), stats.summary());
                let payload_kind = result.kind();
                self.result = Some((result, stats));
                self.transition(WorkflowState::ResultReady, &mut events);
                events.push(WorkflowEvent::ProcessingSucceeded {
                    payload_kind,
                    stats,
                });
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Error processing file: {}", message);
                self.result = None;
                self.transition(WorkflowState::Failed, &mut events);
                events.push(WorkflowEvent::ProcessingFailed {
                    message: message.clone(),
                });
                self.transition(WorkflowState::FileSelected, &mut events);
                self.last_error = Some(message);
            }
        }

        Ok(self.emit(events))
    }

    /// Send the selected file and wait for the service.
    ///
    /// Submission errors do not surface as `Err`; they drive the workflow back
    /// to `FileSelected` and show up as a [`WorkflowEvent::ProcessingFailed`].
    /// `Err` only means the submission could not start.
    pub async fn submit<A: ImputationApi>(&mut self, api: &A) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        let pending = self.begin_submit()?;
        let mut events = pending.events;

        let outcome = match UploadRequest::build(&pending.file, pending.params).await {
            Ok(request) => api.upload(request).await,
            Err(e) => Err(e),
        };

        events.extend(self.complete(outcome)?);
        Ok(events)
    }

    /// Materialize the current result. The state does not change, so this
    /// can be repeated after a failure.
    pub async fn download<A: ImputationApi>(&self, api: &A) -> Result<DownloadableArtifact, DownloadError> {
        let (Some((result, _)), Some(file)) = (&self.result, self.session.file()) else {
            return Err(DownloadError::NoResultAvailable);
        };
        if self.state != WorkflowState::ResultReady {
            return Err(DownloadError::NoResultAvailable);
        }

        materialize(result, file.name(), api).await.inspect_err(|e| {
            tracing::error!("Error downloading file: {}", e);
        })
    }

    /// Clear the file, result and stats and return to `Idle`.
    pub fn reset(&mut self) -> Result<Vec<WorkflowEvent>, WorkflowError> {
        self.ensure_not_processing()?;

        let mut events = Vec::new();
        self.session.take_file();
        self.result = None;
        self.last_error = None;
        self.transition(WorkflowState::Idle, &mut events);
        events.push(WorkflowEvent::StateReset);

        Ok(self.emit(events))
    }

    fn ensure_not_processing(&self) -> Result<(), WorkflowError> {
        if self.state == WorkflowState::Processing {
            Err(WorkflowError::Busy)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, to: WorkflowState, events: &mut Vec<WorkflowEvent>) {
        let from = self.state;
        if from == to {
            return;
        }
        tracing::info!("Workflow: {} -> {}", from, to);
        self.state = to;
        events.push(WorkflowEvent::StateChanged { from, to });
    }

    fn emit(&self, events: Vec<WorkflowEvent>) -> Vec<WorkflowEvent> {
        for event in &events {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.events_tx.send(event.clone());
        }
        events
    }
}

impl Default for ProcessingWorkflow {
    fn default() -> Self {
        Self::new(RequestParameters::default())
    }
}

//! Workflow engine — drives the full capture → submit → result loop.
//!
//! [`WorkflowEngine`] owns the [`WorkflowMachine`] and responds to
//! [`WorkflowCommand`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Pipeline flow
//!
//! ```text
//! WorkflowCommand::StartRecording
//!   └─▶ machine → Capturing, recorder acquires the device
//!
//! WorkflowCommand::StopRecording
//!   └─▶ device released, chunks finalized → AudioArtifact
//!         └─▶ machine → Processing, submission spawned
//!
//! WorkflowCommand::Ingest(file)
//!   └─▶ normalize → AudioArtifact → machine → Processing, submission spawned
//!
//! EngineEvent::SubmissionResolved
//!   ├─ Ok  → machine → Completed, quiz snapshot written   [Completed]
//!   └─ Err → machine → Failed, artifact retained          [Failed]
//! ```
//!
//! Submissions and chat queries are spawned, never awaited inline: their
//! completions come back as [`EngineEvent`] messages on an internal channel,
//! so the engine keeps consuming commands while work is in flight and a
//! second ingestion during Processing is genuinely observed and rejected.
//! Progress is published as [`WorkflowEvent`]s for the frontend.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::{AudioArtifact, AudioRecorder};
use crate::ingest::{self, IngestSource};
use crate::present::{NotesExporter, QuizStore};
use crate::remote::{LectureProcessor, RemoteError};
use crate::workflow::machine::WorkflowMachine;
use crate::workflow::state::{LectureResult, PipelineStatus, SharedState};

// ---------------------------------------------------------------------------
// User-facing messages
// ---------------------------------------------------------------------------

/// Generic message shown when a submission fails.  The transport-level cause
/// goes to the log, never to the user.
pub const SUBMISSION_FAILED_MESSAGE: &str = "Failed to process lecture. Please try again.";

/// Assistant entry appended when a chat query fails.  Chat failures are
/// non-fatal and never alter the pipeline status.
pub const FALLBACK_ASSISTANT_MESSAGE: &str =
    "Sorry, I encountered an error while analyzing the transcript.";

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Commands sent from the frontend to the workflow engine.
#[derive(Debug)]
pub enum WorkflowCommand {
    /// Acquire the microphone and start capturing.
    StartRecording,
    /// Stop capturing, finalize the artifact and submit it.
    StopRecording,
    /// Normalize an audio source and submit the resulting artifact.
    Ingest(IngestSource),
    /// Resubmit the artifact retained by a failed run.
    Retry,
    /// Acknowledge a failed run (or clear a completed one) and return to
    /// Idle.
    Reset,
    /// Ask a question about the completed lecture.
    Ask { question: String },
    /// Export study notes; `None` writes into the configured exports
    /// directory under a timestamped name.
    Export { path: Option<PathBuf> },
}

/// Progress events delivered from the engine to the frontend.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// The pipeline entered a new status.
    StatusChanged(PipelineStatus),
    /// The microphone is live.
    RecordingStarted,
    /// Capture finished and was finalized into an artifact.
    RecordingFinished { duration_secs: u64, file_name: String },
    /// Capture could not start or could not be finalized.
    CaptureFailed { message: String },
    /// An artifact was submitted to the remote service.
    ProcessingStarted { file_name: String },
    /// The lecture result is available in the shared state.
    LectureCompleted,
    /// The submission errored; the artifact is retained for retry.
    SubmissionFailed { message: String },
    /// A command was rejected without a state change.
    Rejected { reason: String },
    /// An accepted ingestion source could not be read.
    IngestFailed { message: String },
    /// The chat transcript gained an entry.
    ChatUpdated,
    /// The quiz snapshot was written for the quiz view.
    QuizSaved { path: PathBuf },
    /// Study notes were written.
    ExportFinished { path: PathBuf },
    /// Study notes could not be written.
    ExportFailed { message: String },
}

/// Completion messages from spawned submission and query tasks.
///
/// Each long-running operation resolves into exactly one of these; the
/// machine decides whether the run they belong to is still current.
#[derive(Debug)]
enum EngineEvent {
    SubmissionResolved {
        run_id: u64,
        outcome: Result<LectureResult, RemoteError>,
    },
    QueryResolved {
        run_id: u64,
        outcome: Result<String, RemoteError>,
    },
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Drives the complete lecture workflow.
///
/// Create with [`WorkflowEngine::new`], then call [`run`](Self::run) inside a
/// tokio task.  The engine exits when the command channel closes and no
/// submission or query is still in flight.
pub struct WorkflowEngine {
    machine: WorkflowMachine,
    recorder: AudioRecorder,
    processor: Arc<dyn LectureProcessor>,
    quiz_store: QuizStore,
    exporter: NotesExporter,
    exports_dir: PathBuf,
    event_tx: mpsc::Sender<WorkflowEvent>,
    internal_tx: mpsc::Sender<EngineEvent>,
    internal_rx: Option<mpsc::Receiver<EngineEvent>>,
    in_flight: u32,
}

impl WorkflowEngine {
    /// Create a new engine.
    ///
    /// # Arguments
    ///
    /// * `shared`      — shared workflow state (also read by the frontend).
    /// * `recorder`    — microphone lifecycle manager.
    /// * `processor`   — remote service client (e.g. `ApiProcessor`).
    /// * `quiz_store`  — quiz snapshot destination.
    /// * `exporter`    — study-notes renderer.
    /// * `exports_dir` — default directory for exported documents.
    /// * `event_tx`    — channel the frontend listens on.
    pub fn new(
        shared: SharedState,
        recorder: AudioRecorder,
        processor: Arc<dyn LectureProcessor>,
        quiz_store: QuizStore,
        exporter: NotesExporter,
        exports_dir: PathBuf,
        event_tx: mpsc::Sender<WorkflowEvent>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(16);
        Self {
            machine: WorkflowMachine::new(shared),
            recorder,
            processor,
            quiz_store,
            exporter,
            exports_dir,
            event_tx,
            internal_tx,
            internal_rx: Some(internal_rx),
            in_flight: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the engine until `command_rx` closes and in-flight work drains.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<WorkflowCommand>) {
        let mut internal_rx = self.internal_rx.take().expect("run called once");
        let mut commands_open = true;

        while commands_open || self.in_flight > 0 {
            tokio::select! {
                cmd = command_rx.recv(), if commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => commands_open = false,
                },
                Some(event) = internal_rx.recv(), if self.in_flight > 0 => {
                    self.handle_internal(event).await;
                }
            }
        }

        log::info!("workflow: command channel closed, engine shutting down");
    }

    async fn emit(&self, event: WorkflowEvent) {
        let _ = self.event_tx.send(event).await;
    }

    // -----------------------------------------------------------------------
    // Command handlers
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, command: WorkflowCommand) {
        match command {
            WorkflowCommand::StartRecording => self.start_recording().await,
            WorkflowCommand::StopRecording => self.stop_recording().await,
            WorkflowCommand::Ingest(source) => self.ingest(source).await,
            WorkflowCommand::Retry => self.retry().await,
            WorkflowCommand::Reset => self.reset().await,
            WorkflowCommand::Ask { question } => self.ask(question).await,
            WorkflowCommand::Export { path } => self.export(path).await,
        }
    }

    /// Idle → Capturing: acquire the device and start accumulating chunks.
    async fn start_recording(&mut self) {
        match self.machine.begin_capture() {
            Ok(()) => match self.recorder.start() {
                Ok(()) => {
                    self.emit(WorkflowEvent::RecordingStarted).await;
                    self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Capturing))
                        .await;
                }
                Err(e) => {
                    log::error!("capture failed to start: {e}");
                    self.machine.capture_failed();
                    self.emit(WorkflowEvent::CaptureFailed {
                        message: e.to_string(),
                    })
                    .await;
                    self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Idle))
                        .await;
                }
            },
            Err(e) => {
                self.emit(WorkflowEvent::Rejected {
                    reason: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Capturing → Processing: release the device, finalize and submit.
    async fn stop_recording(&mut self) {
        if !self.recorder.is_recording() {
            self.emit(WorkflowEvent::Rejected {
                reason: "no recording in progress".into(),
            })
            .await;
            return;
        }

        let duration_secs = self.recorder.elapsed_secs();
        match self.recorder.stop() {
            Ok(artifact) => {
                self.machine.set_recording_secs(duration_secs);
                self.emit(WorkflowEvent::RecordingFinished {
                    duration_secs,
                    file_name: artifact.file_name.clone(),
                })
                .await;
                self.submit(Arc::new(artifact)).await;
            }
            Err(e) => {
                // The device is already released; only the artifact is lost.
                log::error!("failed to finalize recording: {e}");
                self.machine.capture_failed();
                self.emit(WorkflowEvent::CaptureFailed {
                    message: e.to_string(),
                })
                .await;
                self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Idle))
                    .await;
            }
        }
    }

    /// Normalize a dropped/browsed/recorded source and submit the artifact.
    async fn ingest(&mut self, source: IngestSource) {
        match self.machine.status() {
            status if status.is_busy() => {
                self.emit(WorkflowEvent::Rejected {
                    reason: "another lecture is already in progress".into(),
                })
                .await;
                return;
            }
            PipelineStatus::Failed => {
                self.emit(WorkflowEvent::Rejected {
                    reason: "acknowledge the failed lecture first (retry or reset)".into(),
                })
                .await;
                return;
            }
            _ => {}
        }

        match ingest::normalize(source) {
            Ok(Some(artifact)) => self.submit(Arc::new(artifact)).await,
            // Non-audio source: no artifact produced, no error surfaced.
            Ok(None) => {}
            Err(e) => {
                self.emit(WorkflowEvent::IngestFailed {
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    /// → Processing: hand the artifact to the machine and spawn the
    /// submission.
    async fn submit(&mut self, artifact: Arc<AudioArtifact>) {
        let file_name = artifact.file_name.clone();
        match self.machine.begin_processing(Arc::clone(&artifact)) {
            Ok(run_id) => {
                self.emit(WorkflowEvent::ProcessingStarted { file_name }).await;
                self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Processing))
                    .await;
                self.spawn_submission(run_id, artifact);
            }
            Err(e) => {
                self.emit(WorkflowEvent::Rejected {
                    reason: e.to_string(),
                })
                .await;
            }
        }
    }

    fn spawn_submission(&mut self, run_id: u64, artifact: Arc<AudioArtifact>) {
        let processor = Arc::clone(&self.processor);
        let internal_tx = self.internal_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = processor.submit_lecture(&artifact).await;
            let _ = internal_tx
                .send(EngineEvent::SubmissionResolved { run_id, outcome })
                .await;
        });
    }

    /// Failed → Processing: resubmit the retained artifact.
    async fn retry(&mut self) {
        match self.machine.retry() {
            Ok((artifact, run_id)) => {
                self.emit(WorkflowEvent::ProcessingStarted {
                    file_name: artifact.file_name.clone(),
                })
                .await;
                self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Processing))
                    .await;
                self.spawn_submission(run_id, artifact);
            }
            Err(e) => {
                self.emit(WorkflowEvent::Rejected {
                    reason: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Failed/Completed → Idle.
    async fn reset(&mut self) {
        self.machine.reset();
        self.emit(WorkflowEvent::StatusChanged(self.machine.status()))
            .await;
    }

    /// Append the question and spawn the query; the answer (or the fallback
    /// message) arrives as a [`EngineEvent::QueryResolved`].
    async fn ask(&mut self, question: String) {
        match self.machine.append_user_question(&question) {
            Ok((run_id, transcript)) => {
                self.emit(WorkflowEvent::ChatUpdated).await;

                let processor = Arc::clone(&self.processor);
                let internal_tx = self.internal_tx.clone();
                self.in_flight += 1;
                tokio::spawn(async move {
                    let outcome = processor.query(&transcript, &question).await;
                    let _ = internal_tx
                        .send(EngineEvent::QueryResolved { run_id, outcome })
                        .await;
                });
            }
            Err(e) => {
                self.emit(WorkflowEvent::Rejected {
                    reason: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Render study notes from the completed result, on demand.
    async fn export(&mut self, path: Option<PathBuf>) {
        let result = match self.machine.result() {
            Some(result) => result,
            None => {
                self.emit(WorkflowEvent::ExportFailed {
                    message: "no completed lecture available".into(),
                })
                .await;
                return;
            }
        };

        let path = path
            .unwrap_or_else(|| self.exports_dir.join(NotesExporter::default_file_name()));

        match self.exporter.export_to(&result, &path) {
            Ok(written) => self.emit(WorkflowEvent::ExportFinished { path: written }).await,
            Err(e) => {
                log::error!("export failed: {e:#}");
                self.emit(WorkflowEvent::ExportFailed {
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Completion handlers
    // -----------------------------------------------------------------------

    async fn handle_internal(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::SubmissionResolved { run_id, outcome } => {
                self.in_flight -= 1;
                match outcome {
                    Ok(result) => {
                        let quiz = result.quiz.clone();
                        if self.machine.submission_succeeded(run_id, result) {
                            // Quiz handoff happens at the moment Completed is
                            // entered; a persistence failure is logged but
                            // does not fail the run.
                            match self.quiz_store.save(&quiz) {
                                Ok(()) => {
                                    self.emit(WorkflowEvent::QuizSaved {
                                        path: self.quiz_store.path().to_path_buf(),
                                    })
                                    .await;
                                }
                                Err(e) => {
                                    log::error!("failed to persist quiz snapshot: {e:#}");
                                }
                            }
                            self.emit(WorkflowEvent::LectureCompleted).await;
                            self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Completed))
                                .await;
                        }
                    }
                    Err(e) => {
                        log::error!("lecture submission failed: {e}");
                        if self
                            .machine
                            .submission_failed(run_id, SUBMISSION_FAILED_MESSAGE.into())
                        {
                            self.emit(WorkflowEvent::SubmissionFailed {
                                message: SUBMISSION_FAILED_MESSAGE.into(),
                            })
                            .await;
                            self.emit(WorkflowEvent::StatusChanged(PipelineStatus::Failed))
                                .await;
                        }
                    }
                }
            }

            EngineEvent::QueryResolved { run_id, outcome } => {
                self.in_flight -= 1;
                let content = match outcome {
                    Ok(answer) => answer,
                    Err(e) => {
                        log::warn!("chat query failed: {e}");
                        FALLBACK_ASSISTANT_MESSAGE.into()
                    }
                };
                if self.machine.append_assistant_answer(run_id, content) {
                    self.emit(WorkflowEvent::ChatUpdated).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

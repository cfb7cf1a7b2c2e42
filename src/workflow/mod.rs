//! Lecture workflow — the finite-state pipeline at the core of the
//! application.
//!
//! # Architecture
//!
//! ```text
//! WorkflowCommand (mpsc)
//!        │
//!        ▼
//! WorkflowEngine::run()  ← async tokio task
//!        │
//!        ├─ StartRecording → AudioRecorder acquires device   [Capturing]
//!        ├─ StopRecording  → artifact finalized, submitted   [Processing]
//!        ├─ Ingest(file)   → artifact normalized, submitted  [Processing]
//!        │        │
//!        │        └─ spawned submit_lecture → EngineEvent
//!        │                 ├─ Ok  → result stored, quiz saved [Completed]
//!        │                 └─ Err → artifact retained         [Failed]
//!        └─ Ask(question)  → spawned query → chat entry appended
//!
//! WorkflowMachine — synchronous transition rules, sole writer of
//! SharedState (Arc<Mutex<WorkflowState>>) ←── read by the frontend
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use lecture_assistant::audio::{AudioRecorder, MicBackend};
//! use lecture_assistant::present::{NotesExporter, QuizStore};
//! use lecture_assistant::remote::{ApiProcessor, LectureProcessor};
//! use lecture_assistant::workflow::{new_shared_state, WorkflowEngine};
//!
//! #[tokio::main]
//! async fn main() {
//!     let shared = new_shared_state();
//!     let (command_tx, command_rx) = mpsc::channel(16);
//!     let (event_tx, _event_rx) = mpsc::channel(32);
//!
//!     let processor: Arc<dyn LectureProcessor> =
//!         Arc::new(ApiProcessor::from_config(&Default::default()));
//!     let engine = WorkflowEngine::new(
//!         shared.clone(),
//!         AudioRecorder::new(Box::new(MicBackend::new(None))),
//!         processor,
//!         QuizStore::new("lecture_quiz.json"),
//!         NotesExporter::new(48),
//!         "exports".into(),
//!         event_tx,
//!     );
//!
//!     tokio::spawn(async move { engine.run(command_rx).await });
//!     // command_tx is handed to the frontend.
//!     # drop(command_tx);
//! }
//! ```

pub mod engine;
pub mod machine;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use engine::{
    WorkflowCommand, WorkflowEngine, WorkflowEvent, FALLBACK_ASSISTANT_MESSAGE,
    SUBMISSION_FAILED_MESSAGE,
};
pub use machine::{WorkflowError, WorkflowMachine};
pub use state::{
    new_shared_state, ChatEntry, ChatRole, Flashcard, LectureResult, PipelineStatus,
    QuizQuestion, SharedState, WorkflowState, CHAT_GREETING,
};

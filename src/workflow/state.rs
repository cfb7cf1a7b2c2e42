//! Workflow status and shared observable state.
//!
//! [`PipelineStatus`] drives the lecture workflow's state machine.  The
//! frontend reads it via [`SharedState`] to render the appropriate view.
//!
//! [`WorkflowState`] is the single source of truth for everything a frontend
//! needs: current pipeline status, the completed [`LectureResult`], the chat
//! transcript, the last recording duration, and any error message.  It is
//! mutated only by the workflow machine.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<WorkflowState>>` — cheap to
//! clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PipelineStatus
// ---------------------------------------------------------------------------

/// States of the lecture workflow.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──requestCapture──▶ Capturing
///      ──artifact ingested─▶ Processing
/// Capturing ──stop + finalize──▶ Processing
///           ──capture error───▶ Idle
/// Processing ──success response──▶ Completed
///            ──error response───▶ Failed
/// Completed ──new ingestion──▶ (implicit) Idle
/// Failed ──user acknowledgment / retry──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Waiting for an audio source — drop, browse or live recording.
    Idle,

    /// Microphone is active; chunks are accumulating in arrival order.
    Capturing,

    /// An artifact has been submitted to the remote service.
    Processing,

    /// A result was received and stored; study material is available.
    Completed,

    /// The submission errored.  The artifact is retained so the user can
    /// retry without re-recording.
    Failed,
}

impl PipelineStatus {
    /// Returns `true` while the pipeline cannot accept a new ingestion.
    ///
    /// ```
    /// use lecture_assistant::workflow::PipelineStatus;
    ///
    /// assert!(!PipelineStatus::Idle.is_busy());
    /// assert!(PipelineStatus::Capturing.is_busy());
    /// assert!(PipelineStatus::Processing.is_busy());
    /// assert!(!PipelineStatus::Completed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineStatus::Capturing | PipelineStatus::Processing)
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStatus::Idle => "Idle",
            PipelineStatus::Capturing => "Recording",
            PipelineStatus::Processing => "Processing",
            PipelineStatus::Completed => "Completed",
            PipelineStatus::Failed => "Failed",
        }
    }
}

impl Default for PipelineStatus {
    fn default() -> Self {
        PipelineStatus::Idle
    }
}

// ---------------------------------------------------------------------------
// LectureResult and its parts
// ---------------------------------------------------------------------------

/// One flashcard, as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Question side.
    pub q: String,
    /// Answer side.
    pub a: String,
}

/// One multiple-choice quiz question.
///
/// `options` is a fixed four-way choice; `answer` is the index of the correct
/// option.  The fixed-size array makes response decoding all-or-nothing: a
/// question with the wrong number of options fails the whole decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    pub answer: usize,
}

/// The study material derived from one lecture.
///
/// Created once per successful pipeline run, immutable thereafter, and
/// superseded (not merged) by the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureResult {
    /// Full transcript text.
    pub transcript: String,
    /// Ordered summary bullets.
    pub summary: Vec<String>,
    /// Ordered flashcards.
    pub flashcards: Vec<Flashcard>,
    /// Ordered quiz questions, handed off to the quiz view on completion.
    pub quiz: Vec<QuizQuestion>,
}

// ---------------------------------------------------------------------------
// Chat transcript
// ---------------------------------------------------------------------------

/// Author of a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the per-lecture chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    /// A user question.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant answer.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Greeting entry the chat transcript is (re)seeded with for every completed
/// lecture.
pub const CHAT_GREETING: &str =
    "Hi! I am your lecture assistant. Ask me anything about this lecture.";

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Shared observable workflow state — the single source of truth for the
/// frontend.
///
/// Held behind [`SharedState`] (`Arc<Mutex<WorkflowState>>`).  The workflow
/// machine mutates it; frontends only read.
#[derive(Debug, Default)]
pub struct WorkflowState {
    /// Current pipeline status.
    pub status: PipelineStatus,

    /// Result of the most recent successful run.
    ///
    /// `None` until a run completes; replaced wholesale by the next run.
    pub result: Option<Arc<LectureResult>>,

    /// Append-only chat transcript scoped to `result`.
    ///
    /// Reset to the greeting entry whenever a new lecture enters Processing.
    pub chat: Vec<ChatEntry>,

    /// Duration of the last finished recording, in whole seconds.
    pub recording_secs: u64,

    /// Error message to display when `status == PipelineStatus::Failed`.
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`WorkflowState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<WorkflowState>>;

/// Construct a new [`SharedState`] wrapping a default [`WorkflowState`].
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(WorkflowState::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Synchronous transition core of the lecture workflow.
//!
//! [`WorkflowMachine`] is the only writer of [`PipelineStatus`] and of the
//! shared [`WorkflowState`].  Every external event — artifact ingested,
//! submission resolved, query resolved — is applied through one of its
//! methods, each of which either performs a defined transition or rejects
//! the attempt without touching state.  The async engine owns a machine and
//! feeds it messages; the machine itself has no async code, so every
//! transition rule is unit-testable without a runtime.
//!
//! Completions are tagged with a run id.  A completion whose run id no
//! longer matches (the machine has moved on, e.g. after a reset) is
//! discarded — in-flight work is never cancelled, only ignored.

use std::sync::Arc;

use thiserror::Error;

use crate::audio::AudioArtifact;
use crate::workflow::state::{
    ChatEntry, LectureResult, PipelineStatus, SharedState, CHAT_GREETING,
};

// ---------------------------------------------------------------------------
// WorkflowError
// ---------------------------------------------------------------------------

/// Rejection outcomes of transition attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Ingestion or capture attempted while a run is in progress.
    #[error("another lecture is already in progress")]
    PipelineBusy,

    /// A chat query or export was attempted with no completed lecture.
    #[error("no completed lecture available")]
    NoResult,

    /// Retry requested outside the Failed state or with no retained artifact.
    #[error("nothing to retry")]
    NothingToRetry,
}

// ---------------------------------------------------------------------------
// WorkflowMachine
// ---------------------------------------------------------------------------

/// Owns the pipeline status, the current run's artifact and the run counter.
///
/// The shared state handle is the machine's public face: frontends read it,
/// the machine writes it.
pub struct WorkflowMachine {
    shared: SharedState,
    /// Artifact of the current run.  Held from ingestion until the
    /// submission succeeds (released) or is abandoned after a failure;
    /// retained across Failed so a retry needs no re-recording.
    artifact: Option<Arc<AudioArtifact>>,
    /// Increments whenever a submission begins; stale completions are
    /// recognized by a mismatched id.
    run_id: u64,
}

impl WorkflowMachine {
    /// Create a machine writing to `shared`.
    pub fn new(shared: SharedState) -> Self {
        Self {
            shared,
            artifact: None,
            run_id: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current pipeline status.
    pub fn status(&self) -> PipelineStatus {
        self.shared.lock().unwrap().status
    }

    /// Result of the most recent completed run, if any.
    pub fn result(&self) -> Option<Arc<LectureResult>> {
        self.shared.lock().unwrap().result.clone()
    }

    /// The artifact currently held by the machine (in flight or retained for
    /// retry).
    pub fn artifact(&self) -> Option<Arc<AudioArtifact>> {
        self.artifact.clone()
    }

    /// Record the duration of the last finished recording.
    pub fn set_recording_secs(&mut self, secs: u64) {
        self.shared.lock().unwrap().recording_secs = secs;
    }

    // -----------------------------------------------------------------------
    // Capture transitions
    // -----------------------------------------------------------------------

    /// Idle/Completed → Capturing.
    ///
    /// From Completed this is the implicit reset-on-new-ingestion.  Rejected
    /// with [`WorkflowError::PipelineBusy`] while Capturing or Processing,
    /// and while Failed (leaving Failed requires an explicit acknowledgment
    /// or retry).
    pub fn begin_capture(&mut self) -> Result<(), WorkflowError> {
        let mut state = self.shared.lock().unwrap();
        match state.status {
            PipelineStatus::Idle | PipelineStatus::Completed => {
                state.status = PipelineStatus::Capturing;
                Ok(())
            }
            _ => Err(WorkflowError::PipelineBusy),
        }
    }

    /// Capturing → Idle, after a capture error or a failed finalization.
    pub fn capture_failed(&mut self) {
        let mut state = self.shared.lock().unwrap();
        if state.status == PipelineStatus::Capturing {
            state.status = PipelineStatus::Idle;
        }
    }

    // -----------------------------------------------------------------------
    // Submission transitions
    // -----------------------------------------------------------------------

    /// Idle/Capturing/Completed → Processing.
    ///
    /// Entering Processing discards the prior result and resets the chat
    /// transcript to the greeting — a new run fully supersedes the old.
    /// Returns the run id to tag the submission's completion with.
    ///
    /// Rejected with [`WorkflowError::PipelineBusy`] while Processing
    /// (at most one artifact in flight) and while Failed.
    pub fn begin_processing(&mut self, artifact: Arc<AudioArtifact>) -> Result<u64, WorkflowError> {
        let mut state = self.shared.lock().unwrap();
        match state.status {
            PipelineStatus::Idle | PipelineStatus::Capturing | PipelineStatus::Completed => {
                state.status = PipelineStatus::Processing;
                state.result = None;
                state.chat = vec![ChatEntry::assistant(CHAT_GREETING)];
                state.error_message = None;
                drop(state);

                self.artifact = Some(artifact);
                self.run_id += 1;
                Ok(self.run_id)
            }
            _ => Err(WorkflowError::PipelineBusy),
        }
    }

    /// Processing → Completed.  Releases the artifact.
    ///
    /// Returns `false` (state untouched) when `run_id` is stale or the
    /// machine is not Processing — the completion belongs to a run that was
    /// superseded, so its result is discarded.
    pub fn submission_succeeded(&mut self, run_id: u64, result: LectureResult) -> bool {
        if run_id != self.run_id {
            log::debug!("discarding stale submission result (run {run_id})");
            return false;
        }
        let mut state = self.shared.lock().unwrap();
        if state.status != PipelineStatus::Processing {
            return false;
        }
        state.status = PipelineStatus::Completed;
        state.result = Some(Arc::new(result));
        state.error_message = None;
        drop(state);

        self.artifact = None;
        true
    }

    /// Processing → Failed.  The artifact is retained for retry.
    ///
    /// Returns `false` when `run_id` is stale or the machine is not
    /// Processing.
    pub fn submission_failed(&mut self, run_id: u64, message: String) -> bool {
        if run_id != self.run_id {
            log::debug!("discarding stale submission error (run {run_id})");
            return false;
        }
        let mut state = self.shared.lock().unwrap();
        if state.status != PipelineStatus::Processing {
            return false;
        }
        state.status = PipelineStatus::Failed;
        state.error_message = Some(message);
        true
    }

    /// Failed → Processing, reusing the retained artifact.
    ///
    /// Returns the artifact and the new run id so the engine can resubmit.
    pub fn retry(&mut self) -> Result<(Arc<AudioArtifact>, u64), WorkflowError> {
        {
            let state = self.shared.lock().unwrap();
            if state.status != PipelineStatus::Failed {
                return Err(WorkflowError::NothingToRetry);
            }
        }
        let artifact = self
            .artifact
            .clone()
            .ok_or(WorkflowError::NothingToRetry)?;

        let mut state = self.shared.lock().unwrap();
        state.status = PipelineStatus::Processing;
        state.error_message = None;
        drop(state);

        self.run_id += 1;
        Ok((artifact, self.run_id))
    }

    /// Failed/Completed → Idle, on user acknowledgment.
    ///
    /// Abandoning a failed run releases the retained artifact.  The stored
    /// result (if any) stays readable until the next run supersedes it.
    pub fn reset(&mut self) {
        let mut state = self.shared.lock().unwrap();
        match state.status {
            PipelineStatus::Failed | PipelineStatus::Completed | PipelineStatus::Idle => {
                state.status = PipelineStatus::Idle;
                state.error_message = None;
                drop(state);
                self.artifact = None;
            }
            _ => {
                log::debug!("ignoring reset while {:?}", state.status);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Chat transitions
    // -----------------------------------------------------------------------

    /// Append a user question and return the context a query task needs.
    ///
    /// Requires a completed lecture; returns the current run id (to tag the
    /// answer with) and the transcript to send alongside the question.
    pub fn append_user_question(
        &mut self,
        question: &str,
    ) -> Result<(u64, String), WorkflowError> {
        let mut state = self.shared.lock().unwrap();
        if state.status != PipelineStatus::Completed {
            return Err(WorkflowError::NoResult);
        }
        let transcript = match &state.result {
            Some(result) => result.transcript.clone(),
            None => return Err(WorkflowError::NoResult),
        };
        state.chat.push(ChatEntry::user(question));
        Ok((self.run_id, transcript))
    }

    /// Append an assistant answer for run `run_id`.
    ///
    /// Returns `false` (entry dropped) when a new run has superseded the one
    /// the question was asked against.  Never alters the pipeline status.
    pub fn append_assistant_answer(&mut self, run_id: u64, content: String) -> bool {
        if run_id != self.run_id {
            log::debug!("discarding stale chat answer (run {run_id})");
            return false;
        }
        self.shared
            .lock()
            .unwrap()
            .chat
            .push(ChatEntry::assistant(content));
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::{new_shared_state, ChatRole, Flashcard, QuizQuestion};

    fn test_artifact() -> Arc<AudioArtifact> {
        Arc::new(AudioArtifact {
            bytes: vec![0_u8; 12_000],
            media_type: "audio/wav".into(),
            file_name: "recording_1.wav".into(),
        })
    }

    fn test_result() -> LectureResult {
        LectureResult {
            transcript: "t".into(),
            summary: vec!["a".into(), "b".into()],
            flashcards: vec![Flashcard {
                q: "Q1".into(),
                a: "A1".into(),
            }],
            quiz: vec![QuizQuestion {
                question: "Q".into(),
                options: ["1".into(), "2".into(), "3".into(), "4".into()],
                answer: 0,
            }],
        }
    }

    fn machine() -> (WorkflowMachine, SharedState) {
        let shared = new_shared_state();
        (WorkflowMachine::new(Arc::clone(&shared)), shared)
    }

    // ---- Capture transitions ----------------------------------------------

    #[test]
    fn begin_capture_from_idle() {
        let (mut m, _) = machine();
        m.begin_capture().unwrap();
        assert_eq!(m.status(), PipelineStatus::Capturing);
    }

    #[test]
    fn begin_capture_while_capturing_is_busy() {
        let (mut m, _) = machine();
        m.begin_capture().unwrap();
        assert_eq!(m.begin_capture(), Err(WorkflowError::PipelineBusy));
        assert_eq!(m.status(), PipelineStatus::Capturing);
    }

    #[test]
    fn capture_failure_returns_to_idle() {
        let (mut m, _) = machine();
        m.begin_capture().unwrap();
        m.capture_failed();
        assert_eq!(m.status(), PipelineStatus::Idle);
    }

    // ---- Processing transitions -------------------------------------------

    #[test]
    fn begin_processing_from_idle_and_from_capturing() {
        let (mut m, _) = machine();
        m.begin_processing(test_artifact()).unwrap();
        assert_eq!(m.status(), PipelineStatus::Processing);

        let (mut m2, _) = machine();
        m2.begin_capture().unwrap();
        m2.begin_processing(test_artifact()).unwrap();
        assert_eq!(m2.status(), PipelineStatus::Processing);
    }

    #[test]
    fn ingestion_while_processing_is_rejected_without_state_change() {
        let (mut m, _) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();

        let err = m.begin_processing(test_artifact()).unwrap_err();
        assert_eq!(err, WorkflowError::PipelineBusy);
        assert_eq!(m.status(), PipelineStatus::Processing);

        // The original run is still the live one.
        assert!(m.submission_succeeded(run, test_result()));
    }

    #[test]
    fn entering_processing_discards_prior_result_and_chat() {
        let (mut m, shared) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();
        m.submission_succeeded(run, test_result());
        m.append_user_question("what?").unwrap();
        assert_eq!(shared.lock().unwrap().chat.len(), 2);

        m.begin_processing(test_artifact()).unwrap();

        let state = shared.lock().unwrap();
        assert!(state.result.is_none());
        assert_eq!(state.chat.len(), 1);
        assert_eq!(state.chat[0].role, ChatRole::Assistant);
        assert_eq!(state.chat[0].content, CHAT_GREETING);
    }

    // ---- Success path ------------------------------------------------------

    #[test]
    fn success_transitions_exactly_once_with_round_trip_identity() {
        let (mut m, _) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();

        assert!(m.submission_succeeded(run, test_result()));
        assert_eq!(m.status(), PipelineStatus::Completed);
        assert_eq!(*m.result().unwrap(), test_result());
        assert!(m.artifact().is_none(), "artifact released on success");

        // A duplicate completion for the same run is ignored.
        assert!(!m.submission_succeeded(run, test_result()));
        assert_eq!(m.status(), PipelineStatus::Completed);
    }

    #[test]
    fn stale_success_after_reset_is_discarded() {
        let (mut m, _) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();
        m.submission_failed(run, "boom".into());
        m.reset();

        assert!(!m.submission_succeeded(run, test_result()));
        assert_eq!(m.status(), PipelineStatus::Idle);
        assert!(m.result().is_none());
    }

    #[test]
    fn stale_success_after_supersede_is_discarded() {
        let (mut m, _) = machine();
        let first = m.begin_processing(test_artifact()).unwrap();
        m.submission_succeeded(first, test_result());

        let second = m.begin_processing(test_artifact()).unwrap();
        assert!(!m.submission_succeeded(first, test_result()));
        assert!(m.submission_succeeded(second, test_result()));
    }

    // ---- Failure path ------------------------------------------------------

    #[test]
    fn failure_retains_artifact_for_retry() {
        let (mut m, shared) = machine();
        let artifact = test_artifact();
        let run = m.begin_processing(Arc::clone(&artifact)).unwrap();

        assert!(m.submission_failed(run, "service unreachable".into()));
        assert_eq!(m.status(), PipelineStatus::Failed);
        assert_eq!(m.artifact().unwrap(), artifact);
        assert_eq!(
            shared.lock().unwrap().error_message.as_deref(),
            Some("service unreachable")
        );
    }

    #[test]
    fn retry_resubmits_the_retained_artifact() {
        let (mut m, _) = machine();
        let artifact = test_artifact();
        let run = m.begin_processing(Arc::clone(&artifact)).unwrap();
        m.submission_failed(run, "boom".into());

        let (retried, new_run) = m.retry().unwrap();
        assert_eq!(retried, artifact);
        assert_ne!(new_run, run);
        assert_eq!(m.status(), PipelineStatus::Processing);

        assert!(m.submission_succeeded(new_run, test_result()));
        assert_eq!(m.status(), PipelineStatus::Completed);
    }

    #[test]
    fn retry_outside_failed_is_rejected() {
        let (mut m, _) = machine();
        assert_eq!(m.retry(), Err(WorkflowError::NothingToRetry));
    }

    #[test]
    fn reset_from_failed_releases_artifact() {
        let (mut m, _) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();
        m.submission_failed(run, "boom".into());

        m.reset();
        assert_eq!(m.status(), PipelineStatus::Idle);
        assert!(m.artifact().is_none(), "abandoned artifact released");
    }

    #[test]
    fn reset_while_processing_is_ignored() {
        let (mut m, _) = machine();
        m.begin_processing(test_artifact()).unwrap();
        m.reset();
        assert_eq!(m.status(), PipelineStatus::Processing);
    }

    // ---- Chat --------------------------------------------------------------

    #[test]
    fn question_requires_completed_lecture() {
        let (mut m, _) = machine();
        assert_eq!(
            m.append_user_question("hi").unwrap_err(),
            WorkflowError::NoResult
        );
    }

    #[test]
    fn question_and_answer_append_in_order() {
        let (mut m, shared) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();
        m.submission_succeeded(run, test_result());

        let (chat_run, transcript) = m.append_user_question("what is this about?").unwrap();
        assert_eq!(transcript, "t");
        assert!(m.append_assistant_answer(chat_run, "transformers".into()));
        assert_eq!(m.status(), PipelineStatus::Completed);

        let state = shared.lock().unwrap();
        let roles: Vec<ChatRole> = state.chat.iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
        assert_eq!(state.chat[1].content, "what is this about?");
        assert_eq!(state.chat[2].content, "transformers");
    }

    #[test]
    fn stale_answer_is_dropped_after_new_run() {
        let (mut m, shared) = machine();
        let run = m.begin_processing(test_artifact()).unwrap();
        m.submission_succeeded(run, test_result());
        let (chat_run, _) = m.append_user_question("q").unwrap();

        // A new lecture supersedes the old chat before the answer lands.
        m.begin_processing(test_artifact()).unwrap();

        assert!(!m.append_assistant_answer(chat_run, "late".into()));
        let state = shared.lock().unwrap();
        assert_eq!(state.chat.len(), 1, "only the greeting remains");
    }
}

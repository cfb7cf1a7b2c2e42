//! Result presentation adapter — read-only consumers of a completed lecture.
//!
//! The workflow holds the completed [`crate::workflow::LectureResult`] behind
//! an `Arc`; the consumers here read it without mutating it:
//!
//! * [`QuizStore`] — serialized quiz handoff to the quiz view, written once
//!   on completion, with an explicit demo fallback.
//! * [`NotesExporter`] — paginated study-notes document, rendered on demand.
//!
//! Chat display is the third consumer; it reads the chat transcript straight
//! from the shared workflow state.

pub mod export;
pub mod quiz;

pub use export::NotesExporter;
pub use quiz::{demo_quiz, QuizHandoff, QuizSource, QuizStore};

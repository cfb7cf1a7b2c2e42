//! Quiz handoff — snapshot persistence between the workflow and the quiz
//! view.
//!
//! The workflow writes a single serialized snapshot of the quiz sequence at
//! the moment a run completes; the quiz view reads it once when it
//! initializes.  When no snapshot exists the view gets a built-in demo quiz
//! of three fixed questions, and the [`QuizSource`] tag makes that explicit
//! so callers always know whether they hold real or placeholder content.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::workflow::QuizQuestion;

// ---------------------------------------------------------------------------
// QuizSource / QuizHandoff
// ---------------------------------------------------------------------------

/// Where the quiz content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizSource {
    /// Derived from a processed lecture.
    Processed,
    /// Built-in placeholder content; no lecture has been processed.
    Demo,
}

/// The quiz content handed to the quiz view, tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizHandoff {
    pub source: QuizSource,
    pub questions: Vec<QuizQuestion>,
}

impl QuizHandoff {
    /// Tally the score for `answers`, where `answers[i]` is the option index
    /// picked for question `i`.  Extra or missing answers score nothing.
    pub fn score(&self, answers: &[usize]) -> usize {
        self.questions
            .iter()
            .zip(answers)
            .filter(|(question, picked)| question.answer == **picked)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Demo quiz
// ---------------------------------------------------------------------------

/// The placeholder quiz shown before any lecture has been processed.
pub fn demo_quiz() -> Vec<QuizQuestion> {
    vec![
        QuizQuestion {
            question: "What technology revolutionized Natural Language Processing (NLP)?"
                .into(),
            options: [
                "RNNs".into(),
                "LSTMs".into(),
                "Transformer models".into(),
                "Markov Chains".into(),
            ],
            answer: 2,
        },
        QuizQuestion {
            question: "What is considered the 'next big thing' in AI software development?"
                .into(),
            options: [
                "Static websites".into(),
                "Agentic workflows".into(),
                "Manual testing".into(),
                "Desktop applications".into(),
            ],
            answer: 1,
        },
        QuizQuestion {
            question: "Why are evaluation frameworks necessary in AI?".into(),
            options: [
                "To make them slower".into(),
                "To increase costs".into(),
                "To ensure robustness and ethics".into(),
                "To bypass laws".into(),
            ],
            answer: 2,
        },
    ]
}

// ---------------------------------------------------------------------------
// QuizStore
// ---------------------------------------------------------------------------

/// JSON snapshot store for the quiz handoff.
pub struct QuizStore {
    path: PathBuf,
}

impl QuizStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the quiz snapshot, creating parent directories as needed.
    ///
    /// Called once per completed pipeline run; a new run overwrites the
    /// previous snapshot wholesale.
    pub fn save(&self, quiz: &[QuizQuestion]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(quiz)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Read the snapshot, falling back to the demo quiz when it is missing
    /// or unreadable.
    pub fn load(&self) -> QuizHandoff {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<QuizQuestion>>(&content) {
                Ok(questions) if !questions.is_empty() => QuizHandoff {
                    source: QuizSource::Processed,
                    questions,
                },
                Ok(_) => QuizHandoff {
                    source: QuizSource::Demo,
                    questions: demo_quiz(),
                },
                Err(e) => {
                    log::warn!(
                        "quiz snapshot at {} is unreadable ({e}); using demo quiz",
                        self.path.display()
                    );
                    QuizHandoff {
                        source: QuizSource::Demo,
                        questions: demo_quiz(),
                    }
                }
            },
            Err(_) => QuizHandoff {
                source: QuizSource::Demo,
                questions: demo_quiz(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

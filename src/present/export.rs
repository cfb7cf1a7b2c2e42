//! Study-notes export — renders a completed lecture as a paginated text
//! document.
//!
//! The document mirrors the review screen: a title header, the transcript,
//! the summary bullets, then the flashcards as Q/A pairs.  Pagination is
//! driven by a fixed lines-per-page threshold; when a section would run past
//! it, a form-feed page break is inserted and the line counter restarts.
//! The quiz is not exported — it is handed to the quiz view instead.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::workflow::LectureResult;

/// Form feed, the page separator understood by plain-text printers and
/// pagers.
const PAGE_BREAK: char = '\u{c}';

// ---------------------------------------------------------------------------
// NotesExporter
// ---------------------------------------------------------------------------

/// Renders and writes study-notes documents.
pub struct NotesExporter {
    lines_per_page: usize,
}

impl NotesExporter {
    /// Create an exporter breaking pages every `lines_per_page` lines.
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }

    /// Default filename for an export started now.
    pub fn default_file_name() -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("lecture_notes_{ts}.txt")
    }

    /// Render `result` into the paginated document text.
    ///
    /// Reads the result lazily and never mutates it.
    pub fn render(&self, result: &LectureResult) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("Lecture Notes".into());
        lines.push("=============".into());
        lines.push(String::new());

        lines.push("Transcript".into());
        lines.push("----------".into());
        for line in result.transcript.lines() {
            lines.push(line.to_string());
        }
        lines.push(String::new());

        lines.push("Summary".into());
        lines.push("-------".into());
        for item in &result.summary {
            lines.push(format!("- {item}"));
        }
        lines.push(String::new());

        lines.push("Flashcards".into());
        lines.push("----------".into());
        for card in &result.flashcards {
            lines.push(format!("Q: {}", card.q));
            lines.push(format!("A: {}", card.a));
            lines.push(String::new());
        }

        self.paginate(&lines)
    }

    /// Join `lines`, inserting a page break whenever the per-page line count
    /// reaches the threshold.
    fn paginate(&self, lines: &[String]) -> String {
        let mut out = String::new();
        let mut line_on_page = 0;

        for line in lines {
            if line_on_page == self.lines_per_page {
                out.push(PAGE_BREAK);
                line_on_page = 0;
            }
            out.push_str(line);
            out.push('\n');
            line_on_page += 1;
        }
        out
    }

    /// Render `result` and write it to `path`, creating parent directories
    /// as needed.  Returns the path written.
    pub fn export_to(&self, result: &LectureResult, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(result))?;
        log::info!("exported study notes to {}", path.display());
        Ok(path.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Flashcard;
    use tempfile::tempdir;

    fn sample_result() -> LectureResult {
        LectureResult {
            transcript: "First line.\nSecond line.".into(),
            summary: vec!["point one".into(), "point two".into()],
            flashcards: vec![
                Flashcard {
                    q: "What?".into(),
                    a: "That.".into(),
                },
                Flashcard {
                    q: "Why?".into(),
                    a: "Because.".into(),
                },
            ],
            quiz: vec![],
        }
    }

    // ---- Document structure ------------------------------------------------

    #[test]
    fn sections_appear_in_order() {
        let doc = NotesExporter::new(100).render(&sample_result());

        let transcript = doc.find("Transcript").unwrap();
        let summary = doc.find("Summary").unwrap();
        let flashcards = doc.find("Flashcards").unwrap();

        assert!(doc.starts_with("Lecture Notes"));
        assert!(transcript < summary);
        assert!(summary < flashcards);
    }

    #[test]
    fn transcript_lines_are_preserved() {
        let doc = NotesExporter::new(100).render(&sample_result());
        assert!(doc.contains("First line.\nSecond line.\n"));
    }

    #[test]
    fn summary_items_become_bullets() {
        let doc = NotesExporter::new(100).render(&sample_result());
        assert!(doc.contains("- point one\n"));
        assert!(doc.contains("- point two\n"));
    }

    #[test]
    fn flashcards_become_question_answer_pairs() {
        let doc = NotesExporter::new(100).render(&sample_result());
        assert!(doc.contains("Q: What?\nA: That.\n"));
        assert!(doc.contains("Q: Why?\nA: Because.\n"));
    }

    // ---- Pagination --------------------------------------------------------

    #[test]
    fn page_breaks_at_the_line_threshold() {
        let doc = NotesExporter::new(5).render(&sample_result());
        let total_lines = doc.lines().count();
        let breaks = doc.matches(PAGE_BREAK).count();

        // Every full page of 5 lines after the first triggers one break.
        assert_eq!(breaks, (total_lines - 1) / 5);
    }

    #[test]
    fn no_page_break_when_document_fits_one_page() {
        let doc = NotesExporter::new(1_000).render(&sample_result());
        assert_eq!(doc.matches(PAGE_BREAK).count(), 0);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        // A zero threshold would break on every line forever; it clamps to 1.
        let doc = NotesExporter::new(0).render(&sample_result());
        assert!(!doc.is_empty());
    }

    // ---- File output -------------------------------------------------------

    #[test]
    fn export_writes_the_rendered_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes").join("lecture.txt");
        let exporter = NotesExporter::new(48);

        let written = exporter.export_to(&sample_result(), &path).expect("export");

        assert_eq!(written, path);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, exporter.render(&sample_result()));
    }

    #[test]
    fn default_file_name_is_timestamped_txt() {
        let name = NotesExporter::default_file_name();
        assert!(name.starts_with("lecture_notes_"));
        assert!(name.ends_with(".txt"));
    }
}

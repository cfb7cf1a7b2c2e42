//! Terminal frontend for the lecture assistant.
//!
//! # Architecture
//!
//! [`App`] is the presentation layer.  It owns two channel endpoints:
//!
//! * `command_tx` — sends [`WorkflowCommand`] to the workflow engine.
//! * `event_rx`  — receives [`WorkflowEvent`] from the engine.
//!
//! It parses one command per input line, renders engine events as they
//! arrive, and reads the shared workflow state for on-demand views (status,
//! chat transcript, results).  All pipeline correctness lives in the engine;
//! the app only translates between the user and the channels, so the state
//! machine can be exercised without it.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::audio::format_duration;
use crate::ingest::IngestSource;
use crate::present::{QuizSource, QuizStore};
use crate::workflow::{SharedState, WorkflowCommand, WorkflowEvent};

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// One parsed line of user input.
#[derive(Debug)]
enum Input {
    /// Forward to the workflow engine.
    Workflow(WorkflowCommand),
    /// Print the quiz handoff.
    ShowQuiz,
    /// Print the chat transcript.
    ShowChat,
    /// Print the pipeline status.
    ShowStatus,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Parse one input line into an [`Input`].
fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };

    match verb {
        "record" => Input::Workflow(WorkflowCommand::StartRecording),
        "stop" => Input::Workflow(WorkflowCommand::StopRecording),
        "open" if !rest.is_empty() => Input::Workflow(WorkflowCommand::Ingest(
            IngestSource::Browsed { path: rest.into() },
        )),
        "retry" => Input::Workflow(WorkflowCommand::Retry),
        "reset" => Input::Workflow(WorkflowCommand::Reset),
        "ask" if !rest.is_empty() => Input::Workflow(WorkflowCommand::Ask {
            question: rest.to_string(),
        }),
        "export" => Input::Workflow(WorkflowCommand::Export {
            path: (!rest.is_empty()).then(|| rest.into()),
        }),
        "quiz" => Input::ShowQuiz,
        "chat" => Input::ShowChat,
        "status" => Input::ShowStatus,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

const HELP: &str = "\
commands:
  record            start a live recording
  stop              stop recording and process the lecture
  open <path>       process an audio file (mp3, wav, m4a, ...)
  ask <question>    ask about the completed lecture
  export [path]     write study notes to a file
  quiz              show the quiz for the last lecture
  chat              show the chat transcript
  retry             resubmit after a failure
  reset             acknowledge a failure and return to idle
  status            show the pipeline status
  quit              exit";

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Line-oriented frontend over the workflow channels.
pub struct App {
    command_tx: mpsc::Sender<WorkflowCommand>,
    event_rx: Option<mpsc::Receiver<WorkflowEvent>>,
    shared: SharedState,
    quiz_store: QuizStore,
}

impl App {
    /// Create a new [`App`].
    ///
    /// * `command_tx` — sender end of the workflow command channel.
    /// * `event_rx`   — receiver end of the workflow event channel.
    /// * `shared`     — shared workflow state (read-only here).
    /// * `quiz_store` — quiz snapshot reader for the `quiz` view.
    pub fn new(
        command_tx: mpsc::Sender<WorkflowCommand>,
        event_rx: mpsc::Receiver<WorkflowEvent>,
        shared: SharedState,
        quiz_store: QuizStore,
    ) -> Self {
        Self {
            command_tx,
            event_rx: Some(event_rx),
            shared,
            quiz_store,
        }
    }

    /// Run until the user quits or stdin closes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("lecture-assistant — type 'help' for commands");

        let mut event_rx = self.event_rx.take().expect("run called once");
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle_input(parse_input(&line)).await {
                        break;
                    }
                }
                Some(event) = event_rx.recv() => {
                    self.render_event(event);
                }
            }
        }

        Ok(())
    }

    /// Dispatch one parsed input; returns `false` to quit.
    async fn handle_input(&mut self, input: Input) -> bool {
        match input {
            Input::Workflow(command) => {
                if self.command_tx.send(command).await.is_err() {
                    println!("workflow engine is gone; exiting");
                    return false;
                }
            }
            Input::ShowQuiz => self.show_quiz(),
            Input::ShowChat => self.show_chat(),
            Input::ShowStatus => {
                println!("status: {}", self.shared.lock().unwrap().status.label());
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => return false,
            Input::Empty => {}
            Input::Unknown(line) => {
                println!("unknown command: {line} (try 'help')");
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn render_event(&self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::StatusChanged(_) => {}
            WorkflowEvent::RecordingStarted => {
                println!("recording... type 'stop' to finish");
            }
            WorkflowEvent::RecordingFinished {
                duration_secs,
                file_name,
            } => {
                println!(
                    "recorded {} as {file_name}",
                    format_duration(duration_secs)
                );
            }
            WorkflowEvent::CaptureFailed { message } => {
                println!("could not record: {message}");
            }
            WorkflowEvent::ProcessingStarted { file_name } => {
                println!("processing {file_name}...");
            }
            WorkflowEvent::LectureCompleted => self.show_result(),
            WorkflowEvent::SubmissionFailed { message } => {
                println!("{message} ('retry' to resubmit, 'reset' to discard)");
            }
            WorkflowEvent::Rejected { reason } => {
                println!("{reason}");
            }
            WorkflowEvent::IngestFailed { message } => {
                println!("{message}");
            }
            WorkflowEvent::ChatUpdated => {
                let state = self.shared.lock().unwrap();
                if let Some(entry) = state.chat.last() {
                    println!("[{:?}] {}", entry.role, entry.content);
                }
            }
            WorkflowEvent::QuizSaved { .. } => {
                println!("quiz ready — type 'quiz' to see it");
            }
            WorkflowEvent::ExportFinished { path } => {
                println!("study notes written to {}", path.display());
            }
            WorkflowEvent::ExportFailed { message } => {
                println!("export failed: {message}");
            }
        }
    }

    /// Print the completed lecture's study material.
    fn show_result(&self) {
        let state = self.shared.lock().unwrap();
        let Some(result) = &state.result else { return };

        println!("\n== Transcript ==\n{}", result.transcript);

        println!("\n== Summary ==");
        for item in &result.summary {
            println!("- {item}");
        }

        println!("\n== Flashcards ==");
        for card in &result.flashcards {
            println!("Q: {}", card.q);
            println!("A: {}", card.a);
        }

        println!("\n'ask <question>' to chat, 'export' for notes, 'quiz' to practice");
    }

    fn show_quiz(&self) {
        let handoff = self.quiz_store.load();
        if handoff.source == QuizSource::Demo {
            println!("(demo quiz — process a lecture to generate a real one)");
        }
        for (i, question) in handoff.questions.iter().enumerate() {
            println!("{}. {}", i + 1, question.question);
            for (j, option) in question.options.iter().enumerate() {
                let letter = (b'A' + j as u8) as char;
                println!("   {letter}. {option}");
            }
        }
    }

    fn show_chat(&self) {
        let state = self.shared.lock().unwrap();
        if state.chat.is_empty() {
            println!("no chat yet — process a lecture first");
            return;
        }
        for entry in &state.chat {
            println!("[{:?}] {}", entry.role, entry.content);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- parse_input -------------------------------------------------------

    #[test]
    fn parses_record_and_stop() {
        assert!(matches!(
            parse_input("record"),
            Input::Workflow(WorkflowCommand::StartRecording)
        ));
        assert!(matches!(
            parse_input("stop"),
            Input::Workflow(WorkflowCommand::StopRecording)
        ));
    }

    #[test]
    fn parses_open_with_path() {
        match parse_input("open  lecture.mp3") {
            Input::Workflow(WorkflowCommand::Ingest(IngestSource::Browsed { path })) => {
                assert_eq!(path, std::path::PathBuf::from("lecture.mp3"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn open_without_path_is_unknown() {
        assert!(matches!(parse_input("open"), Input::Unknown(_)));
    }

    #[test]
    fn parses_ask_with_question() {
        match parse_input("ask what is a transformer?") {
            Input::Workflow(WorkflowCommand::Ask { question }) => {
                assert_eq!(question, "what is a transformer?");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_export_with_and_without_path() {
        assert!(matches!(
            parse_input("export"),
            Input::Workflow(WorkflowCommand::Export { path: None })
        ));
        match parse_input("export notes.txt") {
            Input::Workflow(WorkflowCommand::Export { path: Some(path) }) => {
                assert_eq!(path, std::path::PathBuf::from("notes.txt"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_views_and_quit() {
        assert!(matches!(parse_input("quiz"), Input::ShowQuiz));
        assert!(matches!(parse_input("chat"), Input::ShowChat));
        assert!(matches!(parse_input("status"), Input::ShowStatus));
        assert!(matches!(parse_input("help"), Input::Help));
        assert!(matches!(parse_input("quit"), Input::Quit));
        assert!(matches!(parse_input("exit"), Input::Quit));
    }

    #[test]
    fn blank_and_garbage_lines() {
        assert!(matches!(parse_input("   "), Input::Empty));
        assert!(matches!(parse_input("frobnicate"), Input::Unknown(_)));
    }
}

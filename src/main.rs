//! Application entry point — lecture assistant.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the remote processor ([`ApiProcessor`]) from config.
//! 4. Build the microphone recorder ([`MicBackend`] + [`AudioRecorder`]).
//! 5. Create the workflow channels (`command`, `event`).
//! 6. Spawn the workflow engine as a tokio task.
//! 7. Run the terminal [`App`] — blocks until the user quits.

use std::sync::Arc;

use tokio::sync::mpsc;

use lecture_assistant::{
    app::App,
    audio::{AudioRecorder, MicBackend},
    config::{AppConfig, AppPaths},
    present::{NotesExporter, QuizStore},
    remote::{ApiProcessor, LectureProcessor},
    workflow::{new_shared_state, WorkflowEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("lecture-assistant starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let paths = AppPaths::new();

    // 3. Remote processor
    let processor: Arc<dyn LectureProcessor> =
        Arc::new(ApiProcessor::from_config(&config.remote));

    // 4. Microphone recorder
    let recorder = AudioRecorder::new(Box::new(MicBackend::new(
        config.audio.input_device.clone(),
    )));

    // 5. Channel setup
    let shared = new_shared_state();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(32);

    // 6. Workflow engine
    let engine = WorkflowEngine::new(
        Arc::clone(&shared),
        recorder,
        processor,
        QuizStore::new(paths.quiz_file.clone()),
        NotesExporter::new(config.export.lines_per_page),
        paths.exports_dir.clone(),
        event_tx,
    );
    tokio::spawn(engine.run(command_rx));

    // 7. Terminal frontend (blocks until quit)
    let app = App::new(command_tx, event_rx, shared, QuizStore::new(paths.quiz_file));
    app.run().await
}

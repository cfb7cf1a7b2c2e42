//! Audio acquisition — microphone capture, chunk accumulation, finalization.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → AudioChunk (mpsc) → ChunkBuffer (arrival order)
//!           → stop → device released → concatenate → WAV container → AudioArtifact
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lecture_assistant::audio::{AudioRecorder, MicBackend, format_duration};
//!
//! let mut recorder = AudioRecorder::new(Box::new(MicBackend::new(None)));
//! recorder.start().unwrap();
//! // ... user speaks ...
//! println!("elapsed {}", format_duration(recorder.elapsed_secs()));
//! let artifact = recorder.stop().unwrap();
//! println!("captured {} bytes as {}", artifact.len(), artifact.file_name);
//! ```

pub mod capture;
pub mod chunks;
pub mod recorder;

pub use capture::{AudioChunk, CaptureBackend, CaptureError, CaptureStream, MicBackend};
pub use chunks::ChunkBuffer;
pub use recorder::{format_duration, AudioArtifact, AudioRecorder};

#[cfg(test)]
pub use recorder::MockCaptureBackend;

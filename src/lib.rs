//! Lecture assistant — turns spoken lecture audio into study material.
//!
//! The crate is organised around a finite-state lecture workflow:
//!
//! * [`audio`] — microphone lifecycle: capture, ordered chunk accumulation,
//!   finalization into an audio artifact.
//! * [`ingest`] — normalizes dropped files, browsed files and live
//!   recordings into one canonical artifact.
//! * [`workflow`] — the state machine (Idle → Capturing → Processing →
//!   Completed | Failed) and the async engine that drives it.
//! * [`remote`] — client for the external processing service (transcription,
//!   summarization, flashcards, quiz, chat).
//! * [`present`] — read-only consumers of a completed lecture: quiz handoff
//!   and study-notes export.
//! * [`config`] — settings and platform paths.
//! * [`app`] — the terminal frontend.

pub mod app;
pub mod audio;
pub mod config;
pub mod ingest;
pub mod present;
pub mod remote;
pub mod workflow;

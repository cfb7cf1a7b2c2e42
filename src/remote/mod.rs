//! Remote processing client for the lecture assistant.
//!
//! This module provides:
//! * [`LectureProcessor`] — async trait implemented by all service backends.
//! * [`ApiProcessor`] — HTTP implementation over reqwest.
//! * [`RemoteError`] — error variants for remote operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use lecture_assistant::config::RemoteConfig;
//! use lecture_assistant::remote::{ApiProcessor, LectureProcessor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let processor = ApiProcessor::from_config(&RemoteConfig::default());
//!     let answer = processor
//!         .query("the lecture transcript", "what was covered?")
//!         .await;
//!     println!("{answer:?}");
//! }
//! ```

pub mod client;

pub use client::{ApiProcessor, LectureProcessor, RemoteError};
